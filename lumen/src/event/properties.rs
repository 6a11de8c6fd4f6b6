//! Ordered property bag with last-writer-wins semantics.

use crate::capture::CapturedValue;
use smallvec::SmallVec;

/// Most events carry a handful of properties (enrichers plus a couple of template
/// bindings); inlining up to 4 avoids a heap allocation on the common path while still
/// falling back to heap storage for larger bags.
type Entries = SmallVec<[(Box<str>, CapturedValue); 4]>;

#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    entries: Entries,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self {
            entries: Entries::new(),
        }
    }

    /// Sets `name` to `value`. If `name` already exists, the new value replaces it in
    /// place (preserving original insertion order) — last writer wins, per the
    /// pipeline's enrichment-then-template-binding ordering.
    pub fn set(&mut self, name: impl Into<Box<str>>, value: CapturedValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&CapturedValue> {
        self.entries.iter().find(|(k, _)| k.as_ref() == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.as_ref() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CapturedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `other` into `self`, with `other`'s values winning on key collision —
    /// this is how `ForContext`/`With` derivation layers new properties on top of a
    /// parent logger's fixed set.
    pub fn merge(mut self, other: &PropertyBag) -> Self {
        for (k, v) in other.iter() {
            self.set(k, v.clone());
        }
        self
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn last_writer_wins_preserves_order() {
        let mut bag = PropertyBag::new();
        bag.set("a", CapturedValue::Int(1));
        bag.set("b", CapturedValue::Int(2));
        bag.set("a", CapturedValue::Int(3));
        let collected: Vec<_> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(collected, vec!["a", "b"]);
        assert_eq!(bag.get("a"), Some(&CapturedValue::Int(3)));
    }

    #[test]
    fn merge_prefers_other() {
        let mut base = PropertyBag::new();
        base.set("x", CapturedValue::Int(1));
        let mut overlay = PropertyBag::new();
        overlay.set("x", CapturedValue::Int(2));
        overlay.set("y", CapturedValue::Int(3));
        let merged = base.merge(&overlay);
        assert_eq!(merged.get("x"), Some(&CapturedValue::Int(2)));
        assert_eq!(merged.get("y"), Some(&CapturedValue::Int(3)));
    }
}
