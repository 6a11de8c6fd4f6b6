//! Message template parsing and rendering.
//!
//! Templates use Serilog-style syntax: `{Name}` binds a property by plain reference,
//! `{@Name}` requests destructured (structural) capture, `{$Name}` forces a
//! stringified scalar render even for a structurally-capturable value. Alignment
//! (`{Name,10}` / `{Name,-10}`) and a format string (`{Name:F2}`) are both optional and
//! may be combined (`{Name,10:F2}`).

mod parser;
mod render;

pub use parser::{Hint, TemplateToken};

use crate::event::PropertyBag;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A parsed template: an ordered sequence of literal and property tokens.
#[derive(Debug, Clone)]
pub struct TemplateTree {
    tokens: Vec<TemplateToken>,
}

impl TemplateTree {
    pub fn parse(source: &str) -> Self {
        Self {
            tokens: parser::parse(source),
        }
    }

    pub fn render(&self, properties: &PropertyBag) -> String {
        render::render(&self.tokens, properties)
    }

    /// Names of every property this template binds, in template order. Used by the
    /// pipeline to decide which enrichers are even worth running for a given event.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            TemplateToken::Property { name, .. } => Some(name.as_str()),
            TemplateToken::Literal(_) => None,
        })
    }
}

/// An LRU cache of parsed templates, keyed by the raw template string. Parsing a
/// template is nontrivial work relative to rendering it, and the same template string
/// is typically logged thousands of times from the same call site.
pub struct TemplateCache {
    cache: Mutex<LruCache<Box<str>, Arc<TemplateTree>>>,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity must be nonzero");
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn parse(&self, source: &str) -> Arc<TemplateTree> {
        let mut cache = self.cache.lock();
        if let Some(tree) = cache.get(source) {
            return Arc::clone(tree);
        }
        let tree = Arc::new(TemplateTree::parse(source));
        cache.put(source.into(), Arc::clone(&tree));
        tree
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::capture::CapturedValue;

    #[test]
    fn cache_returns_same_parse_for_repeated_template() {
        let cache = TemplateCache::new(8);
        let a = cache.parse("User {UserId} logged in");
        let b = cache.parse("User {UserId} logged in");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn property_names_are_extracted_in_order() {
        let tree = TemplateTree::parse("{A} then {@B} then {$C}");
        let names: Vec<&str> = tree.property_names().collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn plain_binding_renders_scalar() {
        let tree = TemplateTree::parse("Hello, {Name}!");
        let mut props = PropertyBag::new();
        props.set("Name", CapturedValue::Str("Ada".into()));
        assert_eq!(tree.render(&props), "Hello, Ada!");
    }

    #[test]
    fn literal_only_template_round_trips_through_parse_and_render() {
        let source = "the circuit breaker tripped after three failures";
        let tree = TemplateTree::parse(source);
        assert_eq!(tree.render(&PropertyBag::new()), source);
    }
}
