//! Deterministic hash-based sampling filter.
//!
//! Unlike the sampling engine's policies (which track running counters per filter
//! instance), hash sampling is stateless: the same key always hashes to the same
//! accept/reject decision, which is useful for keeping all events for a given
//! request/trace id consistently in or out of the sample.

use super::Filter;
use crate::event::Event;

pub struct HashSamplingFilter {
    key_property: String,
    /// Fraction in `[0.0, 1.0]` of keys to admit.
    rate: f64,
}

impl HashSamplingFilter {
    pub fn new(key_property: impl Into<String>, rate: f64) -> Self {
        Self {
            key_property: key_property.into(),
            rate: rate.clamp(0.0, 1.0),
        }
    }

    /// FNV-1a, 32-bit. Small enough that pulling in a crate for it isn't warranted.
    fn fnv1a(bytes: &[u8]) -> u32 {
        const OFFSET_BASIS: u32 = 0x811c9dc5;
        const PRIME: u32 = 0x01000193;
        bytes.iter().fold(OFFSET_BASIS, |hash, &b| (hash ^ b as u32).wrapping_mul(PRIME))
    }
}

impl Filter for HashSamplingFilter {
    fn allow(&self, event: &Event) -> bool {
        if self.rate >= 1.0 {
            return true;
        }
        if self.rate <= 0.0 {
            return false;
        }
        let Some(key) = event.property(&self.key_property) else {
            return true; // no key to hash on: don't silently drop
        };
        let hash = Self::fnv1a(key.render_scalar().as_bytes());
        let threshold = (self.rate * u32::MAX as f64) as u32;
        hash <= threshold
    }
}
