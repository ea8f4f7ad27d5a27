//! Cache key construction.

use cadence_core::ContractorId;

/// Prefix for per-contractor profile bundles.
pub const CONTRACTOR_BUNDLE_PREFIX: &str = "contractor-bundle";
/// Prefix for per-contractor event context bundles.
pub const EVENT_CONTEXT_PREFIX: &str = "event-context";

/// Builders for the fixed key shapes.
pub struct CacheKey;

impl CacheKey {
    /// `contractor-bundle:<id>`
    pub fn contractor_bundle(contractor: ContractorId) -> String {
        format!("{CONTRACTOR_BUNDLE_PREFIX}:{contractor}")
    }

    /// `event-context:<id>`
    pub fn event_context(contractor: ContractorId) -> String {
        format!("{EVENT_CONTEXT_PREFIX}:{contractor}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_fixed_prefixes() {
        let id = ContractorId::new(42);
        assert_eq!(CacheKey::contractor_bundle(id), "contractor-bundle:42");
        assert_eq!(CacheKey::event_context(id), "event-context:42");
    }
}
