//! Introspection cache of one service proxy

use std::sync::Arc;

use parking_lot::RwLock;
use upnp_core::ServiceMetadata;

/// Holds the metadata of the last successful introspection
///
/// Empty until the first fetch succeeds. A later fetch replaces the
/// contents only on success; a failed fetch leaves them untouched.
#[derive(Debug, Default)]
pub struct IntrospectionCache {
    metadata: RwLock<Option<Arc<ServiceMetadata>>>,
}

impl IntrospectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<ServiceMetadata>> {
        self.metadata.read().clone()
    }

    pub fn is_populated(&self) -> bool {
        self.metadata.read().is_some()
    }

    /// Store freshly fetched metadata
    ///
    /// Returns `true` when the new metadata differs from the cached one.
    pub fn store(&self, metadata: ServiceMetadata) -> bool {
        let mut slot = self.metadata.write();
        let changed = slot.as_deref() != Some(&metadata);
        if changed {
            *slot = Some(Arc::new(metadata));
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnp_core::{ActionDescriptor, DataType, StateVariableDescriptor};

    fn metadata(action: &str) -> ServiceMetadata {
        ServiceMetadata::builder("urn:test:service:Cache:1")
            .state_variable(StateVariableDescriptor::new("Status", DataType::Boolean))
            .action(ActionDescriptor::new(action))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_until_stored() {
        let cache = IntrospectionCache::new();
        assert!(!cache.is_populated());
        assert!(cache.get().is_none());

        assert!(cache.store(metadata("Toggle")));
        assert!(cache.is_populated());
        assert!(cache.get().unwrap().action("Toggle").is_some());
    }

    #[test]
    fn test_identical_refetch_keeps_instance() {
        let cache = IntrospectionCache::new();
        cache.store(metadata("Toggle"));
        let first = cache.get().unwrap();

        assert!(!cache.store(metadata("Toggle")));
        assert!(Arc::ptr_eq(&first, &cache.get().unwrap()));

        assert!(cache.store(metadata("Flip")));
        assert!(!Arc::ptr_eq(&first, &cache.get().unwrap()));
    }
}
