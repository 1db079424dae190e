//! Registry handle shared between readers and rebuilds.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::registry::{CategoryRegistry, DiscoverySources};

/// Publishes a [`CategoryRegistry`] to concurrent readers.
///
/// Readers take an `Arc` snapshot and keep using it for the whole request. A
/// rebuild discovers into a fresh registry and swaps it in only once complete,
/// so no reader ever observes a partial map.
pub struct SharedRegistry {
    sources: DiscoverySources,
    current: RwLock<Arc<CategoryRegistry>>,
}

impl SharedRegistry {
    /// Discovers a registry from `sources` and publishes it.
    pub fn discover(sources: DiscoverySources) -> Self {
        let registry = CategoryRegistry::discover(&sources);
        Self::with_registry(sources, registry)
    }

    /// Publishes an already-built registry; later rebuilds scan `sources`.
    pub fn with_registry(sources: DiscoverySources, registry: CategoryRegistry) -> Self {
        Self {
            sources,
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn sources(&self) -> &DiscoverySources {
        &self.sources
    }

    /// Returns the currently published registry.
    pub fn snapshot(&self) -> Arc<CategoryRegistry> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*guard)
    }

    /// Re-scans the sources and publishes the result.
    pub fn rebuild(&self) -> Arc<CategoryRegistry> {
        let fresh = Arc::new(CategoryRegistry::discover(&self.sources));
        self.publish(Arc::clone(&fresh));
        info!(categories = fresh.len(), "Registry rebuilt");
        fresh
    }

    /// Publishes a registry built elsewhere.
    pub fn replace(&self, registry: CategoryRegistry) {
        self.publish(Arc::new(registry));
    }

    fn publish(&self, registry: Arc<CategoryRegistry>) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = registry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BLUEPRINT: &str = "blueprint_id: cmdi_001\nname: Command Injection\ncategory: command_injection\ndifficulty_range: [1, 5]\nvariants: [Direct Command Injection]\nentry_points: [host]\nmutation_axes:\n  contexts: [ping_utility]\n";

    #[test]
    fn test_snapshot_survives_rebuild() {
        let dir = TempDir::new().unwrap();
        let shared = SharedRegistry::discover(DiscoverySources::new(dir.path()));

        let before = shared.snapshot();
        assert!(before.is_empty());

        std::fs::write(dir.path().join("cmdi_blueprint.yaml"), BLUEPRINT).unwrap();
        let after = shared.rebuild();

        assert!(before.is_empty());
        assert_eq!(after.categories(), vec!["command_injection"]);
        assert_eq!(shared.snapshot().categories(), vec!["command_injection"]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cmdi_blueprint.yaml"), BLUEPRINT).unwrap();
        let shared = SharedRegistry::discover(DiscoverySources::new(dir.path()));

        let first = shared.snapshot();
        let second = shared.rebuild();
        assert_eq!(*first, *second);
    }
}
