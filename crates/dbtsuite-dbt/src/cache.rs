//! Workspace snapshot cache
//!
//! The registry and its downstream index are always built together and
//! published as one `Arc<Snapshot>`. Readers holding an older snapshot keep
//! a complete view of it; nothing is ever updated in place.

use crate::error::ProjectError;
use crate::graph::{DownstreamIndex, ModelGraph};
use crate::registry::{build_registry, ModelRegistry};
use dbtsuite_core::ProjectConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry plus downstream index from one discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registry: ModelRegistry,
    pub downstream: DownstreamIndex,
}

impl Snapshot {
    pub fn new(registry: ModelRegistry) -> Self {
        let downstream = DownstreamIndex::build(&registry);
        Self {
            registry,
            downstream,
        }
    }

    pub fn graph(&self) -> ModelGraph<'_> {
        ModelGraph::new(&self.registry, &self.downstream)
    }
}

/// Cached snapshot for one project root
#[derive(Debug, Clone)]
pub struct WorkspaceCache {
    root: PathBuf,
    project: ProjectConfig,
    snapshot: Option<Arc<Snapshot>>,
}

impl WorkspaceCache {
    /// Create an empty cache; call [`rebuild`](Self::rebuild) to populate it
    pub fn new(root: impl Into<PathBuf>, project: ProjectConfig) -> Self {
        Self {
            root: root.into(),
            project,
            snapshot: None,
        }
    }

    /// Create a cache and build it immediately
    pub fn open(root: impl Into<PathBuf>, project: ProjectConfig) -> Result<Self, ProjectError> {
        let mut cache = Self::new(root, project);
        cache.rebuild()?;
        Ok(cache)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current snapshot; `None` when the root is not a dbt project
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// Rediscover everything and replace the snapshot
    ///
    /// On error the previous snapshot stays in place.
    pub fn rebuild(&mut self) -> Result<(), ProjectError> {
        let next = build_registry(&self.root, &self.project)?
            .map(|registry| Arc::new(Snapshot::new(registry)));

        match &next {
            Some(snapshot) => tracing::info!(
                root = %self.root.display(),
                models = snapshot.registry.len(),
                "Rebuilt model registry"
            ),
            None => tracing::info!(root = %self.root.display(), "Not a dbt project"),
        }

        self.snapshot = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn rebuild_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("models/a.sql"), "select 1").unwrap();

        let mut cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
        let before = cache.snapshot().unwrap();
        assert_eq!(before.registry.len(), 1);

        fs::write(dir.path().join("models/b.sql"), "select * from {{ ref('a') }}").unwrap();
        cache.rebuild().unwrap();

        let after = cache.snapshot().unwrap();
        assert_eq!(after.registry.len(), 2);
        assert_eq!(after.downstream.downstream("a"), ["b"]);
        // the old snapshot is untouched
        assert_eq!(before.registry.len(), 1);
        assert!(before.downstream.downstream("a").is_empty());
    }

    #[test]
    fn non_project_has_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
        assert!(cache.snapshot().is_none());
    }

    #[test]
    fn failed_rebuild_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(dir.path().join("models/a.sql"), "select 1").unwrap();

        let mut cache = WorkspaceCache::open(dir.path(), ProjectConfig::default()).unwrap();
        fs::write(dir.path().join("models/bad.sql"), [0xff, 0xfe]).unwrap();

        assert!(cache.rebuild().is_err());
        assert_eq!(cache.snapshot().unwrap().registry.len(), 1);
    }
}
