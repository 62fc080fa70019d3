//! Downstream index and graph traversal
//!
//! Inverts each model's upstream list into a downstream index, and offers
//! transitive upstream/downstream queries over both directions.

use crate::registry::ModelRegistry;
use std::collections::{HashMap, HashSet, VecDeque};

/// Model name -> names of the models that reference it
///
/// Every model name and every referenced name is a key, including names
/// that point outside the registry. Values keep encounter order and
/// duplicates: a model referencing `a` twice appears twice under `a`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownstreamIndex {
    children: HashMap<String, Vec<String>>,
}

impl DownstreamIndex {
    /// Build the index from a registry
    pub fn build(registry: &ModelRegistry) -> Self {
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for model in registry.models() {
            children.entry(model.name.clone()).or_default();

            for upstream in &model.upstream_models {
                children
                    .entry(upstream.clone())
                    .or_default()
                    .push(model.name.clone());
            }
        }

        Self { children }
    }

    /// Immediate dependents of a model (empty for unknown names)
    pub fn downstream(&self, name: &str) -> &[String] {
        self.children
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// All keys, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.children.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Both edge directions, for lineage queries
#[derive(Debug, Clone, Copy)]
pub struct ModelGraph<'a> {
    registry: &'a ModelRegistry,
    downstream: &'a DownstreamIndex,
}

impl<'a> ModelGraph<'a> {
    pub fn new(registry: &'a ModelRegistry, downstream: &'a DownstreamIndex) -> Self {
        Self {
            registry,
            downstream,
        }
    }

    /// Immediate upstream names of a model (empty for unknown names)
    pub fn upstream(&self, name: &str) -> &'a [String] {
        self.registry
            .get(name)
            .map(|m| m.upstream_models.as_slice())
            .unwrap_or_default()
    }

    /// Immediate downstream names of a model
    pub fn downstream(&self, name: &str) -> &'a [String] {
        self.downstream.downstream(name)
    }

    /// Transitive closure of upstream models, each listed once, nearest first
    pub fn all_upstream(&self, name: &str) -> Vec<String> {
        self.walk(name, |n| self.upstream(n))
    }

    /// Transitive closure of downstream models, each listed once, nearest first
    ///
    /// This is the set of models affected if `name` changes.
    pub fn all_downstream(&self, name: &str) -> Vec<String> {
        self.walk(name, |n| self.downstream(n))
    }

    fn walk(&self, start: &str, next: impl Fn(&str) -> &'a [String]) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = next(start).iter().map(String::as_str).collect();
        let mut result = Vec::new();

        // BFS; the start node only shows up again through a cycle
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current.to_string());

            for neighbour in next(current) {
                if !visited.contains(neighbour.as_str()) {
                    queue.push_back(neighbour);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbtsuite_core::{Model, ModelKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn model(name: &str, upstream: &[&str]) -> Model {
        Model {
            name: name.to_string(),
            relative_path: PathBuf::from(format!("models/{}.sql", name)),
            absolute_path: PathBuf::from(format!("/p/models/{}.sql", name)),
            upstream_models: upstream.iter().map(|s| s.to_string()).collect(),
            kind: ModelKind::Model,
        }
    }

    fn abc() -> ModelRegistry {
        ModelRegistry::new(vec![
            model("a", &[]),
            model("b", &["a"]),
            model("c", &["a", "b"]),
        ])
    }

    #[test]
    fn downstream_index_for_chain() {
        let index = DownstreamIndex::build(&abc());

        assert_eq!(index.downstream("a"), ["b", "c"]);
        assert_eq!(index.downstream("b"), ["c"]);
        assert!(index.downstream("c").is_empty());
        assert_eq!(index.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicates_and_external_refs_are_kept() {
        let registry = ModelRegistry::new(vec![model("b", &["a", "raw", "a"])]);
        let index = DownstreamIndex::build(&registry);

        assert_eq!(index.downstream("a"), ["b", "b"]);
        assert_eq!(index.downstream("raw"), ["b"]);
        assert!(index.contains("b"));
        assert!(!index.contains("missing"));
        assert!(index.downstream("missing").is_empty());
    }

    #[test]
    fn transitive_lineage() {
        let registry = ModelRegistry::new(vec![
            model("a", &[]),
            model("b", &["a"]),
            model("c", &["b"]),
            model("d", &["c", "a"]),
        ]);
        let index = DownstreamIndex::build(&registry);
        let graph = ModelGraph::new(&registry, &index);

        assert_eq!(graph.all_downstream("a"), vec!["b", "d", "c"]);
        assert_eq!(graph.all_upstream("d"), vec!["c", "a", "b"]);
        assert!(graph.all_upstream("a").is_empty());
    }

    #[test]
    fn cycles_terminate() {
        let registry = ModelRegistry::new(vec![model("a", &["b"]), model("b", &["a"])]);
        let index = DownstreamIndex::build(&registry);
        let graph = ModelGraph::new(&registry, &index);

        assert_eq!(graph.all_downstream("a"), vec!["b", "a"]);
    }
}
