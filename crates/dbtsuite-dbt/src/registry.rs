//! Model registry construction

use crate::discovery::discover_files;
use crate::error::ProjectError;
use crate::refs::extract_refs;
use dbtsuite_core::{Model, ModelKind, ProjectConfig};
use std::path::{Path, PathBuf};

/// Every model and seed discovered in one pass, models first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    /// All models in discovery order
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// First model with exactly this name
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Model whose absolute path is `path`
    pub fn by_path(&self, path: &Path) -> Option<&Model> {
        self.models.iter().find(|m| m.absolute_path == path)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Build the registry for the project at `root`
///
/// Returns `Ok(None)` when the models directory is missing: the workspace is
/// not a dbt project. A missing seeds directory contributes no files. Any
/// unreadable file aborts the whole build.
pub fn build_registry(
    root: &Path,
    project: &ProjectConfig,
) -> Result<Option<ModelRegistry>, ProjectError> {
    let models_dir = root.join(&project.models_dir);
    if !models_dir.is_dir() {
        tracing::info!("No models directory at {}", models_dir.display());
        return Ok(None);
    }

    let mut files: Vec<(PathBuf, ModelKind)> =
        discover_files(&models_dir, Path::new(&project.models_dir))?
            .into_iter()
            .filter(|path| file_name_matches(path, |name| project.is_model_file(name)))
            .map(|path| (path, ModelKind::Model))
            .collect();

    let seeds_dir = root.join(&project.seeds_dir);
    if seeds_dir.is_dir() {
        files.extend(
            discover_files(&seeds_dir, Path::new(&project.seeds_dir))?
                .into_iter()
                .filter(|path| file_name_matches(path, |name| project.is_seed_file(name)))
                .map(|path| (path, ModelKind::Seed)),
        );
    }

    let mut models = Vec::with_capacity(files.len());
    for (relative_path, kind) in files {
        let Some(name) = Model::name_from_path(&relative_path) else {
            tracing::warn!("Skipping file without a usable name: {}", relative_path.display());
            continue;
        };

        let absolute_path = root.join(&relative_path);
        let text = std::fs::read_to_string(&absolute_path).map_err(|source| ProjectError::Io {
            path: absolute_path.clone(),
            source,
        })?;
        let upstream_models = extract_refs(&text);

        tracing::debug!(
            model = %name,
            upstream = upstream_models.len(),
            "Extracted references"
        );

        models.push(Model {
            name,
            relative_path,
            absolute_path,
            upstream_models,
            kind,
        });
    }

    Ok(Some(ModelRegistry::new(models)))
}

fn file_name_matches(path: &Path, accept: impl Fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, accept)
}
