//! Model records discovered in a dbt project

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which project directory a model file was discovered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// SQL model under the models directory
    Model,

    /// Tabular seed under the seeds directory
    Seed,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Seed => write!(f, "seed"),
        }
    }
}

/// A single transformation unit, one file, identified by its file stem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model name: the file name up to its first `.`
    pub name: String,

    /// Path relative to the project root (e.g. `models/staging/stg_orders.sql`)
    pub relative_path: PathBuf,

    /// Absolute path on disk
    pub absolute_path: PathBuf,

    /// Names referenced via `ref()`, in source order, duplicates kept
    pub upstream_models: Vec<String>,

    /// Origin directory
    pub kind: ModelKind,
}

impl Model {
    /// Derive a model name from a path: the file name before the first `.`
    ///
    /// `models/orders.v2.sql` is named `orders`.
    pub fn name_from_path(path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.split('.').next().unwrap_or(file_name);
        Some(stem.to_string())
    }

    /// File name shown in pickers (e.g. `stg_orders.sql`)
    pub fn file_name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_stops_at_first_dot() {
        assert_eq!(
            Model::name_from_path(Path::new("models/orders.v2.sql")).as_deref(),
            Some("orders")
        );
        assert_eq!(
            Model::name_from_path(Path::new("seeds/countries.csv")).as_deref(),
            Some("countries")
        );
        assert_eq!(Model::name_from_path(Path::new("/")), None);
    }

    #[test]
    fn file_name_for_pickers() {
        let model = Model {
            name: "stg_orders".to_string(),
            relative_path: PathBuf::from("models/staging/stg_orders.sql"),
            absolute_path: PathBuf::from("/p/models/staging/stg_orders.sql"),
            upstream_models: Vec::new(),
            kind: ModelKind::Model,
        };
        assert_eq!(model.file_name(), "stg_orders.sql");
        assert_eq!(model.kind.to_string(), "model");
    }
}
