//! Configuration schema (dbtsuite.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the project root
pub const CONFIG_FILE_NAME: &str = "dbtsuite.toml";

/// Where models and seeds live inside a dbt project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Models directory, relative to the project root (required on disk)
    pub models_dir: String,

    /// Seeds directory, relative to the project root (optional on disk)
    pub seeds_dir: String,

    /// File extensions (without the dot) treated as models
    pub model_extensions: Vec<String>,

    /// File extensions (without the dot) treated as seeds
    pub seed_extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            seeds_dir: "seeds".to_string(),
            model_extensions: vec!["sql".to_string()],
            seed_extensions: vec!["csv".to_string()],
        }
    }
}

impl ProjectConfig {
    /// Check whether a file name carries one of the model extensions
    pub fn is_model_file(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.model_extensions)
    }

    /// Check whether a file name carries one of the seed extensions
    pub fn is_seed_file(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.seed_extensions)
    }
}

fn has_extension(file_name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        file_name
            .strip_suffix(ext.as_str())
            .map_or(false, |rest| rest.ends_with('.'))
    })
}

/// How navigation commands behave when resolving references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Show a warning for every reference that matches no known model
    pub warn_on_no_match: bool,

    /// Open the target directly when exactly one model matches
    pub jump_if_single: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            warn_on_no_match: true,
            jump_if_single: true,
        }
    }
}

/// External build tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Executable invoked as `<executable> build --select ...`
    pub executable: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            executable: "dbt".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Navigation behaviour
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Build tool settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            navigation: NavigationConfig::default(),
            build: BuildConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load `dbtsuite.toml` from a project root, or defaults rooted there
    pub fn discover(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.project_root = project_root.to_path_buf();
        Ok(config)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
