//! Errors raised while scanning a dbt project

use std::path::PathBuf;

/// Error while discovering or reading project files
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Failed to list {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
