//! Recursive file discovery

use crate::error::ProjectError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List every file under `root`, depth first, as `prefix/<relative path>`
///
/// Entries are sorted by file name within each directory, so two calls over
/// an unchanged tree return the same sequence. Symbolic links are reported
/// as plain entries and never followed.
///
/// Fails if `root` does not exist or any directory below it cannot be read.
/// Callers check optional directories for existence first.
pub fn discover_files(root: &Path, prefix: &Path) -> Result<Vec<PathBuf>, ProjectError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| ProjectError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        // strip_prefix cannot fail for entries yielded under root
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        files.push(prefix.join(relative));
    }

    Ok(files)
}
