//! Host services the commands rely on
//!
//! A host shows notices, lets the user pick from a list, opens files, and
//! runs shell commands. The CLI and the language server each provide one.

use dbtsuite_core::Notifier;
use std::path::Path;

/// One row in a pick list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickItem {
    pub label: String,
    pub description: String,
}

impl PickItem {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Outcome of a pick: nothing, one item, or several
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Cancelled,
    Single(T),
    Multi(Vec<T>),
}

impl<T> Selection<T> {
    /// Picked items as a list; empty when cancelled
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Selection::Cancelled => Vec::new(),
            Selection::Single(item) => vec![item],
            Selection::Multi(items) => items,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Selection::Cancelled)
    }
}

/// Error from a host service
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to run `{command}`: {source}")]
    Terminal {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
}

/// Services provided by the front end
pub trait Host: Notifier {
    /// Ask the user to choose from `items`; returns indices into `items`
    ///
    /// With `many` unset the answer is `Single` or `Cancelled`.
    fn pick(&mut self, placeholder: &str, items: &[PickItem], many: bool) -> Selection<usize>;

    /// Show a file to the user
    fn open(&mut self, path: &Path) -> Result<(), HostError>;

    /// Run a shell command in the user's terminal
    fn run_in_terminal(&mut self, command: &str) -> Result<(), HostError>;
}
