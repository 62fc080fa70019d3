//! User-facing notices
//!
//! Every command in dbtsuite degrades to a notice plus a no-op instead of
//! failing. Notice codes are stable strings so front ends can filter them.

use serde::{Deserialize, Serialize};

/// Notice code registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeCode {
    /// No models directory in the workspace, so there is no registry
    WorkspaceNotSupported,

    /// A selection, command, or reference resolved to zero candidates
    NoMatch,

    /// The user cancelled an interactive choice or picked nothing
    NothingSelected,

    /// A command needs an open document and there is none
    NoActiveDocument,
}

impl NoticeCode {
    /// Get the notice code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceNotSupported => "WORKSPACE_NOT_SUPPORTED",
            Self::NoMatch => "NO_MATCH",
            Self::NothingSelected => "NOTHING_SELECTED",
            Self::NoActiveDocument => "NO_ACTIVE_DOCUMENT",
        }
    }
}

impl std::fmt::Display for NoticeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notice severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning, e.g. a reference that points at no known model
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Stable notice code
    pub code: NoticeCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,
}

impl Notice {
    /// Create a new notice
    pub fn new(code: NoticeCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
        }
    }

    /// Informational notice
    pub fn info(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    /// Warning notice
    pub fn warn(code: NoticeCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, message)
    }

    pub fn workspace_not_supported() -> Self {
        Self::info(NoticeCode::WorkspaceNotSupported, "No dbt files found in workspace")
    }

    pub fn model_not_found(name: &str) -> Self {
        Self::warn(NoticeCode::NoMatch, format!("Could not find model {}", name))
    }

    pub fn no_active_document() -> Self {
        Self::info(NoticeCode::NoActiveDocument, "No active editor")
    }

    pub fn no_upstream_models() -> Self {
        Self::info(NoticeCode::NoMatch, "No upstream models found")
    }

    pub fn no_downstream_models() -> Self {
        Self::info(NoticeCode::NoMatch, "No downstream models found")
    }

    pub fn no_models_selected_for_build() -> Self {
        Self::info(NoticeCode::NothingSelected, "No models selected. Aborting dbt build")
    }

    pub fn no_model_selected() -> Self {
        Self::info(NoticeCode::NothingSelected, "No model selected. Aborting")
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Receives notices on behalf of the user
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Notifier that keeps every notice, in order
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    pub notices: Vec<Notice>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
