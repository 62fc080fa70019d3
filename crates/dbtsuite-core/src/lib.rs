//! dbtsuite Core
//!
//! Shared domain types: model records, project configuration, and the
//! user-facing notices every command degrades to.

pub mod config;
pub mod model;
pub mod notice;

pub use config::{BuildConfig, Config, ConfigError, NavigationConfig, ProjectConfig};
pub use model::{Model, ModelKind};
pub use notice::{Notice, NoticeCode, Notifier, RecordingNotifier, Severity};
