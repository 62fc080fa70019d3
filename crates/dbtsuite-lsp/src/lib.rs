//! dbtsuite Language Server Protocol implementation
//!
//! Model navigation for dbt projects inside any LSP-capable editor.
//!
//! ## Features
//!
//! - **Go-to-definition**: jump from `{{ ref('model') }}` to the model file
//! - **Hover**: direct upstream and downstream models of the ref under the cursor
//! - **Document symbols**: CTEs defined in the model
//! - **Commands**: `dbtsuite.build`, `dbtsuite.gotoUpstream`,
//!   `dbtsuite.gotoDownstream`, `dbtsuite.gotoModel`, `dbtsuite.rebuild`
//!
//! The model registry is rebuilt when files are created or deleted, when a
//! model is saved, and when the workspace folder changes. Saving
//! `dbtsuite.toml` reloads the config.
//!
//! ## Usage
//!
//! ```bash
//! dbtsuite-lsp
//! ```
//!
//! The server speaks LSP over stdin/stdout; logs go to stderr.

mod backend;
mod host;

pub use backend::{Backend, COMMANDS};
