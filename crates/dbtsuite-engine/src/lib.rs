//! dbtsuite Engine
//!
//! The user-facing commands (build, go to upstream/downstream, go to the
//! model under a selection, CTE symbols), written against a [`Host`] that a
//! front end implements: the terminal CLI or the language server.

pub mod commands;
pub mod host;
pub mod position;
pub mod symbols;

pub use commands::{CommandOutcome, Commands, Document};
pub use host::{Host, HostError, PickItem, Selection};
pub use position::{offset_at, position_at, TextPosition};
pub use symbols::{find_cte_symbols, CteSymbol};
