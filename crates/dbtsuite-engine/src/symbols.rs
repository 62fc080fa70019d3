//! CTE symbols for document outlines

use crate::position::{position_at, TextPosition};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// `with name as (` or `, name as (`
const CTE_PATTERN: &str = r"(?i)(?:\bwith|,)\s+([A-Za-z0-9_]+)\s+as\s*\(";

fn cte_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CTE_PATTERN).expect("built-in pattern is valid"))
}

/// A common table expression defined in a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CteSymbol {
    pub name: String,

    /// Byte offset of the name
    pub offset: usize,

    /// Position of the name
    pub position: TextPosition,
}

/// CTE definitions in source order
pub fn find_cte_symbols(text: &str) -> Vec<CteSymbol> {
    cte_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| CteSymbol {
            name: name.as_str().to_string(),
            offset: name.start(),
            position: position_at(text, name.start()),
        })
        .collect()
}
