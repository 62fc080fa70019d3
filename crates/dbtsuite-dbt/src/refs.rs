//! `ref()` extraction from model text
//!
//! Whole files go through [`extract_refs`], which only accepts complete
//! `{{ ref('name') }}` expressions. Editor selections go through
//! [`extract_selection`], which falls back to best-effort heuristics for
//! text that is still being typed. Neither is a Jinja parser: a ref inside
//! a SQL string literal or comment is reported like any other.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// `{{ ref('name') }}` with free whitespace around every token
const REF_PATTERN: &str = r"\{\{\s*ref\s*\(\s*'([A-Za-z0-9_]+)'\s*\)\s*\}\}";

const BARE_IDENTIFIER: &str = r"^[A-Za-z0-9_]+$";

/// Truncated reference shapes, most specific first
const PARTIAL_PATTERNS: &[&str] = &[
    // ref('foo  ref(foo  {{ ref('foo') }
    r"ref\s*\(\s*'?([A-Za-z0-9_]+)",
    // ('foo  (foo
    r"\(\s*'?([A-Za-z0-9_]+)",
    // 'foo')  'foo
    r"'([A-Za-z0-9_]+)",
    // foo')  foo)
    r"^\s*([A-Za-z0-9_]+)'?\s*\)",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

fn ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(REF_PATTERN))
}

fn bare_identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(BARE_IDENTIFIER))
}

fn partial_regexes() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| PARTIAL_PATTERNS.iter().map(|p| compile(p)).collect())
}

/// A fallback attempt over selection text
type Fallback = fn(&str) -> Option<String>;

/// Tried in order when no complete reference is present
const FALLBACKS: &[Fallback] = &[bare_identifier, partial_reference];

/// Extract every complete `{{ ref('name') }}` in source order, duplicates kept
pub fn extract_refs(text: &str) -> Vec<String> {
    ref_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract reference candidates from short, possibly incomplete text
///
/// Complete references win. Otherwise the first fallback that matches
/// yields a single candidate:
/// 1. the text is exactly one identifier (`stg_orders`)
/// 2. the text holds a truncated reference (`ref('stg_ord`, `'stg_orders')`)
///
/// Returns an empty list when nothing matches.
pub fn extract_selection(text: &str) -> Vec<String> {
    let refs = extract_refs(text);
    if !refs.is_empty() {
        return refs;
    }

    FALLBACKS
        .iter()
        .find_map(|fallback| fallback(text))
        .into_iter()
        .collect()
}

/// Name and byte span of the complete reference covering `offset`, if any
pub fn ref_at_offset(text: &str, offset: usize) -> Option<(String, Range<usize>)> {
    ref_regex().captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        let name = caps.get(1)?;
        (whole.start() <= offset && offset <= whole.end())
            .then(|| (name.as_str().to_string(), whole.range()))
    })
}

fn bare_identifier(text: &str) -> Option<String> {
    bare_identifier_regex()
        .is_match(text)
        .then(|| text.to_string())
}

fn partial_reference(text: &str) -> Option<String> {
    partial_regexes().iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
