//! Taxonomy sub-parser and vocabulary classifier
//!
//! # Splitting
//! - `AIRS` codes: split on `;`, `*` or space; each code is kept as written
//!   apart from trimming (dots and dashes are meaningful).
//! - Any other vocabulary: split on `;` or `*`, then reduce each term to its
//!   hierarchy leaf (`"Basic Needs - Food - Food Banks"` → `"Food Banks"`),
//!   lower-case it and replace spaces and slashes with dashes (`food-banks`).
//!
//! # Vocabulary inference
//! Evaluated once per source value, only when no explicit vocabulary is
//! configured and the value does not come from the code column:
//! all lower-case → `why`, capitalized word → `who`, anything else → `what`.

use crate::models::TaxonomyTerm;
use once_cell::sync::Lazy;
use regex::Regex;

pub const AIRS_VOCABULARY: &str = "AIRS";
pub const WHAT_VOCABULARY: &str = "what";
pub const WHO_VOCABULARY: &str = "who";
pub const WHY_VOCABULARY: &str = "why";

/// `{vocab:'name', ...}` pairs in tree taxonomy codes
static TREE_CODE_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+):'([^']+)'").expect("static taxonomy pair pattern"));

/// Infer the vocabulary of a source value from its letter case
pub fn infer_vocabulary(value: &str) -> &'static str {
    let mut cased = value.chars().filter(|c| c.is_alphabetic());
    let Some(first) = cased.next() else {
        return WHAT_VOCABULARY;
    };
    let rest: Vec<char> = cased.collect();

    if first.is_lowercase() && rest.iter().all(|c| c.is_lowercase()) {
        return WHY_VOCABULARY;
    }
    if first.is_uppercase()
        && value.trim_start().starts_with(first)
        && !rest.is_empty()
        && rest.iter().all(|c| c.is_lowercase())
    {
        return WHO_VOCABULARY;
    }
    WHAT_VOCABULARY
}

/// Pick the vocabulary for one source value
///
/// An explicit vocabulary wins; the code column is always `AIRS`; otherwise
/// the vocabulary is inferred from the value.
pub fn resolve_vocabulary(explicit: Option<&str>, is_code_column: bool, value: &str) -> String {
    if let Some(vocabulary) = explicit.filter(|v| !v.is_empty()) {
        return vocabulary.to_string();
    }
    if is_code_column {
        return AIRS_VOCABULARY.to_string();
    }
    infer_vocabulary(value).to_string()
}

/// Reduce a hierarchical term to its normalized leaf label
pub fn leaf_label(term: &str) -> String {
    let leaf = term.rsplit('-').next().unwrap_or(term);
    leaf.trim().to_lowercase().replace([' ', '/'], "-")
}

/// Split one source value into terms of the given vocabulary
///
/// Duplicates are kept; the caller decides how to coalesce them.
pub fn parse_terms(value: &str, vocabulary: &str) -> Vec<TaxonomyTerm> {
    let names: Vec<String> = if vocabulary == AIRS_VOCABULARY {
        value
            .split([';', '*', ' '])
            .map(|name| name.trim().to_string())
            .collect()
    } else {
        value.split([';', '*']).map(leaf_label).collect()
    };

    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| TaxonomyTerm::new(name, vocabulary))
        .collect()
}

/// Parse a tree `Taxonomy/Code` value
///
/// Codes starting with `{` hold `vocab:'name'` pairs, one term per pair.
/// Anything else is a single AIRS code.
pub fn parse_tree_code(code: &str) -> Vec<TaxonomyTerm> {
    let code = code.trim();
    if code.is_empty() {
        return Vec::new();
    }
    if code.starts_with('{') {
        return TREE_CODE_PAIR
            .captures_iter(code)
            .map(|caps| TaxonomyTerm::new(&caps[2], &caps[1]))
            .collect();
    }
    vec![TaxonomyTerm::new(code, AIRS_VOCABULARY)]
}
