//! Municipality name normalization.
//!
//! [`normalize`] turns a raw place name into the canonical key every join in
//! the crate uses. Fact tables, reference tables and geometry features all go
//! through the same function, so the key produced for a municipality is
//! identical no matter where the name came from.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Hand-curated spellings that cannot be reconciled by the generic rules.
/// Keys are lowercase full names; they are looked up before accents and
/// punctuation are stripped.
static EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("herval", "herval d oeste")]));

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static ARTICLES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(de|do|da|d)\b").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonical join key for a place name.
///
/// Never fails: `None`, blank and punctuation-only inputs all map to the
/// empty key, which no real municipality produces.
pub fn normalize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let lowered = raw.to_lowercase();
    let key = match EXCEPTIONS.get(lowered.trim()) {
        Some(target) => canonicalize(target),
        None => canonicalize(&lowered),
    };
    // Keep the function idempotent: a key that spells an exception entry
    // resolves to that entry's target.
    match EXCEPTIONS.get(key.to_lowercase().as_str()) {
        Some(target) => canonicalize(target),
        None => key,
    }
}

/// Shorthand for string slices already in hand.
pub fn normalize_str(raw: &str) -> String {
    normalize(Some(raw))
}

fn canonicalize(lowered: &str) -> String {
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let cleaned = NON_ALNUM.replace_all(&stripped, " ");
    let without_articles = ARTICLES.replace_all(&cleaned, " ");
    let collapsed = SPACES.replace_all(&without_articles, " ");
    collapsed.trim().to_uppercase()
}
