//! Text normalization and sentence segmentation
//!
//! Every comparison the engine makes happens on normalized text: ASCII
//! lowercase letters, digits, hyphens and single spaces.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Runs of sentence-ending punctuation (and newlines) act as one delimiter
static SENTENCE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.\n;:!?]+").unwrap());

/// Normalize free text for matching.
///
/// Decomposes to NFKD and drops combining marks (so `ã` becomes `a`),
/// lowercases, turns every character outside `[a-z0-9-]` into a space,
/// then collapses whitespace and trims. Empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => ' ',
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a report into trimmed, non-empty fragments in document order.
pub fn segment(text: &str) -> Vec<String> {
    SENTENCE_DELIMITERS
        .split(text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Segment a raw report, then normalize each fragment.
///
/// Fragments that normalize to nothing (pure punctuation, emoji) are dropped
/// so that window offsets only count fragments carrying words.
pub fn normalized_fragments(report: &str) -> Vec<String> {
    segment(report)
        .iter()
        .map(|fragment| normalize(fragment))
        .filter(|fragment| !fragment.is_empty())
        .collect()
}
