//! Curriculum recognition inside an evidence window
//!
//! Steps, in order:
//! 1. module-number rules ("module 7 of python"), which always contribute
//! 2. alias phrases found as substrings
//! 3. canonical names found as substrings
//! 4. a single best fuzzy match, only when steps 2 and 3 found nothing

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::similarity::ratio;
use super::tables::{CurriculumTables, TableError};
use super::window::EvidenceWindow;

/// Minimum similarity for the fuzzy fallback
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.78;

/// Maps "module N ..." mentions to one of two items split at `boundary`.
#[derive(Debug, Clone)]
pub struct ModuleRule {
    pattern: Regex,
    boundary: u32,
    low: String,
    high: String,
}

impl ModuleRule {
    pub fn new(
        pattern: &str,
        boundary: u32,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Result<Self, TableError> {
        let compiled = Regex::new(pattern).map_err(|source| TableError::InvalidPattern {
            kind: "module rule",
            pattern: pattern.to_string(),
            source,
        })?;
        if compiled.captures_len() < 2 {
            return Err(TableError::MissingCapture(pattern.to_string()));
        }
        Ok(Self {
            pattern: compiled,
            boundary,
            low: low.into(),
            high: high.into(),
        })
    }

    /// Item for the first module mention in `text`, if any.
    ///
    /// A capture that is not a number (or does not fit in `u32`) is a miss.
    pub fn apply(&self, text: &str) -> Option<&str> {
        let captures = self.pattern.captures(text)?;
        let number: u32 = captures.get(1)?.as_str().parse().ok()?;
        if number <= self.boundary {
            Some(&self.low)
        } else {
            Some(&self.high)
        }
    }
}

/// Which recognition step produced an item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchSource {
    ModuleRule,
    Alias,
    CanonicalName,
    Fuzzy { score: f64 },
}

impl std::fmt::Display for MatchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSource::ModuleRule => write!(f, "module rule"),
            MatchSource::Alias => write!(f, "alias"),
            MatchSource::CanonicalName => write!(f, "name"),
            MatchSource::Fuzzy { score } => write!(f, "fuzzy {:.2}", score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedItem {
    pub item: String,
    pub source: MatchSource,
}

/// Items found in one window; each item appears once, credited to the
/// first step that found it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recognition {
    pub matches: Vec<RecognizedItem>,
}

impl Recognition {
    fn add(&mut self, item: &str, source: MatchSource) -> bool {
        if self.contains(item) {
            return false;
        }
        self.matches.push(RecognizedItem {
            item: item.to_string(),
            source,
        });
        true
    }

    pub fn contains(&self, item: &str) -> bool {
        self.matches.iter().any(|m| m.item == item)
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.matches.iter().map(|m| m.item.as_str())
    }
}

/// Recognize curriculum items in a window.
///
/// Module rules read the unfiltered text, since "module" itself is a
/// stopword; every other step reads the stopword-filtered text.
pub fn recognize(
    tables: &CurriculumTables,
    window: &EvidenceWindow,
    fuzzy_threshold: f64,
) -> Recognition {
    let mut found = Recognition::default();

    for rule in tables.module_rules() {
        if let Some(item) = rule.apply(&window.text) {
            found.add(item, MatchSource::ModuleRule);
        }
    }

    let text = window.filtered.as_str();
    let mut lexical_hit = false;

    for alias in tables.aliases() {
        if text.contains(alias.phrase.as_str()) {
            found.add(&alias.item, MatchSource::Alias);
            lexical_hit = true;
        }
    }

    for entry in tables.items() {
        if !entry.normalized.is_empty() && text.contains(entry.normalized.as_str()) {
            found.add(&entry.name, MatchSource::CanonicalName);
            lexical_hit = true;
        }
    }

    if !lexical_hit {
        if let Some((item, score)) = best_fuzzy_match(tables, text, fuzzy_threshold) {
            debug!("Fuzzy fallback matched '{}' ({:.3}) in '{}'", item, score, text);
            found.add(item, MatchSource::Fuzzy { score });
        }
    }

    found
}

/// Highest-scoring non-sentinel item whose similarity to the whole window is
/// at least `threshold`. Earlier catalog entries win ties.
pub fn best_fuzzy_match<'t>(
    tables: &'t CurriculumTables,
    text: &str,
    threshold: f64,
) -> Option<(&'t str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for entry in tables.items() {
        let score = ratio(text, &entry.normalized);
        if best.map_or(score > 0.0, |(_, top)| score > top) {
            best = Some((entry.name.as_str(), score));
        }
    }
    best.filter(|(_, score)| *score >= threshold)
}
