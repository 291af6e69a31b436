//! Completion inference over tutoring-session reports
//!
//! Turns a free-text report into the set of curriculum items the learner
//! actually completed:
//!
//! - reports are split into sentence fragments and normalized
//! - each fragment is scanned for completion and future-intent triggers
//! - a triggered fragment opens a window over itself and the next fragments
//! - curriculum items recognized in completion windows are reported
//!
//! Items seen only in future-intent windows are tracked but never reported,
//! and never remove an item that some completion window found.
//!
//! # Example
//!
//! ```
//! use tutor_sync::inference::CurriculumEngine;
//!
//! let engine = CurriculumEngine::builtin().unwrap();
//! let result = engine.infer("He finished the react module.");
//! assert_eq!(result.items(), ["React JS"]);
//! ```

pub mod normalize;
pub mod recognizer;
pub mod similarity;
pub mod tables;
pub mod triggers;
pub mod window;

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

pub use normalize::{normalize, segment};
pub use recognizer::{MatchSource, Recognition, RecognizedItem, DEFAULT_FUZZY_THRESHOLD};
pub use tables::{CurriculumTables, TableError};
pub use triggers::{Polarity, TriggerHits};
pub use window::{EvidenceWindow, DEFAULT_WINDOW};

use normalize::normalized_fragments;
use recognizer::recognize;

static BUILTIN_ENGINE: LazyLock<CurriculumEngine> =
    LazyLock::new(|| CurriculumEngine::builtin().expect("built-in curriculum tables are valid"));

/// Infer completed items with the built-in tables and default settings
pub fn infer(report: &str) -> InferenceResult {
    BUILTIN_ENGINE.infer(report)
}

/// Outcome of one report: sorted completed items, or the sentinel alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceResult {
    items: Vec<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    future_only: BTreeSet<String>,
    #[serde(skip)]
    nothing_completed: bool,
}

impl InferenceResult {
    /// Labels to submit; never empty
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }

    /// True when the result is the sentinel alone
    pub fn is_nothing_completed(&self) -> bool {
        self.nothing_completed
    }

    /// Items seen in future-intent windows. Informational only.
    pub fn future_only(&self) -> &BTreeSet<String> {
        &self.future_only
    }
}

/// Audit record for one triggered fragment
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub fragment: usize,
    pub hits: TriggerHits,
    pub window: String,
    pub recognized: Vec<RecognizedItem>,
}

/// The inference engine: compiled tables plus tuning knobs.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct CurriculumEngine {
    tables: CurriculumTables,
    window: usize,
    fuzzy_threshold: f64,
}

impl CurriculumEngine {
    /// Engine with default window and threshold
    pub fn new(tables: CurriculumTables) -> Self {
        Self {
            tables,
            window: DEFAULT_WINDOW,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    /// Engine over the built-in tables
    pub fn builtin() -> Result<Self, TableError> {
        Ok(Self::new(CurriculumTables::builtin()?))
    }

    /// Number of fragments after a trigger that belong to its window
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Similarity required by the fuzzy fallback, in `0.0..=1.0`
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Result<Self, TableError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TableError::InvalidThreshold(threshold));
        }
        self.fuzzy_threshold = threshold;
        Ok(self)
    }

    pub fn tables(&self) -> &CurriculumTables {
        &self.tables
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    /// Infer completed curriculum items from a report. Never fails.
    pub fn infer(&self, report: &str) -> InferenceResult {
        self.run(report, None)
    }

    /// Like [`infer`](Self::infer), also returning one evidence record per
    /// triggered fragment.
    pub fn infer_with_evidence(&self, report: &str) -> (InferenceResult, Vec<Evidence>) {
        let mut evidence = Vec::new();
        let result = self.run(report, Some(&mut evidence));
        (result, evidence)
    }

    fn run(&self, report: &str, mut evidence: Option<&mut Vec<Evidence>>) -> InferenceResult {
        let fragments = normalized_fragments(report);
        let stopwords = self.tables.stopwords();
        let scanner = self.tables.scanner();

        let mut completed: BTreeSet<String> = BTreeSet::new();
        let mut future_only: BTreeSet<String> = BTreeSet::new();

        for (index, fragment) in fragments.iter().enumerate() {
            let hits = scanner.scan(&stopwords.apply(fragment));
            if !hits.any() {
                continue;
            }

            let window = EvidenceWindow::extract(&fragments, index, self.window, stopwords);
            let recognition = recognize(&self.tables, &window, self.fuzzy_threshold);
            debug!(
                "Fragment {} ({}{}) window '{}' -> {:?}",
                index,
                if hits.completion { "completion" } else { "" },
                if hits.future { " future" } else { "" },
                window.filtered,
                recognition.items().collect::<Vec<_>>()
            );

            // completion wins when both fire; future items are recorded only
            if hits.completion {
                completed.extend(recognition.items().map(String::from));
            } else if hits.future {
                future_only.extend(recognition.items().map(String::from));
            }

            if let Some(records) = evidence.as_deref_mut() {
                records.push(Evidence {
                    fragment: index,
                    hits,
                    window: window.filtered,
                    recognized: recognition.matches,
                });
            }
        }

        let sentinel = self.tables.sentinel();
        completed.remove(sentinel);

        if completed.is_empty() {
            InferenceResult {
                items: vec![sentinel.to_string()],
                future_only,
                nothing_completed: true,
            }
        } else {
            InferenceResult {
                items: completed.into_iter().collect(),
                future_only,
                nothing_completed: false,
            }
        }
    }
}
