//! Evidence windows around trigger fragments

use super::triggers::StopwordFilter;

/// Fragments following a trigger that still count as its evidence
pub const DEFAULT_WINDOW: usize = 2;

/// The triggering fragment plus up to `width` following fragments.
///
/// `text` is the plain concatenation; `filtered` has stopwords removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceWindow {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub filtered: String,
}

impl EvidenceWindow {
    /// Build the window for trigger index `start`, clipped at the end of
    /// `fragments`.
    pub fn extract(
        fragments: &[String],
        start: usize,
        width: usize,
        stopwords: &StopwordFilter,
    ) -> Self {
        let end = start.saturating_add(width).min(fragments.len().saturating_sub(1));
        let text = fragments
            .get(start..=end)
            .map(|parts| parts.join(" "))
            .unwrap_or_default();
        let filtered = stopwords.apply(&text);
        Self { start, end, text, filtered }
    }
}
