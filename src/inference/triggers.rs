//! Trigger scanning: completion vs. future-intent phrases

use regex::Regex;
use serde::Serialize;

use super::normalize::normalize;

/// Which family a trigger pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// The learner already did something ("finished", "concluiu")
    Completion,
    /// The learner is expected to do something later ("next week")
    FutureIntent,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Completion => write!(f, "completion"),
            Polarity::FutureIntent => write!(f, "future"),
        }
    }
}

/// Removes generic nouns ("course", "module", ...) as whole words.
#[derive(Debug, Clone)]
pub struct StopwordFilter {
    words: Vec<String>,
    pattern: Option<Regex>,
}

impl StopwordFilter {
    /// Build from raw words; each word is normalized first.
    pub fn new<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        // longest first so multi-word stopwords win over their parts
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        words.dedup();

        let pattern = if words.is_empty() {
            None
        } else {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"\b(?:{})\b", alternation))?)
        };

        Ok(Self { words, pattern })
    }

    /// Filter that removes nothing
    pub fn empty() -> Self {
        Self { words: Vec::new(), pattern: None }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// Remove stopwords from already-normalized text and re-collapse spaces.
    pub fn apply(&self, text: &str) -> String {
        let stripped = match &self.pattern {
            Some(pattern) => pattern.replace_all(text, " ").into_owned(),
            None => text.to_string(),
        };
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// An immutable, OR-combined set of patterns of one polarity.
#[derive(Debug, Clone)]
pub struct TriggerSet {
    polarity: Polarity,
    patterns: Vec<Regex>,
}

impl TriggerSet {
    pub fn new<I, S>(polarity: Polarity, sources: I) -> Result<Self, (String, regex::Error)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for source in sources {
            let source = source.as_ref();
            let regex = Regex::new(source).map_err(|e| (source.to_string(), e))?;
            patterns.push(regex);
        }
        Ok(Self { polarity, patterns })
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any pattern occurs anywhere in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Source text of the first matching pattern, for audit output
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.is_match(text))
            .map(|p| p.as_str())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }
}

/// Which trigger families fired on one fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriggerHits {
    pub completion: bool,
    pub future: bool,
}

impl TriggerHits {
    pub fn any(&self) -> bool {
        self.completion || self.future
    }
}

/// Tests fragments against both trigger families.
///
/// The scanner sees the stopword-filtered fragment; the recognizer does not
/// share this view.
#[derive(Debug, Clone)]
pub struct TriggerScanner {
    completion: TriggerSet,
    future: TriggerSet,
}

impl TriggerScanner {
    pub fn new(completion: TriggerSet, future: TriggerSet) -> Self {
        Self { completion, future }
    }

    pub fn has_completion(&self, filtered_fragment: &str) -> bool {
        self.completion.matches(filtered_fragment)
    }

    pub fn has_future(&self, filtered_fragment: &str) -> bool {
        self.future.matches(filtered_fragment)
    }

    /// Both flags are evaluated independently; a fragment may set both.
    pub fn scan(&self, filtered_fragment: &str) -> TriggerHits {
        TriggerHits {
            completion: self.has_completion(filtered_fragment),
            future: self.has_future(filtered_fragment),
        }
    }

    pub fn completion(&self) -> &TriggerSet {
        &self.completion
    }

    pub fn future(&self) -> &TriggerSet {
        &self.future
    }
}
