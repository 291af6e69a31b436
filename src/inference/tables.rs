//! Curriculum tables: catalog, aliases, stopwords, triggers and module rules
//!
//! Tables are plain data. The built-in set is compiled into the binary from
//! `assets/curriculum.toml`; deployments can point `inference.tables_path` at
//! their own file with the same layout.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::normalize::normalize;
use super::recognizer::ModuleRule;
use super::triggers::{Polarity, StopwordFilter, TriggerScanner, TriggerSet};

/// Built-in table document
pub const BUILTIN_TABLES: &str = include_str!("../../assets/curriculum.toml");

/// Errors raised while loading or validating curriculum tables
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read tables file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse curriculum tables: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("curriculum catalog is empty")]
    EmptyCatalog,

    #[error("sentinel '{0}' is not part of the catalog")]
    SentinelNotInCatalog(String),

    #[error("alias '{0}' is empty after normalization")]
    EmptyAlias(String),

    #[error("alias '{alias}' points to unknown curriculum item '{item}'")]
    UnknownAliasTarget { alias: String, item: String },

    #[error("alias '{alias}' maps to both '{first}' and '{second}'")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("module rule '{0}' needs a numeric capture group")]
    MissingCapture(String),

    #[error("module rule points to unknown curriculum item '{0}'")]
    UnknownRuleTarget(String),

    #[error("fuzzy threshold {0} is outside 0..=1")]
    InvalidThreshold(f64),
}

/// On-disk layout of a tables document
#[derive(Debug, Deserialize)]
struct TablesDocument {
    sentinel: String,
    catalog: Vec<String>,
    #[serde(default)]
    stopwords: Vec<String>,
    #[serde(default)]
    completion_patterns: Vec<String>,
    #[serde(default)]
    future_patterns: Vec<String>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    module_rules: Vec<ModuleRuleDocument>,
}

#[derive(Debug, Deserialize)]
struct ModuleRuleDocument {
    pattern: String,
    boundary: u32,
    low: String,
    high: String,
}

/// One catalog item with its precomputed normalized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub normalized: String,
}

/// Normalized colloquial phrase mapped to one catalog item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub phrase: String,
    pub item: String,
}

/// Validated, compiled tables. Immutable once built.
#[derive(Debug, Clone)]
pub struct CurriculumTables {
    sentinel: String,
    catalog: Vec<CatalogEntry>,
    aliases: Vec<AliasEntry>,
    stopwords: StopwordFilter,
    scanner: TriggerScanner,
    module_rules: Vec<ModuleRule>,
}

impl CurriculumTables {
    /// Parse and compile the built-in tables
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    /// Load tables from a TOML file
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tables = Self::from_toml_str(&contents)?;
        debug!("Loaded curriculum tables from {}", path.display());
        Ok(tables)
    }

    /// Parse a TOML tables document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self, TableError> {
        let doc: TablesDocument = toml::from_str(contents)?;
        Self::compile(doc)
    }

    fn compile(doc: TablesDocument) -> Result<Self, TableError> {
        if doc.catalog.is_empty() {
            return Err(TableError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        let catalog: Vec<CatalogEntry> = doc
            .catalog
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .map(|name| CatalogEntry {
                normalized: normalize(&name),
                name,
            })
            .collect();

        let known: HashSet<&str> = catalog.iter().map(|e| e.name.as_str()).collect();
        if !known.contains(doc.sentinel.as_str()) {
            return Err(TableError::SentinelNotInCatalog(doc.sentinel));
        }

        let mut by_phrase: BTreeMap<String, String> = BTreeMap::new();
        for (raw, item) in doc.aliases {
            if !known.contains(item.as_str()) {
                return Err(TableError::UnknownAliasTarget { alias: raw, item });
            }
            let phrase = normalize(&raw);
            if phrase.is_empty() {
                return Err(TableError::EmptyAlias(raw));
            }
            if let Some(existing) = by_phrase.get(&phrase) {
                if *existing != item {
                    return Err(TableError::ConflictingAlias {
                        alias: phrase,
                        first: existing.clone(),
                        second: item,
                    });
                }
                continue;
            }
            by_phrase.insert(phrase, item);
        }
        let aliases = by_phrase
            .into_iter()
            .map(|(phrase, item)| AliasEntry { phrase, item })
            .collect();

        let stopwords = StopwordFilter::new(&doc.stopwords).map_err(|source| {
            TableError::InvalidPattern {
                kind: "stopword",
                pattern: doc.stopwords.join(", "),
                source,
            }
        })?;

        let completion = compile_triggers(Polarity::Completion, &doc.completion_patterns)?;
        let future = compile_triggers(Polarity::FutureIntent, &doc.future_patterns)?;
        for source in completion.sources().chain(future.sources()) {
            warn_on_stopword_literal(source, &stopwords);
        }

        let mut module_rules = Vec::new();
        for rule in doc.module_rules {
            for target in [&rule.low, &rule.high] {
                if !known.contains(target.as_str()) {
                    return Err(TableError::UnknownRuleTarget(target.clone()));
                }
            }
            module_rules.push(ModuleRule::new(&rule.pattern, rule.boundary, rule.low, rule.high)?);
        }

        Ok(Self {
            sentinel: doc.sentinel,
            catalog,
            aliases,
            stopwords,
            scanner: TriggerScanner::new(completion, future),
            module_rules,
        })
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Full catalog in document order, sentinel included
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    /// Catalog entries a report can actually mark as completed
    pub fn items(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalog.iter().filter(move |e| e.name != self.sentinel)
    }

    pub fn is_catalog_item(&self, name: &str) -> bool {
        self.catalog.iter().any(|e| e.name == name)
    }

    pub fn aliases(&self) -> &[AliasEntry] {
        &self.aliases
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    pub fn scanner(&self) -> &TriggerScanner {
        &self.scanner
    }

    pub fn module_rules(&self) -> &[ModuleRule] {
        &self.module_rules
    }
}

fn compile_triggers(polarity: Polarity, sources: &[String]) -> Result<TriggerSet, TableError> {
    TriggerSet::new(polarity, sources).map_err(|(pattern, source)| TableError::InvalidPattern {
        kind: match polarity {
            Polarity::Completion => "completion",
            Polarity::FutureIntent => "future",
        },
        pattern,
        source,
    })
}

/// First stopword spelled out by a trigger pattern. Such a trigger can never
/// match the filtered view.
fn stopword_in_trigger(source: &str, stopwords: &StopwordFilter) -> Option<String> {
    let literal = source.replace(r"\b", " ").replace(r"\s", " ");
    literal
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| stopwords.contains(word))
        .map(String::from)
}

fn warn_on_stopword_literal(source: &str, stopwords: &StopwordFilter) {
    if let Some(word) = stopword_in_trigger(source, stopwords) {
        warn!("Trigger pattern '{}' contains stopword '{}' and will never match", source, word);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
sentinel = "None"
catalog = ["Rust Basics", "Async Rust", "None"]
stopwords = ["module"]
completion_patterns = ['\bfinished\b']
future_patterns = ['\bnext week\b']

[aliases]
"tokio" = "Async Rust"
"Tókio" = "Async Rust"
"#;

    #[test]
    fn test_builtin_tables_are_valid() {
        let tables = CurriculumTables::builtin().unwrap();
        assert_eq!(tables.sentinel(), "Não consumiu");
        assert_eq!(tables.catalog().len(), 23);
        assert_eq!(tables.items().count(), 22);
        assert!(!tables.module_rules().is_empty());
        assert!(!tables.scanner().completion().is_empty());
        assert!(!tables.scanner().future().is_empty());
    }

    #[test]
    fn test_builtin_alias_targets_are_catalog_items() {
        let tables = CurriculumTables::builtin().unwrap();
        for alias in tables.aliases() {
            assert!(tables.is_catalog_item(&alias.item), "{} -> {}", alias.phrase, alias.item);
            assert_eq!(normalize(&alias.phrase), alias.phrase);
        }
    }

    #[test]
    fn test_builtin_triggers_avoid_stopwords() {
        let tables = CurriculumTables::builtin().unwrap();
        let scanner = tables.scanner();
        for source in scanner.completion().sources().chain(scanner.future().sources()) {
            assert_eq!(stopword_in_trigger(source, tables.stopwords()), None, "{source}");
        }
        for word in ["week", "semana", "meta"] {
            assert!(tables.stopwords().contains(word), "{word}");
        }
    }

    #[test]
    fn test_stopword_in_trigger() {
        let stopwords = StopwordFilter::new(["week"]).unwrap();
        assert_eq!(stopword_in_trigger(r"\blast week\b", &stopwords).as_deref(), Some("week"));
        assert_eq!(stopword_in_trigger(r"\bfinished\b", &stopwords), None);
    }

    #[test]
    fn test_small_tables_dedupe_normalized_aliases() {
        let tables = CurriculumTables::from_toml_str(SMALL).unwrap();
        assert_eq!(tables.aliases().len(), 1);
        assert_eq!(tables.aliases()[0].phrase, "tokio");
        assert_eq!(tables.catalog()[0].normalized, "rust basics");
    }

    #[test]
    fn test_unknown_alias_target_is_rejected() {
        let doc = SMALL.replace("\"tokio\" = \"Async Rust\"", "\"tokio\" = \"Missing\"");
        let err = CurriculumTables::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, TableError::UnknownAliasTarget { .. }));
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let doc = SMALL.replace("\"Tókio\" = \"Async Rust\"", "\"Tókio\" = \"Rust Basics\"");
        let err = CurriculumTables::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, TableError::ConflictingAlias { .. }));
    }

    #[test]
    fn test_sentinel_must_be_in_catalog() {
        let doc = SMALL.replace("sentinel = \"None\"", "sentinel = \"Nothing\"");
        let err = CurriculumTables::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, TableError::SentinelNotInCatalog(_)));
    }

    #[test]
    fn test_invalid_trigger_pattern_is_rejected() {
        let doc = SMALL.replace(r"'\bnext week\b'", "'(next'");
        let err = CurriculumTables::from_toml_str(&doc).unwrap_err();
        match err {
            TableError::InvalidPattern { kind, pattern, .. } => {
                assert_eq!(kind, "future");
                assert_eq!(pattern, "(next");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        let err = CurriculumTables::from_toml_str("sentinel = \"x\"\ncatalog = []").unwrap_err();
        assert!(matches!(err, TableError::EmptyCatalog));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let err = CurriculumTables::from_path(Path::new("/nonexistent/tables.toml")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }
}
