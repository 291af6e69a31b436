//! Meeting records written by the transcription service
//!
//! Each record is one JSON file. Records are matched to scheduled sessions
//! in three tiers: conferencing code, enrollment token in the title, then
//! normalized title equality.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Enrollment token anywhere in a title
static SUBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,10}[0-9]{2,10})\b").unwrap());

/// One meeting record. Every field is optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingRecord {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Event tag, e.g. `meeting_end`
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub platform_meeting_id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Free-text meeting summary; the report inference runs on
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub report_url: String,
    /// File the record was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl MeetingRecord {
    /// Parsed start time. RFC 3339 timestamps keep their offset; naive ISO
    /// timestamps are taken to be in `offset`.
    pub fn started_at(&self, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        let raw = self.start_time.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed);
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;
        offset.from_local_datetime(&naive).single()
    }

    /// Calendar date of the meeting in `offset`
    pub fn local_date(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        self.started_at(offset)
            .map(|start| start.with_timezone(offset).date_naive())
    }

    fn has_trigger(&self, trigger: &str) -> bool {
        self.trigger.trim().eq_ignore_ascii_case(trigger.trim())
    }
}

/// Which matching tier produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    MeetingId,
    SubjectId,
    Title,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::MeetingId => write!(f, "meeting id"),
            MatchTier::SubjectId => write!(f, "subject id"),
            MatchTier::Title => write!(f, "title"),
        }
    }
}

/// Record chosen for a session
#[derive(Debug, Clone, Copy)]
pub struct RecordMatch<'a> {
    pub record: &'a MeetingRecord,
    pub tier: MatchTier,
}

/// First existing directory among `candidates`, else the first candidate
pub fn resolve_records_dir(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| dir.is_dir())
        .or_else(|| candidates.first())
        .cloned()
}

/// Lowercase, accent-free, whitespace-collapsed title for equality checks
pub fn normalize_title(title: &str) -> String {
    let folded: String = title
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First enrollment token in a title
pub fn subject_id_in(title: &str) -> Option<&str> {
    SUBJECT_ID
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// In-memory set of meeting records
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<MeetingRecord>,
}

impl RecordStore {
    pub fn new(records: Vec<MeetingRecord>) -> Self {
        Self { records }
    }

    /// Load every `*.json` file in `dir`. Unreadable or malformed files are
    /// skipped; a missing directory yields an empty store.
    pub fn load(dir: &Path) -> Self {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Records directory {} is not readable: {}", dir.display(), e);
                return Self::default();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|contents| Ok(serde_json::from_str::<MeetingRecord>(&contents)?));
            match parsed {
                Ok(mut record) => {
                    record.source = Some(path);
                    records.push(record);
                }
                Err(e) => warn!("Skipping meeting record {}: {}", path.display(), e),
            }
        }

        debug!("Loaded {} meeting records from {}", records.len(), dir.display());
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MeetingRecord] {
        &self.records
    }

    /// Records with the given trigger whose local start date is `date`
    pub fn day(&self, date: NaiveDate, trigger: &str, offset: &FixedOffset) -> DayRecords<'_> {
        let records = self
            .records
            .iter()
            .filter(|r| r.has_trigger(trigger))
            .filter(|r| r.local_date(offset) == Some(date))
            .collect();
        DayRecords { records, offset: *offset }
    }

    /// Number of triggered records per local date
    pub fn date_histogram(&self, trigger: &str, offset: &FixedOffset) -> BTreeMap<NaiveDate, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.has_trigger(trigger)) {
            if let Some(date) = record.local_date(offset) {
                *counts.entry(date).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Records of a single day, ready for matching
#[derive(Debug, Clone)]
pub struct DayRecords<'a> {
    records: Vec<&'a MeetingRecord>,
    offset: FixedOffset,
}

impl<'a> DayRecords<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the record for a session; the first tier with any candidate
    /// wins and the most recent start breaks ties inside it.
    pub fn match_session(&self, title: &str, meet_id: Option<&str>) -> Option<RecordMatch<'a>> {
        if let Some(meet_id) = meet_id.map(str::trim).filter(|id| !id.is_empty()) {
            let found = self.most_recent(|r| {
                r.platform_meeting_id
                    .as_deref()
                    .is_some_and(|id| id.trim().eq_ignore_ascii_case(meet_id))
            });
            if let Some(record) = found {
                return Some(RecordMatch { record, tier: MatchTier::MeetingId });
            }
        }

        if let Some(subject_id) = subject_id_in(title) {
            let needle = subject_id.to_lowercase();
            if let Some(record) = self.most_recent(|r| r.title.to_lowercase().contains(&needle)) {
                return Some(RecordMatch { record, tier: MatchTier::SubjectId });
            }
        }

        let wanted = normalize_title(title);
        self.most_recent(|r| normalize_title(&r.title) == wanted)
            .map(|record| RecordMatch { record, tier: MatchTier::Title })
    }

    fn most_recent<F>(&self, predicate: F) -> Option<&'a MeetingRecord>
    where
        F: Fn(&MeetingRecord) -> bool,
    {
        let mut best: Option<&'a MeetingRecord> = None;
        for &record in self.records.iter().filter(|r| predicate(r)) {
            best = match best {
                Some(current) if current.started_at(&self.offset) >= record.started_at(&self.offset) => {
                    Some(current)
                }
                _ => Some(record),
            };
        }
        best
    }
}
