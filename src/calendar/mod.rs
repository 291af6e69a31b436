//! Scheduled sessions from exported calendar events
//!
//! Events are read from a JSON export (either a bare array or an object with
//! an `items` array, as the calendar API returns it). Each event title
//! follows the convention `<Learner Name> <SUBJECTID> and <Tutor Name>`.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::types::Session;

/// Conferencing link; the capture is the `abc-defg-hij` meeting code
static MEET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://meet\.google\.com/([a-z]{3}-[a-z]{4}-[a-z]{3})").unwrap()
});

/// Enrollment token at the end of the learner part of a title
static TRAILING_SUBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,10}[0-9]{2,10})\b$").unwrap());

/// A calendar event, reduced to the fields sessions are built from
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hangout_link: Option<String>,
    #[serde(default)]
    pub conference_data: Option<ConferenceData>,
    #[serde(default)]
    pub start: Option<EventTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPoint {
    #[serde(default)]
    pub uri: Option<String>,
}

/// Either a timed start or an all-day date
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventExport {
    List(Vec<CalendarEvent>),
    Wrapped { items: Vec<CalendarEvent> },
}

impl CalendarEvent {
    /// Start instant, when the event has a timed start
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.start.as_ref()?.date_time.as_deref()?;
        DateTime::parse_from_rfc3339(raw.trim()).ok()
    }

    /// Calendar date of the event in the given timezone
    pub fn local_date(&self, offset: &FixedOffset) -> Option<NaiveDate> {
        if let Some(start) = self.start_time() {
            return Some(start.with_timezone(offset).date_naive());
        }
        let raw = self.start.as_ref()?.date.as_deref()?;
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
    }
}

/// Parts of a session title
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TitleParts {
    pub learner: String,
    pub subject_id: String,
    pub agent: String,
}

/// Split `<learner> <ID> and <agent>` into its parts.
///
/// Only the first literal `" and "` separates learner from agent; a missing
/// enrollment token leaves `subject_id` empty.
pub fn parse_title(title: &str) -> TitleParts {
    let title = title.trim();
    let (learner_part, agent) = match title.split_once(" and ") {
        Some((learner, agent)) => (learner.trim(), agent.trim()),
        None => (title, ""),
    };

    match TRAILING_SUBJECT_ID.captures(learner_part) {
        Some(captures) => {
            let token = &captures[1];
            let name_end = captures.get(0).map(|m| m.start()).unwrap_or(learner_part.len());
            TitleParts {
                learner: learner_part[..name_end].trim().to_string(),
                subject_id: token.to_string(),
                agent: agent.to_string(),
            }
        }
        None => TitleParts {
            learner: learner_part.to_string(),
            subject_id: String::new(),
            agent: agent.to_string(),
        },
    }
}

/// Conferencing code of an event, searched in the hangout link, then the
/// conference entry points, then the description.
pub fn extract_meet_id(event: &CalendarEvent) -> Option<String> {
    let entry_points = event
        .conference_data
        .iter()
        .flat_map(|c| c.entry_points.iter())
        .filter_map(|ep| ep.uri.as_deref());

    event
        .hangout_link
        .as_deref()
        .into_iter()
        .chain(entry_points)
        .chain(event.description.as_deref())
        .find_map(meet_code)
}

fn meet_code(text: &str) -> Option<String> {
    MEET_LINK
        .captures(text)
        .map(|captures| captures[1].to_lowercase())
}

/// Map free-form tutor text onto a known tutor name.
///
/// The first known name contained in `raw` (case-insensitive) wins; anything
/// else is returned trimmed.
pub fn canonical_agent(raw: &str, known: &[String]) -> String {
    let lowered = raw.trim().to_lowercase();
    known
        .iter()
        .find(|name| !name.is_empty() && lowered.contains(&name.to_lowercase()))
        .cloned()
        .unwrap_or_else(|| raw.trim().to_string())
}

impl Session {
    /// Build a session from a calendar event
    pub fn from_event(event: &CalendarEvent, offset: &FixedOffset, known_agents: &[String]) -> Self {
        let parts = parse_title(&event.summary);
        Self {
            title: event.summary.clone(),
            learner_name: parts.learner,
            subject_id: parts.subject_id,
            agent: canonical_agent(&parts.agent, known_agents),
            date: event.local_date(offset),
            meet_id: extract_meet_id(event),
        }
    }
}

/// Read events from a JSON export file
pub fn load_events(path: &Path) -> Result<Vec<CalendarEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file {}", path.display()))?;
    let export: EventExport = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse events file {}", path.display()))?;
    let events = match export {
        EventExport::List(events) => events,
        EventExport::Wrapped { items } => items,
    };
    debug!("Loaded {} calendar events from {}", events.len(), path.display());
    Ok(events)
}

/// Sessions scheduled on `date` (local time), ordered by start time
pub fn sessions_for_day(
    events: &[CalendarEvent],
    date: NaiveDate,
    offset: &FixedOffset,
    known_agents: &[String],
) -> Vec<Session> {
    let mut todays: Vec<&CalendarEvent> = events
        .iter()
        .filter(|e| e.local_date(offset) == Some(date))
        .collect();
    todays.sort_by_key(|e| e.start_time());

    let sessions: Vec<Session> = todays
        .into_iter()
        .map(|e| Session::from_event(e, offset, known_agents))
        .collect();
    info!("Found {} sessions on {}", sessions.len(), date);
    sessions
}
