//! Shared types used across modules
//!
//! This module contains types that are used by multiple modules
//! to avoid circular dependencies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether the learner showed up to a scheduled session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Form label for this status, using the configured wording
    pub fn label<'a>(&self, labels: &'a StatusLabels) -> &'a str {
        match self {
            AttendanceStatus::Present => &labels.present,
            AttendanceStatus::Absent => &labels.absent,
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
        }
    }
}

/// Option labels the form uses for attendance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabels {
    #[serde(default = "default_present_label")]
    pub present: String,
    #[serde(default = "default_absent_label")]
    pub absent: String,
}

fn default_present_label() -> String {
    "Presente".to_string()
}

fn default_absent_label() -> String {
    "Falta".to_string()
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            present: default_present_label(),
            absent: default_absent_label(),
        }
    }
}

/// One scheduled tutoring session, as derived from a calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Full event title, used for record matching
    pub title: String,
    pub learner_name: String,
    /// Enrollment token such as `ABC12345`; empty when the title has none
    pub subject_id: String,
    /// Tutor responsible for the session, already canonicalized
    pub agent: String,
    pub date: Option<NaiveDate>,
    /// Conferencing code (`abc-defg-hij`), lowercase
    pub meet_id: Option<String>,
}
