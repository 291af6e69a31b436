//! Daily attendance run
//!
//! For every scheduled session of a day: find its meeting record, infer the
//! completed curriculum from the report and submit the attendance form.

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::calendar::canonical_agent;
use crate::forms::{FormError, FormSubmission, SubmissionSink};
use crate::inference::CurriculumEngine;
use crate::records::{MatchTier, RecordStore};
use crate::types::{AttendanceStatus, Session};

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub submitted: usize,
    pub failed: usize,
    pub present: usize,
    pub absent: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<SessionOutcome>,
}

/// What happened to one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    pub learner_name: String,
    pub status: AttendanceStatus,
    pub matched_by: Option<String>,
    pub curriculum: Vec<String>,
    /// Submission error, if any
    pub error: Option<String>,
}

/// One day's run over a fixed set of collaborators
pub struct DailyRun<'a> {
    engine: &'a CurriculumEngine,
    records: &'a RecordStore,
    sink: &'a dyn SubmissionSink,
    trigger: String,
    offset: FixedOffset,
    known_agents: Vec<String>,
}

impl<'a> DailyRun<'a> {
    pub fn new(
        engine: &'a CurriculumEngine,
        records: &'a RecordStore,
        sink: &'a dyn SubmissionSink,
        offset: FixedOffset,
    ) -> Self {
        Self {
            engine,
            records,
            sink,
            trigger: "meeting_end".to_string(),
            offset,
            known_agents: Vec::new(),
        }
    }

    /// Record event tag that marks a finished meeting
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_known_agents(mut self, known_agents: Vec<String>) -> Self {
        self.known_agents = known_agents;
        self
    }

    /// Process every session; failures are counted, never fatal
    pub async fn run(&self, date: NaiveDate, sessions: &[Session]) -> RunSummary {
        let day = self.records.day(date, &self.trigger, &self.offset);
        let session_date = date.format("%Y-%m-%d").to_string();
        info!(
            "Processing {} sessions for {} against {} records via {}",
            sessions.len(),
            session_date,
            day.len(),
            self.sink.name()
        );

        let mut summary = RunSummary::default();

        for (index, session) in sessions.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, sessions.len(), session.learner_name);
            summary.processed += 1;

            let matched = day.match_session(&session.title, session.meet_id.as_deref());
            let (status, report, link, tier) = match matched {
                Some(found) => {
                    debug!("Matched record by {}", found.tier);
                    (
                        AttendanceStatus::Present,
                        found.record.summary.clone(),
                        found.record.report_url.clone(),
                        Some(found.tier),
                    )
                }
                None => {
                    warn!("No meeting record for '{}', marking absent", session.title);
                    (AttendanceStatus::Absent, String::new(), String::new(), None)
                }
            };

            match status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
            }

            let curriculum = self.engine.infer(&report).into_items();
            let submission = FormSubmission {
                learner_name: session.learner_name.clone(),
                subject_id: session.subject_id.clone(),
                session_date: session_date.clone(),
                agent: canonical_agent(&session.agent, &self.known_agents),
                status,
                report,
                artifact_link: link,
                curriculum,
            };

            let result = self.sink.submit(&submission).await;
            summary.outcomes.push(outcome(&submission, tier, result.as_ref().err()));
            match result {
                Ok(()) => summary.submitted += 1,
                Err(e) => {
                    error!("Submission for {} failed: {}", session.learner_name, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Run finished: {} processed, {} submitted, {} failed",
            summary.processed, summary.submitted, summary.failed
        );
        summary
    }
}

fn outcome(
    submission: &FormSubmission,
    tier: Option<MatchTier>,
    error: Option<&FormError>,
) -> SessionOutcome {
    SessionOutcome {
        learner_name: submission.learner_name.clone(),
        status: submission.status,
        matched_by: tier.map(|t| t.to_string()),
        curriculum: submission.curriculum.clone(),
        error: error.map(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::DryRunSink;
    use crate::records::MeetingRecord;

    #[tokio::test]
    async fn test_empty_day() {
        let engine = CurriculumEngine::builtin().unwrap();
        let records = RecordStore::default();
        let sink = DryRunSink::default();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let run = DailyRun::new(&engine, &records, &sink, offset);

        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let summary = run.run(date, &[]).await;
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_present_session_is_submitted() {
        let engine = CurriculumEngine::builtin().unwrap();
        let records = RecordStore::new(vec![MeetingRecord {
            trigger: "meeting_end".into(),
            start_time: Some("2026-02-03T15:00:00Z".into()),
            title: "Ana AB11 and Pedro".into(),
            summary: "Ela concluiu Linux.".into(),
            ..Default::default()
        }]);
        let sink = DryRunSink::default();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let run = DailyRun::new(&engine, &records, &sink, offset);

        let session = Session {
            title: "Ana AB11 and Pedro".into(),
            learner_name: "Ana AB11".into(),
            subject_id: "AB11".into(),
            agent: "Pedro".into(),
            date: None,
            meet_id: None,
        };
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let summary = run.run(date, &[session]).await;

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.outcomes[0].curriculum, ["Linux"]);
        assert_eq!(summary.outcomes[0].matched_by.as_deref(), Some("subject id"));
    }
}
