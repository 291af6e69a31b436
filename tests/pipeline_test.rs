//! End-to-end tests for the daily run, with an in-memory form

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use tokio::sync::Mutex;

use tutor_sync::calendar::{load_events, sessions_for_day};
use tutor_sync::records::RecordStore;
use tutor_sync::{
    AttendanceStatus, Config, CurriculumEngine, DailyRun, FormError, FormSubmission, SubmissionSink,
};

const SENTINEL: &str = "Não consumiu";

/// Keeps every submission; rejects learners listed in `reject`
#[derive(Default)]
struct RecordingSink {
    reject: Vec<String>,
    submitted: Mutex<Vec<FormSubmission>>,
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit(&self, submission: &FormSubmission) -> Result<(), FormError> {
        if self.reject.contains(&submission.learner_name) {
            return Err(FormError::Rejected { status: 500 });
        }
        self.submitted.lock().await.push(submission.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

const EVENTS: &str = r#"{
  "kind": "calendar#events",
  "items": [
    {
      "summary": "Carla Dias EF11111 and Alex",
      "start": { "dateTime": "2026-02-03T16:00:00-03:00" }
    },
    {
      "summary": "Ana Souza AB12345 and pedro silva",
      "hangoutLink": "https://meet.google.com/abc-defg-hij",
      "start": { "dateTime": "2026-02-03T10:00:00-03:00" }
    },
    {
      "summary": "Bruno Lima CD67890 and Douglas",
      "start": { "dateTime": "2026-02-03T14:00:00-03:00" }
    },
    {
      "summary": "Ana Souza AB12345 and Pedro",
      "start": { "dateTime": "2026-02-04T10:00:00-03:00" }
    }
  ]
}"#;

fn write_fixtures(dir: &Path) {
    std::fs::write(dir.join("events.json"), EVENTS).unwrap();

    let records = dir.join("read_payloads");
    std::fs::create_dir(&records).unwrap();
    std::fs::write(
        records.join("ana.json"),
        r#"{
          "trigger": "meeting_end",
          "start_time": "2026-02-03T13:05:00Z",
          "platform_meeting_id": "abc-defg-hij",
          "title": "Weekly tutoring",
          "summary": "Ela concluiu o módulo de React.",
          "report_url": "https://reports.example/ana"
        }"#,
    )
    .unwrap();
    std::fs::write(
        records.join("bruno.json"),
        r#"{
          "trigger": "meeting_end",
          "start_time": "2026-02-03T14:00:00",
          "title": "Bruno Lima CD67890 and Douglas",
          "summary": "Next week he will watch the flutter module.",
          "report_url": "https://reports.example/bruno"
        }"#,
    )
    .unwrap();
    std::fs::write(
        records.join("carla.json"),
        r#"{
          "trigger": "meeting_start",
          "start_time": "2026-02-03T19:00:00Z",
          "title": "Carla Dias EF11111 and Alex",
          "summary": "Ela concluiu Linux."
        }"#,
    )
    .unwrap();
    std::fs::write(records.join("broken.json"), "{").unwrap();
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
}

#[tokio::test]
async fn test_daily_run_submits_every_session() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let config = Config::default();
    let offset = config.calendar.offset().unwrap();
    let engine = CurriculumEngine::builtin().unwrap();
    let records = RecordStore::load(&dir.path().join("read_payloads"));
    assert_eq!(records.len(), 3);

    let events = load_events(&dir.path().join("events.json")).unwrap();
    let sessions = sessions_for_day(&events, day(), &offset, &config.calendar.known_agents);
    assert_eq!(sessions.len(), 3);

    let sink = RecordingSink::default();
    let run = DailyRun::new(&engine, &records, &sink, offset)
        .with_trigger(config.records.trigger.clone())
        .with_known_agents(config.calendar.known_agents.clone());
    let summary = run.run(day(), &sessions).await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.submitted, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.present, 2);
    assert_eq!(summary.absent, 1);

    let submitted = sink.submitted.lock().await;
    let names: Vec<&str> = submitted.iter().map(|s| s.learner_name.as_str()).collect();
    assert_eq!(names, ["Ana Souza", "Bruno Lima", "Carla Dias"]);

    let ana = &submitted[0];
    assert_eq!(ana.subject_id, "AB12345");
    assert_eq!(ana.agent, "Pedro");
    assert_eq!(ana.session_date, "2026-02-03");
    assert_eq!(ana.status, AttendanceStatus::Present);
    assert_eq!(ana.artifact_link, "https://reports.example/ana");
    assert_eq!(ana.curriculum, ["React JS"]);

    let bruno = &submitted[1];
    assert_eq!(bruno.status, AttendanceStatus::Present);
    assert_eq!(bruno.curriculum, [SENTINEL]);

    let carla = &submitted[2];
    assert_eq!(carla.status, AttendanceStatus::Absent);
    assert!(carla.report.is_empty());
    assert!(carla.artifact_link.is_empty());
    assert_eq!(carla.curriculum, [SENTINEL]);

    assert_eq!(summary.outcomes[0].matched_by.as_deref(), Some("meeting id"));
    assert_eq!(summary.outcomes[1].matched_by.as_deref(), Some("subject id"));
    assert_eq!(summary.outcomes[2].matched_by, None);
}

#[tokio::test]
async fn test_failed_submission_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let config = Config::default();
    let offset = config.calendar.offset().unwrap();
    let engine = CurriculumEngine::builtin().unwrap();
    let records = RecordStore::load(&dir.path().join("read_payloads"));
    let events = load_events(&dir.path().join("events.json")).unwrap();
    let sessions = sessions_for_day(&events, day(), &offset, &config.calendar.known_agents);

    let sink = RecordingSink {
        reject: vec!["Bruno Lima".to_string()],
        ..Default::default()
    };
    let run = DailyRun::new(&engine, &records, &sink, offset);
    let summary = run.run(day(), &sessions).await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.failed, 1);
    assert!(summary.outcomes[1].error.is_some());
    assert_eq!(sink.submitted.lock().await.len(), 2);
}

#[tokio::test]
async fn test_no_records_marks_everyone_absent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let config = Config::default();
    let offset = config.calendar.offset().unwrap();
    let engine = CurriculumEngine::builtin().unwrap();
    let records = RecordStore::load(&dir.path().join("missing"));
    let events = load_events(&dir.path().join("events.json")).unwrap();
    let sessions = sessions_for_day(&events, day(), &offset, &config.calendar.known_agents);

    let sink = RecordingSink::default();
    let summary = DailyRun::new(&engine, &records, &sink, offset)
        .run(day(), &sessions)
        .await;

    assert_eq!(summary.absent, 3);
    assert_eq!(summary.present, 0);
    for submission in sink.submitted.lock().await.iter() {
        assert_eq!(submission.curriculum, [SENTINEL]);
    }
}
