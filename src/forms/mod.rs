//! Attendance form submission
//!
//! Builds the URL-encoded field list for one session and posts it to the
//! form's public response endpoint.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::{FormConfig, FormEntries};
use crate::types::{AttendanceStatus, StatusLabels};

/// Submission errors
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("form URL is not configured")]
    MissingUrl,

    #[error("invalid form URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("form rejected submission with status {status}")]
    Rejected { status: u16 },
}

/// Everything the form records about one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSubmission {
    pub learner_name: String,
    pub subject_id: String,
    /// `YYYY-MM-DD`
    pub session_date: String,
    pub agent: String,
    pub status: AttendanceStatus,
    pub report: String,
    pub artifact_link: String,
    /// Completed items, or the sentinel alone
    pub curriculum: Vec<String>,
}

impl FormSubmission {
    /// Ordered form fields. The date becomes three `_year`/`_month`/`_day`
    /// fields and every curriculum item repeats the curriculum field.
    pub fn to_fields(
        &self,
        entries: &FormEntries,
        labels: &StatusLabels,
    ) -> Result<Vec<(String, String)>, FormError> {
        let (year, month, day) = split_date(&self.session_date)?;

        let mut fields = vec![
            (entries.name.clone(), self.learner_name.clone()),
            (entries.subject_id.clone(), self.subject_id.clone()),
            (format!("{}_year", entries.date), year),
            (format!("{}_month", entries.date), month),
            (format!("{}_day", entries.date), day),
            (entries.agent.clone(), self.agent.clone()),
            (entries.status.clone(), self.status.label(labels).to_string()),
            (entries.report.clone(), self.report.clone()),
            (entries.link.clone(), self.artifact_link.clone()),
        ];
        fields.extend(
            self.curriculum
                .iter()
                .map(|item| (entries.curriculum.clone(), item.clone())),
        );
        Ok(fields)
    }
}

/// Response endpoint for a form's public view URL
pub fn form_response_url(view_url: &str) -> String {
    if let Some((base, _)) = view_url.split_once("viewform") {
        return format!("{}formResponse", base);
    }
    if view_url.contains("formResponse") {
        return view_url.to_string();
    }
    if view_url.ends_with('/') {
        format!("{}formResponse", view_url)
    } else {
        format!("{}/formResponse", view_url)
    }
}

/// Split a `YYYY-MM-DD` date into its zero-padded parts
pub fn split_date(date: &str) -> Result<(String, String, String), FormError> {
    let invalid = || FormError::InvalidDate(date.to_string());
    let trimmed = date.trim();

    let mut parts = trimmed.split('-');
    let (year, month, day) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d), None) => (y, m, d),
        _ => return Err(invalid()),
    };

    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !(digits(year, 4) && digits(month, 2) && digits(day, 2)) {
        return Err(invalid());
    }

    Ok((year.to_string(), month.to_string(), day.to_string()))
}

/// Destination for finished submissions
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Deliver one submission
    async fn submit(&self, submission: &FormSubmission) -> Result<(), FormError>;

    /// Sink name for logs
    fn name(&self) -> &'static str;
}

/// Posts submissions to the live form
#[derive(Debug, Clone)]
pub struct FormClient {
    view_url: String,
    post_url: String,
    user_agent: String,
    entries: FormEntries,
    labels: StatusLabels,
    http_client: reqwest::Client,
}

impl FormClient {
    /// Create a client for the configured form
    pub fn new(config: &FormConfig) -> Result<Self, FormError> {
        let view_url = config.view_url.trim();
        if view_url.is_empty() {
            return Err(FormError::MissingUrl);
        }
        url::Url::parse(view_url).map_err(|source| FormError::InvalidUrl {
            url: view_url.to_string(),
            source,
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(FormError::Client)?;

        Ok(Self {
            view_url: view_url.to_string(),
            post_url: form_response_url(view_url),
            user_agent: config.user_agent.clone(),
            entries: config.entries.clone(),
            labels: config.status_labels.clone(),
            http_client,
        })
    }

    /// Endpoint submissions are posted to
    pub fn post_url(&self) -> &str {
        &self.post_url
    }
}

#[async_trait]
impl SubmissionSink for FormClient {
    async fn submit(&self, submission: &FormSubmission) -> Result<(), FormError> {
        let fields = submission.to_fields(&self.entries, &self.labels)?;

        debug!(
            "Posting {} fields for {} to {}",
            fields.len(),
            submission.learner_name,
            self.post_url
        );

        let response = self
            .http_client
            .post(&self.post_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, &self.view_url)
            .form(&fields)
            .send()
            .await
            .map_err(|source| FormError::Request {
                url: self.post_url.clone(),
                source,
            })?;

        // the form answers a successful post with a redirect
        let status = response.status();
        if status.as_u16() < 400 {
            info!("Form accepted submission for {} ({})", submission.learner_name, status);
            Ok(())
        } else {
            error!("Form rejected submission for {} ({})", submission.learner_name, status);
            Err(FormError::Rejected { status: status.as_u16() })
        }
    }

    fn name(&self) -> &'static str {
        "form"
    }
}

/// Logs submissions instead of sending them
#[derive(Debug, Clone, Default)]
pub struct DryRunSink {
    entries: FormEntries,
    labels: StatusLabels,
}

impl DryRunSink {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            entries: config.entries.clone(),
            labels: config.status_labels.clone(),
        }
    }
}

#[async_trait]
impl SubmissionSink for DryRunSink {
    async fn submit(&self, submission: &FormSubmission) -> Result<(), FormError> {
        let fields = submission.to_fields(&self.entries, &self.labels)?;
        info!("Dry run: would submit for {}", submission.learner_name);
        for (name, value) in &fields {
            debug!("  {} = {}", name, value);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> FormSubmission {
        FormSubmission {
            learner_name: "Ana Souza".into(),
            subject_id: "AB12345".into(),
            session_date: "2026-02-03".into(),
            agent: "Pedro".into(),
            status: AttendanceStatus::Present,
            report: "Ela concluiu React.".into(),
            artifact_link: "https://example.com/r/1".into(),
            curriculum: vec!["Linux".into(), "React JS".into()],
        }
    }

    #[test]
    fn test_form_response_url() {
        assert_eq!(
            form_response_url("https://docs.google.com/forms/d/e/abc/viewform"),
            "https://docs.google.com/forms/d/e/abc/formResponse"
        );
        assert_eq!(
            form_response_url("https://docs.google.com/forms/d/e/abc/viewform?usp=sf_link"),
            "https://docs.google.com/forms/d/e/abc/formResponse"
        );
        assert_eq!(
            form_response_url("https://docs.google.com/forms/d/e/abc/formResponse"),
            "https://docs.google.com/forms/d/e/abc/formResponse"
        );
        assert_eq!(
            form_response_url("https://docs.google.com/forms/d/e/abc/"),
            "https://docs.google.com/forms/d/e/abc/formResponse"
        );
        assert_eq!(
            form_response_url("https://docs.google.com/forms/d/e/abc"),
            "https://docs.google.com/forms/d/e/abc/formResponse"
        );
    }

    #[test]
    fn test_split_date() {
        let (y, m, d) = split_date(" 2026-02-03 ").unwrap();
        assert_eq!((y.as_str(), m.as_str(), d.as_str()), ("2026", "02", "03"));

        for bad in ["2026-2-3", "03/02/2026", "2026-02-03-01", "", "abcd-ef-gh"] {
            assert!(matches!(split_date(bad), Err(FormError::InvalidDate(_))), "{bad}");
        }
    }

    #[test]
    fn test_fields_order_and_repeated_curriculum() {
        let fields = submission()
            .to_fields(&FormEntries::default(), &StatusLabels::default())
            .unwrap();

        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "entry.615656428",
                "entry.531507362",
                "entry.1496596961_year",
                "entry.1496596961_month",
                "entry.1496596961_day",
                "entry.1608308280",
                "entry.5905294",
                "entry.1761763556",
                "entry.1753304014",
                "entry.1419043947",
                "entry.1419043947",
            ]
        );
        assert_eq!(fields[6].1, "Presente");
        assert_eq!(fields[9].1, "Linux");
        assert_eq!(fields[10].1, "React JS");
    }

    #[test]
    fn test_fields_reject_bad_date() {
        let mut bad = submission();
        bad.session_date = "today".into();
        assert!(bad
            .to_fields(&FormEntries::default(), &StatusLabels::default())
            .is_err());
    }

    #[test]
    fn test_client_requires_url() {
        let mut config = FormConfig::default();
        assert!(matches!(FormClient::new(&config), Err(FormError::MissingUrl)));

        config.view_url = "not a url".into();
        assert!(matches!(FormClient::new(&config), Err(FormError::InvalidUrl { .. })));

        config.view_url = "https://docs.google.com/forms/d/e/abc/viewform".into();
        let client = FormClient::new(&config).unwrap();
        assert_eq!(client.post_url(), "https://docs.google.com/forms/d/e/abc/formResponse");
    }

    #[tokio::test]
    async fn test_dry_run_sink() {
        let sink = DryRunSink::new(&FormConfig::default());
        assert!(sink.submit(&submission()).await.is_ok());
        assert_eq!(sink.name(), "dry-run");

        let mut bad = submission();
        bad.session_date = "03/02/2026".into();
        assert!(sink.submit(&bad).await.is_err());
    }
}
