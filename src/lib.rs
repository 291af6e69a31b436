//! tutor-sync - Tutoring Attendance Library
//!
//! Infers which curriculum items a learner completed from a free-text
//! session report, and files daily attendance:
//! - curriculum inference with trigger windows and fuzzy matching
//! - calendar sessions from an events export
//! - meeting-record matching by conferencing code, enrollment id or title
//! - attendance form submission
//!
//! # Example
//!
//! ```
//! let result = tutor_sync::infer("Next week he will watch the flutter module.");
//! assert_eq!(result.items(), ["Não consumiu"]);
//! ```

// Core modules
pub mod types;
pub mod inference;
pub mod config;

// Collaborators
pub mod calendar;
pub mod records;
pub mod forms;
pub mod pipeline;
pub mod cli;

// Re-export commonly used types for convenience
pub use inference::{infer, CurriculumEngine, CurriculumTables, InferenceResult, TableError};

pub use config::Config;

pub use types::{AttendanceStatus, Session, StatusLabels};

pub use forms::{DryRunSink, FormClient, FormError, FormSubmission, SubmissionSink};

pub use pipeline::{DailyRun, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
