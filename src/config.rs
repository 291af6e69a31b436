//! Configuration management
//!
//! Manages inference tuning, meeting-record locations, calendar conventions
//! and the attendance form layout.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::inference::{CurriculumEngine, CurriculumTables, DEFAULT_FUZZY_THRESHOLD, DEFAULT_WINDOW};
use crate::types::StatusLabels;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Curriculum inference settings
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Where meeting records are read from
    #[serde(default)]
    pub records: RecordsConfig,
    /// Calendar conventions (timezone, tutor names)
    #[serde(default)]
    pub calendar: CalendarConfig,
    /// Attendance form endpoint and field ids
    #[serde(default)]
    pub form: FormConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Fragments after a trigger that still count as evidence
    #[serde(default = "default_window")]
    pub window: usize,
    /// Minimum similarity for the fuzzy fallback
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Custom tables file; the built-in tables are used when unset
    #[serde(default)]
    pub tables_path: Option<PathBuf>,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            fuzzy_threshold: default_fuzzy_threshold(),
            tables_path: None,
        }
    }
}

impl InferenceConfig {
    /// Build the inference engine described by this section
    pub fn build_engine(&self) -> Result<CurriculumEngine> {
        let tables = match &self.tables_path {
            Some(path) => CurriculumTables::from_path(path)?,
            None => CurriculumTables::builtin()?,
        };
        let engine = CurriculumEngine::new(tables)
            .with_window(self.window)
            .with_fuzzy_threshold(self.fuzzy_threshold)?;
        Ok(engine)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Candidate directories holding meeting-record JSON files; the first
    /// existing one is used
    #[serde(default = "default_record_dirs")]
    pub directories: Vec<PathBuf>,
    /// Event tag of records that describe a finished meeting
    #[serde(default = "default_record_trigger")]
    pub trigger: String,
}

fn default_record_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("read_payloads"), PathBuf::from("data/read_payloads")]
}

fn default_record_trigger() -> String {
    "meeting_end".to_string()
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            directories: default_record_dirs(),
            trigger: default_record_trigger(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Offset of the local timezone sessions are scheduled in
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Canonical tutor names; free-form agent text is mapped onto these
    #[serde(default = "default_known_agents")]
    pub known_agents: Vec<String>,
}

fn default_utc_offset_hours() -> i32 {
    -3
}

fn default_known_agents() -> Vec<String> {
    ["Natanael", "Douglas", "Pedro", "Alex"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            known_agents: default_known_agents(),
        }
    }
}

impl CalendarConfig {
    /// Local timezone as a fixed offset
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("Invalid UTC offset: {} hours", self.utc_offset_hours))
    }
}

/// Form field ids (`entry.<n>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntries {
    #[serde(default = "default_entry_name")]
    pub name: String,
    #[serde(default = "default_entry_subject_id")]
    pub subject_id: String,
    /// Date field base id; submitted as `_year`, `_month` and `_day`
    #[serde(default = "default_entry_date")]
    pub date: String,
    #[serde(default = "default_entry_agent")]
    pub agent: String,
    #[serde(default = "default_entry_status")]
    pub status: String,
    #[serde(default = "default_entry_report")]
    pub report: String,
    #[serde(default = "default_entry_link")]
    pub link: String,
    /// Checkbox field; one value per completed item
    #[serde(default = "default_entry_curriculum")]
    pub curriculum: String,
}

fn default_entry_name() -> String {
    "entry.615656428".to_string()
}

fn default_entry_subject_id() -> String {
    "entry.531507362".to_string()
}

fn default_entry_date() -> String {
    "entry.1496596961".to_string()
}

fn default_entry_agent() -> String {
    "entry.1608308280".to_string()
}

fn default_entry_status() -> String {
    "entry.5905294".to_string()
}

fn default_entry_report() -> String {
    "entry.1761763556".to_string()
}

fn default_entry_link() -> String {
    "entry.1753304014".to_string()
}

fn default_entry_curriculum() -> String {
    "entry.1419043947".to_string()
}

impl Default for FormEntries {
    fn default() -> Self {
        Self {
            name: default_entry_name(),
            subject_id: default_entry_subject_id(),
            date: default_entry_date(),
            agent: default_entry_agent(),
            status: default_entry_status(),
            report: default_entry_report(),
            link: default_entry_link(),
            curriculum: default_entry_curriculum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Public `.../viewform` URL of the attendance form
    #[serde(default)]
    pub view_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub entries: FormEntries,
    #[serde(default)]
    pub status_labels: StatusLabels,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            view_url: String::new(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            entries: FormEntries::default(),
            status_labels: StatusLabels::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it on first use
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "tutor-sync", "tutor-sync")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("Inference:");
    println!("  window:           {}", config.inference.window);
    println!("  fuzzy threshold:  {}", config.inference.fuzzy_threshold);
    println!(
        "  tables:           {}",
        config.inference.tables_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );

    println!("\nRecords:");
    for dir in &config.records.directories {
        println!("  directory:        {}", dir.display());
    }
    println!("  trigger:          {}", config.records.trigger);

    println!("\nCalendar:");
    println!("  UTC offset:       {:+} h", config.calendar.utc_offset_hours);
    println!("  known agents:     {}", config.calendar.known_agents.join(", "));

    println!("\nForm:");
    println!(
        "  view URL:         {}",
        if config.form.view_url.is_empty() { "(not configured)" } else { &config.form.view_url }
    );
    println!("  timeout:          {}s", config.form.timeout_secs);
    println!(
        "  status labels:    {} / {}",
        config.form.status_labels.present, config.form.status_labels.absent
    );

    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
