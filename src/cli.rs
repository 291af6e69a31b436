//! CLI interface for tutor-sync

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::calendar::{load_events, sessions_for_day};
use crate::config::{self, Config};
use crate::forms::{DryRunSink, FormClient, SubmissionSink};
use crate::inference::tables::BUILTIN_TABLES;
use crate::inference::{CurriculumTables, Evidence, InferenceResult};
use crate::pipeline::{DailyRun, RunSummary};
use crate::records::{resolve_records_dir, RecordStore};

#[derive(Parser)]
#[command(name = "tutor-sync")]
#[command(about = "Infer completed curriculum from tutoring reports and file attendance", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Use this config file instead of the default one
    #[arg(long, global = true, env = "TUTOR_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log progress at info level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer completed curriculum items from a report
    Infer {
        /// Report text (reads --file or stdin when omitted)
        text: Option<String>,
        /// Read the report from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Show triggered fragments and how items were recognized
        #[arg(short, long)]
        explain: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Process one day of sessions and submit the attendance form
    Run {
        /// Calendar events JSON export
        #[arg(long)]
        events: PathBuf,
        /// Day to process (YYYY-MM-DD, default: today in the configured offset)
        #[arg(long)]
        date: Option<String>,
        /// Meeting records directory
        #[arg(long)]
        records: Option<PathBuf>,
        /// Log the form fields instead of submitting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Show how many meeting records exist per day
    Records {
        /// Meeting records directory
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Inspect curriculum tables
    Tables {
        /// Validate a tables file
        #[arg(long)]
        check: Option<PathBuf>,
        /// Print the built-in tables
        #[arg(long)]
        dump: bool,
    },
    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Infer { text, file, explain, json } => {
            let config = load_config(cli.config.as_deref())?;
            let report = read_report(text, file.as_deref())?;
            infer_report(&config, &report, explain, json)?;
        }
        Commands::Run { events, date, records, dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            let summary = run_day(&config, &events, date.as_deref(), records, dry_run).await?;
            if summary.failed > 0 {
                bail!("{} of {} submissions failed", summary.failed, summary.processed);
            }
        }
        Commands::Records { records } => {
            let config = load_config(cli.config.as_deref())?;
            show_records(&config, records)?;
        }
        Commands::Tables { check, dump } => {
            if dump {
                print!("{}", BUILTIN_TABLES);
            } else if let Some(path) = check {
                let tables = CurriculumTables::from_path(&path)?;
                println!("{} is valid", path.display());
                print_tables(&tables);
            } else {
                let config = load_config(cli.config.as_deref())?;
                let engine = config.inference.build_engine()?;
                print_tables(engine.tables());
            }
        }
        Commands::Config { show, reset, path } => {
            if path {
                println!("{}", config::config_path()?.display());
            } else if reset {
                config::reset_config()?;
            } else {
                let config = load_config(cli.config.as_deref())?;
                if !show {
                    println!("Current configuration (use --reset to restore defaults):\n");
                }
                config::show_config(&config)?;
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn read_report(text: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()));
    }
    let mut report = String::new();
    std::io::stdin()
        .read_to_string(&mut report)
        .context("Failed to read report from stdin")?;
    Ok(report)
}

#[derive(Serialize)]
struct InferOutput<'a> {
    #[serde(flatten)]
    result: &'a InferenceResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    evidence: Vec<Evidence>,
}

fn infer_report(config: &Config, report: &str, explain: bool, json: bool) -> Result<()> {
    let engine = config.inference.build_engine()?;
    let (result, evidence) = if explain {
        engine.infer_with_evidence(report)
    } else {
        (engine.infer(report), Vec::new())
    };

    if json {
        let output = InferOutput { result: &result, evidence };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for item in result.items() {
        println!("{}", item);
    }

    if explain {
        println!();
        if evidence.is_empty() {
            println!("No completion or future-intent triggers found.");
        }
        for record in &evidence {
            let kind = match (record.hits.completion, record.hits.future) {
                (true, true) => "completion+future",
                (true, false) => "completion",
                _ => "future",
            };
            println!("fragment {} [{}]: {}", record.fragment, kind, record.window);
            for recognized in &record.recognized {
                println!("  -> {} ({})", recognized.item, recognized.source);
            }
        }
        if !result.future_only().is_empty() {
            let planned: Vec<&str> = result.future_only().iter().map(String::as_str).collect();
            println!("\nPlanned, not completed: {}", planned.join(", "));
        }
    }

    Ok(())
}

async fn run_day(
    config: &Config,
    events_path: &Path,
    date: Option<&str>,
    records_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<RunSummary> {
    let offset = config.calendar.offset()?;
    let date = match date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", raw))?,
        None => Utc::now().with_timezone(&offset).date_naive(),
    };

    let engine = config.inference.build_engine()?;
    let events = load_events(events_path)?;
    let sessions = sessions_for_day(&events, date, &offset, &config.calendar.known_agents);
    if sessions.is_empty() {
        println!("No sessions scheduled on {}.", date);
        return Ok(RunSummary::default());
    }

    let records = load_records(config, records_dir);

    let sink: Box<dyn SubmissionSink> = if dry_run {
        Box::new(DryRunSink::new(&config.form))
    } else {
        Box::new(FormClient::new(&config.form).context("Form is not usable")?)
    };

    let run = DailyRun::new(&engine, &records, sink.as_ref(), offset)
        .with_trigger(config.records.trigger.clone())
        .with_known_agents(config.calendar.known_agents.clone());
    let summary = run.run(date, &sessions).await;

    println!("Sessions on {}:", date);
    for outcome in &summary.outcomes {
        let mark = if outcome.error.is_some() { "FAIL" } else { "ok" };
        println!(
            "  [{}] {} - {} ({})",
            mark,
            outcome.learner_name,
            outcome.status,
            outcome.curriculum.join(", ")
        );
        if let Some(error) = &outcome.error {
            println!("       {}", error);
        }
    }
    println!(
        "\n{} processed, {} submitted, {} failed ({} present, {} absent){}",
        summary.processed,
        summary.submitted,
        summary.failed,
        summary.present,
        summary.absent,
        if dry_run { " [dry run]" } else { "" }
    );

    Ok(summary)
}

fn load_records(config: &Config, records_dir: Option<PathBuf>) -> RecordStore {
    match records_dir.or_else(|| resolve_records_dir(&config.records.directories)) {
        Some(dir) => RecordStore::load(&dir),
        None => RecordStore::default(),
    }
}

fn show_records(config: &Config, records_dir: Option<PathBuf>) -> Result<()> {
    let offset = config.calendar.offset()?;
    let records = load_records(config, records_dir);
    let histogram = records.date_histogram(&config.records.trigger, &offset);

    println!(
        "{} records, {} with trigger '{}'",
        records.len(),
        histogram.values().sum::<usize>(),
        config.records.trigger
    );
    for (date, count) in &histogram {
        println!("  {}  {}", date, count);
    }

    Ok(())
}

fn print_tables(tables: &CurriculumTables) {
    let scanner = tables.scanner();
    println!("Sentinel:             {}", tables.sentinel());
    println!("Catalog items:        {}", tables.catalog().len());
    println!("Aliases:              {}", tables.aliases().len());
    println!("Completion patterns:  {}", scanner.completion().len());
    println!("Future patterns:      {}", scanner.future().len());
    println!("Module rules:         {}", tables.module_rules().len());
}
