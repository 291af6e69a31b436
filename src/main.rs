//! tutor-sync - tutoring attendance automation
//!
//! Reads the day's sessions, matches meeting records and files the
//! attendance form with the inferred curriculum.

use clap::Parser;
use tutor_sync::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // WARN by default; --verbose or RUST_LOG for more
    let level = if args.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into())
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(args).await
}
