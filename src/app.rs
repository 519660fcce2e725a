//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads the raw table and configuration
//! - runs the pipeline and prints the summary
//! - writes optional exports

use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, RunArgs, SchemaArgs, SynthArgs};
use crate::data::{SynthConfig, generate_raw_table};
use crate::domain::{ParameterSet, RunConfig};
use crate::error::PanelError;

pub mod pipeline;

/// Entry point for the `panel` binary.
pub fn run() -> Result<(), PanelError> {
    // A missing `.env` is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Synth(args) => handle_synth(args),
        Command::Schema(args) => handle_schema(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for the report.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), PanelError> {
    let config = run_config_from_args(&args)?.resolve()?;
    let ingest = crate::io::load_raw_table(&args.raw)?;
    if !ingest.row_errors.is_empty() {
        eprintln!(
            "Skipped {} of {} raw rows (see log for details).",
            ingest.row_errors.len(),
            ingest.rows_read
        );
    }

    let output = pipeline::run_resolved(&ingest.table, &config)?;
    println!(
        "{}",
        crate::report::format_run_summary(&output, &config, args.tail, Local::now())
    );

    if let Some(path) = &args.export_panel {
        crate::io::write_panel_csv(path, &output.panel)?;
        info!(path = %path.display(), "wrote panel CSV");
    }
    if let Some(path) = &args.export_log {
        crate::io::write_log_json(path, &output.log)?;
        info!(path = %path.display(), "wrote transformation log");
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), PanelError> {
    let config = SynthConfig {
        seed: args.seed,
        start_year: args.start_year,
        last_year: args.last_year,
        base_year: ParameterSet::default().base_year,
    };
    let raw = generate_raw_table(&config)?;
    crate::io::write_raw_csv(&args.out, &raw)?;
    println!("Wrote {} raw cells to {}", raw.len(), args.out.display());
    Ok(())
}

fn handle_schema(args: SchemaArgs) -> Result<(), PanelError> {
    let config = match &args.config {
        Some(path) => crate::io::load_run_config(path)?,
        None => RunConfig::default(),
    };
    println!("{}", crate::report::format_schema(&config.resolve()?));
    Ok(())
}

/// Config file (or defaults) with CLI overrides applied.
pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, PanelError> {
    let mut config = match args.config.as_deref() {
        Some(path) => crate::io::load_run_config(path)?,
        None => RunConfig::default(),
    };
    if let Some(start) = args.start_year {
        config.start_year = start;
    }
    if let Some(end) = args.end_year {
        config.end_year = end;
    }
    config.parallel |= args.parallel;
    Ok(config)
}
