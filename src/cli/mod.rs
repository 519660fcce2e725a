//! Command-line parsing for the `panel` binary.
//!
//! Argument parsing and command dispatch stay separate from the pipeline code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Year;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "panel", version, about = "Merge, derive and extrapolate a macroeconomic panel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the panel from a raw CSV, print the run summary, and optionally export.
    Run(RunArgs),
    /// Write a seeded synthetic raw table in the CSV format `run` reads.
    Synth(SynthArgs),
    /// Print the canonical schema, the strategy table and the source mapping.
    Schema(SchemaArgs),
}

/// Options for `panel run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Long-format raw CSV (`source,column,year,value[,stale]`).
    #[arg(long, value_name = "CSV")]
    pub raw: PathBuf,

    /// JSON run configuration; omitted fields take their defaults.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// First year of the panel (overrides the config).
    #[arg(long)]
    pub start_year: Option<Year>,

    /// Horizon year (overrides the config).
    #[arg(long)]
    pub end_year: Option<Year>,

    /// Extrapolate series in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Number of trailing years shown in the summary table.
    #[arg(long, default_value_t = 5)]
    pub tail: usize,

    /// Export the panel as wide CSV.
    #[arg(long = "export-panel", value_name = "CSV")]
    pub export_panel: Option<PathBuf>,

    /// Export the transformation log as JSON.
    #[arg(long = "export-log", value_name = "JSON")]
    pub export_log: Option<PathBuf>,
}

/// Options for `panel synth`.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First year of generated data.
    #[arg(long, default_value_t = 2000)]
    pub start_year: Year,

    /// Latest year any column may reach.
    #[arg(long, default_value_t = 2022)]
    pub last_year: Year,
}

/// Options for `panel schema`.
#[derive(Debug, Args, Clone)]
pub struct SchemaArgs {
    /// Show the strategy table and mapping of this JSON config instead of the defaults.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::parse_from([
            "panel",
            "run",
            "--raw",
            "raw.csv",
            "--end-year",
            "2040",
            "--parallel",
            "--export-log",
            "log.json",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.raw, PathBuf::from("raw.csv"));
        assert_eq!(args.end_year, Some(2040));
        assert_eq!(args.start_year, None);
        assert!(args.parallel);
        assert_eq!(args.export_log, Some(PathBuf::from("log.json")));
    }

    #[test]
    fn synth_defaults() {
        let cli = Cli::parse_from(["panel", "synth", "--out", "raw.csv"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!((args.seed, args.start_year, args.last_year), (42, 2000, 2022));
    }
}
