//! The merge-derive-extrapolate pipeline shared by every front-end.
//!
//! Stage order is fixed:
//! normalize -> derive (history) -> extrapolate raw -> derive anchored gaps ->
//! extrapolate anchored -> close identities -> assemble
//!
//! Every stage before `assemble` works on the full raw history; the run window
//! only bounds the horizon and the assembled panel.
//!
//! Each stage collects all of its errors; a failing stage ends the run.
//! The pipeline performs no I/O.

use tracing::info;

use crate::audit::{Advisory, TransformationLog};
use crate::derive::{close_identities, derive_history, fill_anchored_gaps};
use crate::domain::{RawTable, ResolvedConfig, RunConfig, SeriesRole};
use crate::error::PanelError;
use crate::extrapolate::extrapolate_where;
use crate::normalize::normalize;
use crate::panel::{Panel, assemble};

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub panel: Panel,
    pub log: TransformationLog,
    /// Non-fatal notes (fallbacks, low-confidence holds), in log order.
    pub advisories: Vec<Advisory>,
}

/// Resolve `config` and run the full pipeline over `raw`.
pub fn run_pipeline(raw: &RawTable, config: &RunConfig) -> Result<PipelineOutput, PanelError> {
    let resolved = config.resolve()?;
    run_resolved(raw, &resolved)
}

/// Run the pipeline with an already validated configuration.
pub fn run_resolved(raw: &RawTable, config: &ResolvedConfig) -> Result<PipelineOutput, PanelError> {
    info!(
        cells = raw.len(),
        start = config.window.start,
        end = config.window.end,
        parallel = config.parallel,
        "starting panel run"
    );
    let mut log = TransformationLog::new();

    // 1) Raw columns -> canonical series.
    let mut partial = normalize(raw, config, &mut log)?;

    // 2) Anchored and identity series on observed years.
    derive_history(&mut partial, &config.params, &mut log)?;

    // 3) Raw series out to the horizon, interior gaps interpolated.
    extrapolate_where(&mut partial, config, &mut log, |c| {
        matches!(c.role, SeriesRole::Raw { .. })
    })?;

    // 4) Anchored series on the years their inputs were interpolated.
    fill_anchored_gaps(&mut partial, &config.params, &mut log)?;

    // 5) Anchored series out to the horizon.
    extrapolate_where(&mut partial, config, &mut log, |c| c.role == SeriesRole::Anchored)?;

    // 6) Identity series on forecast years, then the accounting check.
    close_identities(&mut partial, &config.params, config.identity_tolerance, &mut log)?;

    // 7) Gap-free panel.
    let panel = assemble(&partial)?;

    let advisories: Vec<Advisory> = log.advisories().cloned().collect();
    info!(
        log_entries = log.len(),
        advisories = advisories.len(),
        "panel run complete"
    );

    Ok(PipelineOutput {
        panel,
        log,
        advisories,
    })
}
