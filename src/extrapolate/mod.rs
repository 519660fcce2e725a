//! Extrapolation engine.
//!
//! Extends every raw and anchored canonical series to the horizon year using
//! its configured strategy (see `engine` for the per-series logic).
//!
//! Series are independent, so they can be processed on the rayon pool when
//! `parallel` is set. Outcomes are always merged in sorted series-name order,
//! which keeps the panel and the log identical between sequential and parallel
//! runs.

pub mod engine;

pub use engine::*;

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::info;

use crate::audit::TransformationLog;
use crate::domain::schema::{self, CanonicalSeries};
use crate::domain::ResolvedConfig;
use crate::error::PanelError;
use crate::panel::PartialPanel;

/// Extend all extrapolated series of `panel` to `config.window.end`.
///
/// Every series is attempted; `InsufficientData` errors are returned together.
pub fn extrapolate(
    panel: &mut PartialPanel,
    config: &ResolvedConfig,
    log: &mut TransformationLog,
) -> Result<(), PanelError> {
    extrapolate_where(panel, config, log, |_| true)
}

/// Extend the extrapolated series accepted by `select`.
pub fn extrapolate_where(
    panel: &mut PartialPanel,
    config: &ResolvedConfig,
    log: &mut TransformationLog,
    select: impl Fn(&CanonicalSeries) -> bool,
) -> Result<(), PanelError> {
    let mut jobs = Vec::new();
    let mut errors = Vec::new();

    for canonical in schema::extrapolated_series().filter(|c| select(c)) {
        let Some(strategy) = config.strategy_for(canonical.name) else {
            // Resolution guarantees an assignment for every extrapolated series.
            errors.push(PanelError::Config(format!(
                "no extrapolation strategy assigned to `{}`",
                canonical.name
            )));
            continue;
        };
        jobs.push(SeriesJob {
            name: canonical.name.to_string(),
            series: panel.take(canonical.name).unwrap_or_default(),
            strategy,
        });
    }

    let window = config.window;
    let min_obs = config.arima_min_observations;
    let outcomes: BTreeMap<String, Result<SeriesOutcome, PanelError>> = if config.parallel {
        jobs.into_par_iter()
            .map(|job| (job.name.clone(), extend_series(job, window, min_obs)))
            .collect()
    } else {
        jobs.into_iter()
            .map(|job| (job.name.clone(), extend_series(job, window, min_obs)))
            .collect()
    };

    let mut extended = 0usize;
    for (name, outcome) in outcomes {
        match outcome {
            Ok(SeriesOutcome { series, log: batch }) => {
                panel.insert(&name, series);
                log.append_series(batch);
                extended += 1;
            }
            Err(err) => errors.push(err),
        }
    }

    if !errors.is_empty() {
        return Err(PanelError::collect(errors));
    }

    info!(
        series = extended,
        fallbacks = log.extrapolations().filter(|r| r.used_fallback()).count(),
        horizon = window.end,
        "extrapolated series to horizon"
    );
    Ok(())
}
