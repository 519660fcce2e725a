//! Per-series extension to the horizon year.
//!
//! A series is handled in isolation: interior gaps are interpolated, then the
//! assigned strategy runs on the contiguous history, walking the fallback
//! chain when it fails. Everything a series produces (filled values and log
//! entries) stays local to the series until the caller merges it.

use tracing::{debug, warn};

use crate::audit::{
    Advisory, AdvisoryKind, ExtrapolationRecord, FallbackStep, InterpolationRecord, LogEntry,
    SeriesLog,
};
use crate::domain::{FillMethod, Series, StrategyKind, YearWindow};
use crate::error::PanelError;
use crate::math::interpolate_interior;
use crate::models::{Forecast, growth, run_strategy};

/// Inputs of one series' extension.
#[derive(Debug, Clone)]
pub struct SeriesJob {
    pub name: String,
    pub series: Series,
    pub strategy: StrategyKind,
}

/// Filled series plus the entries describing how it was filled.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub series: Series,
    pub log: SeriesLog,
}

/// Strategies tried in order for an assigned strategy, before the constant hold.
pub fn fallback_chain(strategy: StrategyKind) -> &'static [StrategyKind] {
    match strategy {
        StrategyKind::Arima => &[StrategyKind::Arima, StrategyKind::AverageGrowth],
        StrategyKind::LinearRegression => &[StrategyKind::LinearRegression, StrategyKind::AverageGrowth],
        StrategyKind::AverageGrowth => &[StrategyKind::AverageGrowth],
    }
}

/// Extend one series to `window.end`.
///
/// The whole observed history is used, including years before `window.start`.
/// Fails only when the series has no observation at all; strategy failures are
/// recorded as fallbacks.
pub fn extend_series(
    job: SeriesJob,
    window: YearWindow,
    arima_min_observations: usize,
) -> Result<SeriesOutcome, PanelError> {
    let SeriesJob { name, mut series, strategy } = job;
    let mut log = SeriesLog::new();

    let (Some(first), Some(last)) = (series.first_observed(), series.last_observed()) else {
        return Err(PanelError::InsufficientData { series: name });
    };

    let interpolated = interpolate_interior(&mut series);
    if !interpolated.is_empty() {
        debug!(series = %name, years = interpolated.len(), "interpolated interior gaps");
        log.append(LogEntry::Interpolation(InterpolationRecord {
            series: name.clone(),
            years: interpolated,
        }));
    }

    if last >= window.end {
        debug!(series = %name, "observed through the horizon; nothing to extrapolate");
        return Ok(SeriesOutcome { series, log });
    }

    let history: Vec<f64> = (first..=last).filter_map(|y| series.get(y)).collect();
    let steps = (window.end - last) as usize;

    let Some((forecast, applied, fallbacks)) =
        run_with_fallback(&name, strategy, &history, steps, arima_min_observations)
    else {
        return Err(PanelError::InsufficientData { series: name });
    };
    let low_confidence = applied == FillMethod::ConstantHold;

    let years_filled: Vec<_> = ((last + 1)..=window.end).collect();
    for (&year, &value) in years_filled.iter().zip(&forecast.values) {
        series.set(year, value);
    }

    let chain = fallbacks
        .iter()
        .map(|f| format!("{} ({})", f.from.display_name(), f.reason))
        .collect::<Vec<_>>()
        .join(" -> ");

    log.append(LogEntry::Extrapolation(ExtrapolationRecord {
        series: name.clone(),
        requested: strategy,
        applied,
        fallbacks,
        last_observed_year: last,
        years_filled,
        diagnostics: forecast.diagnostics,
        low_confidence,
    }));

    if low_confidence {
        log.append(LogEntry::Advisory(Advisory {
            series: name.clone(),
            kind: AdvisoryKind::LowConfidenceExtrapolation,
            detail: format!(
                "held constant at the {last} value from {} observation(s); tried {chain}",
                history.len()
            ),
        }));
    } else if applied != FillMethod::from(strategy) {
        log.append(LogEntry::Advisory(Advisory {
            series: name.clone(),
            kind: AdvisoryKind::FallbackUsed,
            detail: format!("filled by {} after {chain}", applied.display_name()),
        }));
    }

    Ok(SeriesOutcome { series, log })
}

fn run_with_fallback(
    name: &str,
    strategy: StrategyKind,
    history: &[f64],
    steps: usize,
    arima_min_observations: usize,
) -> Option<(Forecast, FillMethod, Vec<FallbackStep>)> {
    let mut fallbacks = Vec::new();

    for &kind in fallback_chain(strategy) {
        match run_strategy(kind, history, steps, arima_min_observations) {
            Ok(forecast) => return Some((forecast, kind.into(), fallbacks)),
            Err(err) => {
                warn!(series = name, strategy = kind.display_name(), %err, "strategy failed; falling back");
                fallbacks.push(FallbackStep {
                    from: kind.into(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let forecast = growth::hold(history, steps)?;
    Some((forecast, FillMethod::ConstantHold, fallbacks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::FitDiagnostics;

    fn job(name: &str, obs: &[(i32, f64)], strategy: StrategyKind) -> SeriesJob {
        SeriesJob {
            name: name.to_string(),
            series: Series::from_observations(obs.iter().copied()),
            strategy,
        }
    }

    fn extrapolation(outcome: &SeriesOutcome) -> &ExtrapolationRecord {
        outcome
            .log
            .entries()
            .iter()
            .find_map(|e| match e {
                LogEntry::Extrapolation(r) => Some(r),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn average_growth_compounds_to_horizon() {
        let window = YearWindow::new(2018, 2022).unwrap();
        let out = extend_series(
            job("gdp_usd_bn", &[(2018, 100.0), (2019, 110.0), (2020, 121.0)], StrategyKind::AverageGrowth),
            window,
            5,
        )
        .unwrap();
        assert!((out.series.get(2021).unwrap() - 133.1).abs() < 1e-9);
        assert!((out.series.get(2022).unwrap() - 146.41).abs() < 1e-9);
        let record = extrapolation(&out);
        assert_eq!(record.years_filled, vec![2021, 2022]);
        assert!(!record.used_fallback());
        assert_eq!(out.log.entries().len(), 1);
    }

    #[test]
    fn short_arima_history_falls_back_to_growth() {
        let window = YearWindow::new(2018, 2022).unwrap();
        let out = extend_series(
            job("gdp_usd_bn", &[(2018, 100.0), (2019, 110.0), (2020, 121.0)], StrategyKind::Arima),
            window,
            5,
        )
        .unwrap();
        let record = extrapolation(&out);
        assert_eq!(record.requested, StrategyKind::Arima);
        assert_eq!(record.applied, FillMethod::AverageGrowth);
        assert_eq!(record.fallbacks.len(), 1);
        assert_eq!(record.fallbacks[0].from, FillMethod::Arima);
        assert!((out.series.get(2022).unwrap() - 146.41).abs() < 1e-9);
        assert!(out.log.entries().iter().any(|e| matches!(
            e,
            LogEntry::Advisory(Advisory { kind: AdvisoryKind::FallbackUsed, .. })
        )));
    }

    #[test]
    fn single_observation_is_held_with_low_confidence() {
        let window = YearWindow::new(2000, 2003).unwrap();
        let out = extend_series(job("tfp", &[(2001, 0.8)], StrategyKind::AverageGrowth), window, 5).unwrap();
        assert_eq!(out.series.get(2003), Some(0.8));
        // Leading years are left for the assembler to report.
        assert_eq!(out.series.get(2000), None);
        let record = extrapolation(&out);
        assert!(record.low_confidence);
        assert_eq!(record.diagnostics, FitDiagnostics::ConstantHold { value: 0.8 });
        assert!(out.log.entries().iter().any(|e| matches!(
            e,
            LogEntry::Advisory(Advisory { kind: AdvisoryKind::LowConfidenceExtrapolation, .. })
        )));
    }

    #[test]
    fn interior_gaps_are_interpolated_and_recorded() {
        let window = YearWindow::new(2000, 2004).unwrap();
        let out = extend_series(
            job("hc", &[(2000, 2.0), (2002, 2.2), (2004, 2.4)], StrategyKind::LinearRegression),
            window,
            5,
        )
        .unwrap();
        assert!((out.series.get(2001).unwrap() - 2.1).abs() < 1e-12);
        assert!(matches!(
            &out.log.entries()[0],
            LogEntry::Interpolation(r) if r.years == vec![2001, 2003]
        ));
        assert_eq!(out.log.entries().len(), 1);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let window = YearWindow::new(2000, 2004).unwrap();
        let err = extend_series(job("pop", &[], StrategyKind::LinearRegression), window, 5).unwrap_err();
        assert!(matches!(err, PanelError::InsufficientData { series } if series == "pop"));
    }

    #[test]
    fn history_before_the_window_feeds_the_fit() {
        let window = YearWindow::new(2003, 2005).unwrap();
        let out = extend_series(
            job("gdp_usd_bn", &[(2000, 100.0), (2001, 110.0), (2002, 121.0)], StrategyKind::AverageGrowth),
            window,
            5,
        )
        .unwrap();
        assert!((out.series.get(2003).unwrap() - 133.1).abs() < 1e-9);
        assert!((out.series.get(2005).unwrap() - 161.051).abs() < 1e-9);
        assert_eq!(out.series.get(2000), Some(100.0));
        assert_eq!(extrapolation(&out).years_filled, vec![2003, 2004, 2005]);
    }

    #[test]
    fn arima_runs_on_long_history() {
        let window = YearWindow::new(2000, 2025).unwrap();
        let obs: Vec<_> = (2000..=2020).map(|y| (y, 100.0 + 3.0 * f64::from(y - 2000))).collect();
        let out = extend_series(job("gdp_usd_bn", &obs, StrategyKind::Arima), window, 5).unwrap();
        let record = extrapolation(&out);
        assert_eq!(record.applied, FillMethod::Arima);
        assert!((out.series.get(2025).unwrap() - 175.0).abs() < 1e-6);
    }
}
