//! Average historical growth rate, and the constant hold of last resort.

use crate::audit::FitDiagnostics;
use crate::error::StrategyError;
use crate::math::mean_growth_rate;
use crate::models::Forecast;

/// Compound the mean year-over-year growth rate forward from the last value.
pub fn forecast(history: &[f64], steps: usize) -> Result<Forecast, StrategyError> {
    let n = history.len();
    if n < 2 {
        return Err(StrategyError::TooFewObservations { needed: 2, got: n });
    }
    let (rate, ratios_used) = mean_growth_rate(history).ok_or(StrategyError::NoCandidate)?;

    let mut values = Vec::with_capacity(steps);
    let mut level = history[n - 1];
    for step in 1..=steps {
        level *= 1.0 + rate;
        if !level.is_finite() {
            return Err(StrategyError::NonFiniteForecast { step });
        }
        values.push(level);
    }

    Ok(Forecast {
        values,
        diagnostics: FitDiagnostics::AverageGrowth { rate, ratios_used },
    })
}

/// Repeat the last value. Needs a non-empty history.
pub fn hold(history: &[f64], steps: usize) -> Option<Forecast> {
    let value = *history.last()?;
    Some(Forecast {
        values: vec![value; steps],
        diagnostics: FitDiagnostics::ConstantHold { value },
    })
}
