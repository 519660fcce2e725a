//! Linear trend against the year index.
//!
//! Meant for slowly varying, roughly linear series (population, human capital).

use crate::audit::FitDiagnostics;
use crate::error::StrategyError;
use crate::math::fit_line;
use crate::models::Forecast;

/// Fit `value = intercept + slope * (year - first_year)` and extend it.
pub fn forecast(history: &[f64], steps: usize) -> Result<Forecast, StrategyError> {
    let n = history.len();
    if n < 2 {
        return Err(StrategyError::TooFewObservations { needed: 2, got: n });
    }
    if history.iter().any(|v| !v.is_finite()) {
        return Err(StrategyError::NonFiniteHistory);
    }

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let fit = fit_line(&xs, history).ok_or(StrategyError::Solver)?;

    let mut values = Vec::with_capacity(steps);
    for step in 1..=steps {
        let v = fit.predict((n - 1 + step) as f64);
        if !v.is_finite() {
            return Err(StrategyError::NonFiniteForecast { step });
        }
        values.push(v);
    }

    Ok(Forecast {
        values,
        diagnostics: FitDiagnostics::LinearRegression {
            intercept: fit.intercept,
            slope: fit.slope,
            r_squared: fit.r_squared,
            observations: n,
        },
    })
}
