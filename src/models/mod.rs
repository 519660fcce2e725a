//! Extrapolation strategies.
//!
//! Each strategy is a small, pure function over a contiguous annual history so
//! that the engine's fallback logic can stay generic:
//!
//! ```text
//! forecast(history, steps) -> Result<Forecast, StrategyError>
//! ```

pub mod arima;
pub mod grid;
pub mod growth;
pub mod linear;

use crate::audit::FitDiagnostics;
use crate::domain::StrategyKind;
use crate::error::StrategyError;

/// Forecast output: one value per future year, plus fit diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub values: Vec<f64>,
    pub diagnostics: FitDiagnostics,
}

/// Run a single strategy (no fallback).
pub fn run_strategy(
    kind: StrategyKind,
    history: &[f64],
    steps: usize,
    arima_min_observations: usize,
) -> Result<Forecast, StrategyError> {
    match kind {
        StrategyKind::Arima => arima::forecast(history, steps, arima_min_observations),
        StrategyKind::LinearRegression => linear::forecast(history, steps),
        StrategyKind::AverageGrowth => growth::forecast(history, steps),
    }
}
