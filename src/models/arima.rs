//! ARIMA(1,1,1) by conditional sum of squares.
//!
//! On first differences `d_t = y_t - y_{t-1}` we fit
//!
//! ```text
//! d_t = c + φ d_{t-1} + ε_t + θ ε_{t-1}
//! ```
//!
//! conditioning on `ε_0 = 0`. For fixed `(φ, θ)` every residual is affine in
//! `c`:
//!
//! ```text
//! ε_t = a_t - c b_t
//! a_t = d_t - φ d_{t-1} - θ a_{t-1},   b_t = 1 - θ b_{t-1},   a_0 = b_0 = 0
//! ```
//!
//! so the optimal constant is `c* = Σ a b / Σ b²` in closed form. `(φ, θ)` are
//! searched on a coarse grid, then a fine grid around the coarse optimum.
//! Ties are broken by grid index, which keeps the fit deterministic even when
//! candidates are evaluated in parallel.
//!
//! Forecasts are produced one year at a time: after each step the forecast is
//! appended to the series and the model is refitted.

use rayon::prelude::*;

use crate::audit::FitDiagnostics;
use crate::error::StrategyError;
use crate::models::Forecast;
use crate::models::grid::{coarse_grid, fine_grid};

/// Forecasts further than this multiple of the largest historical magnitude
/// are treated as a diverged fit.
const DIVERGENCE_FACTOR: f64 = 1e3;

/// Fitted ARMA(1,1) on differences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmaFit {
    pub phi: f64,
    pub theta: f64,
    pub constant: f64,
    /// Conditional sum of squared residuals.
    pub css: f64,
    /// Residual of the last difference (feeds the MA term of the next step).
    pub last_residual: f64,
}

impl ArmaFit {
    /// One-step-ahead forecast of the next difference.
    pub fn next_difference(&self, last_difference: f64) -> f64 {
        self.constant + self.phi * last_difference + self.theta * self.last_residual
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    fit: ArmaFit,
}

/// Fit ARMA(1,1) with constant to a series of differences.
pub fn fit_differences(diffs: &[f64]) -> Result<ArmaFit, StrategyError> {
    if diffs.len() < 3 {
        return Err(StrategyError::TooFewObservations {
            needed: 3,
            got: diffs.len(),
        });
    }
    if diffs.iter().any(|d| !d.is_finite()) {
        return Err(StrategyError::NonFiniteHistory);
    }

    let coarse = best_candidate(diffs, &coarse_grid())?;
    let fine = best_candidate(diffs, &fine_grid(coarse.phi, coarse.theta))?;

    // The fine grid always revisits the coarse optimum, so it can only improve.
    Ok(if fine.css <= coarse.css { fine } else { coarse })
}

fn best_candidate(diffs: &[f64], grid: &[(f64, f64)]) -> Result<ArmaFit, StrategyError> {
    let candidates: Vec<Candidate> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &(phi, theta))| {
            evaluate(diffs, phi, theta).map(|fit| Candidate { idx, fit })
        })
        .collect();

    let Some(first) = candidates.first() else {
        return Err(StrategyError::NoCandidate);
    };

    // Deterministic selection: minimum CSS; ties go to the lower grid index.
    let mut best = first;
    for c in &candidates[1..] {
        if c.fit.css < best.fit.css || (c.fit.css == best.fit.css && c.idx < best.idx) {
            best = c;
        }
    }
    Ok(best.fit)
}

fn evaluate(diffs: &[f64], phi: f64, theta: f64) -> Option<ArmaFit> {
    let m = diffs.len();
    let mut a = vec![0.0; m];
    let mut b = vec![0.0; m];
    for t in 1..m {
        a[t] = diffs[t] - phi * diffs[t - 1] - theta * a[t - 1];
        b[t] = 1.0 - theta * b[t - 1];
    }

    let sab: f64 = a[1..].iter().zip(&b[1..]).map(|(x, y)| x * y).sum();
    let sbb: f64 = b[1..].iter().map(|y| y * y).sum();
    if !(sbb.is_finite() && sbb > 0.0) {
        return None;
    }
    let constant = sab / sbb;

    let css: f64 = a[1..]
        .iter()
        .zip(&b[1..])
        .map(|(x, y)| (x - constant * y).powi(2))
        .sum();
    let last_residual = a[m - 1] - constant * b[m - 1];

    (css.is_finite() && constant.is_finite() && last_residual.is_finite()).then_some(ArmaFit {
        phi,
        theta,
        constant,
        css,
        last_residual,
    })
}

/// Forecast `steps` future levels from `history` (contiguous annual levels).
pub fn forecast(history: &[f64], steps: usize, min_observations: usize) -> Result<Forecast, StrategyError> {
    if history.len() < min_observations {
        return Err(StrategyError::TooFewObservations {
            needed: min_observations,
            got: history.len(),
        });
    }
    if history.iter().any(|v| !v.is_finite()) {
        return Err(StrategyError::NonFiniteHistory);
    }

    let scale = history.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let mut levels = history.to_vec();
    let mut values = Vec::with_capacity(steps);
    let mut initial: Option<ArmaFit> = None;

    for step in 1..=steps {
        let diffs = differences(&levels);
        let fit = fit_differences(&diffs)?;
        initial.get_or_insert(fit);

        let last_level = levels[levels.len() - 1];
        let last_diff = diffs[diffs.len() - 1];
        let next = last_level + fit.next_difference(last_diff);

        if !next.is_finite() {
            return Err(StrategyError::NonFiniteForecast { step });
        }
        if next.abs() > DIVERGENCE_FACTOR * scale {
            return Err(StrategyError::Divergent { step });
        }

        levels.push(next);
        values.push(next);
    }

    let diagnostics = match initial {
        Some(fit) => FitDiagnostics::Arima {
            phi: fit.phi,
            theta: fit.theta,
            constant: fit.constant,
            css: fit.css,
            observations: history.len(),
            refits: steps,
        },
        // Nothing to forecast: report the fit on the history alone.
        None => {
            let fit = fit_differences(&differences(history))?;
            FitDiagnostics::Arima {
                phi: fit.phi,
                theta: fit.theta,
                constant: fit.constant,
                css: fit.css,
                observations: history.len(),
                refits: 0,
            }
        }
    };

    Ok(Forecast { values, diagnostics })
}

fn differences(levels: &[f64]) -> Vec<f64> {
    levels.windows(2).map(|w| w[1] - w[0]).collect()
}
