//! Parameter grids for the ARMA coefficient search.
//!
//! `φ` and `θ` are searched on a deterministic grid rather than with an
//! iterative optimizer:
//! - no starting values, no local-minimum traps on short histories
//! - identical inputs always give identical fits

/// Largest `|φ|` / `|θ|` searched. Keeps the model stationary and invertible.
pub const COEF_BOUND: f64 = 0.95;

/// Coarse grid resolution per dimension (0.05 spacing over `[-0.95, 0.95]`).
pub const COARSE_STEPS: usize = 39;

/// Half-width of the refinement window around the coarse optimum.
pub const FINE_HALF_WIDTH: f64 = 0.05;

/// Fine grid resolution per dimension.
pub const FINE_STEPS: usize = 11;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
///
/// Returns `[min]` when `steps < 2` or the range is empty.
pub fn lin_space(min: f64, max: f64, steps: usize) -> Vec<f64> {
    if steps < 2 || max <= min {
        return vec![min];
    }
    let step = (max - min) / (steps as f64 - 1.0);
    (0..steps).map(|i| min + step * i as f64).collect()
}

/// Cartesian product `[(φ, θ)]` of two axes, row-major.
pub fn pair_grid(phis: &[f64], thetas: &[f64]) -> Vec<(f64, f64)> {
    phis.iter()
        .flat_map(|&p| thetas.iter().map(move |&t| (p, t)))
        .collect()
}

/// Coarse `(φ, θ)` grid over the full admissible square.
pub fn coarse_grid() -> Vec<(f64, f64)> {
    let axis = lin_space(-COEF_BOUND, COEF_BOUND, COARSE_STEPS);
    pair_grid(&axis, &axis)
}

/// Fine grid centred on `(phi, theta)`, clipped to the admissible square.
pub fn fine_grid(phi: f64, theta: f64) -> Vec<(f64, f64)> {
    let axis = |c: f64| {
        lin_space(
            (c - FINE_HALF_WIDTH).max(-COEF_BOUND),
            (c + FINE_HALF_WIDTH).min(COEF_BOUND),
            FINE_STEPS,
        )
    };
    pair_grid(&axis(phi), &axis(theta))
}
