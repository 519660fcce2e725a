//! Small numeric helpers over annual series.

use crate::domain::{Series, Year};

/// Mean year-over-year growth rate of consecutive values.
///
/// Pairs whose ratio is not finite (e.g. a zero prior value) are skipped.
/// Returns `(rate, ratios_used)`, or `None` when no pair qualifies.
pub fn mean_growth_rate(values: &[f64]) -> Option<(f64, usize)> {
    let rates: Vec<f64> = values
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect();
    if rates.is_empty() {
        return None;
    }
    let n = rates.len();
    Some((rates.iter().sum::<f64>() / n as f64, n))
}

/// Fill missing years strictly between the first and last observation by
/// linear interpolation between the nearest observed neighbours.
///
/// Returns the years that were filled.
pub fn interpolate_interior(series: &mut Series) -> Vec<Year> {
    let obs = series.observations();
    let mut filled = Vec::new();
    for pair in obs.windows(2) {
        let (y0, v0) = pair[0];
        let (y1, v1) = pair[1];
        let span = f64::from(y1 - y0);
        for year in (y0 + 1)..y1 {
            let w = f64::from(year - y0) / span;
            series.set(year, v0 + w * (v1 - v0));
            filled.push(year);
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_rate_skips_zero_prior() {
        let (rate, n) = mean_growth_rate(&[0.0, 100.0, 110.0, 121.0]).unwrap();
        assert_eq!(n, 2);
        assert!((rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn growth_rate_needs_a_finite_pair() {
        assert!(mean_growth_rate(&[5.0]).is_none());
        assert!(mean_growth_rate(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn interpolates_only_interior_gaps() {
        let mut s = Series::from_observations([(2001, 10.0), (2004, 40.0), (2005, 41.0)]);
        let filled = interpolate_interior(&mut s);
        assert_eq!(filled, vec![2002, 2003]);
        assert!((s.get(2002).unwrap() - 20.0).abs() < 1e-12);
        assert!((s.get(2003).unwrap() - 30.0).abs() < 1e-12);
        assert_eq!(s.get(2000), None);
    }
}
