//! Closed-form derivation formulas.
//!
//! Every formula is a pure function of same-year values. Where a formula has a
//! degenerate input region, the policy is explicit: either a defined value
//! (tagged with an `EdgePolicy`) or an error. No formula returns NaN.

use crate::audit::EdgePolicy;

/// A derived value plus the edge-case policy that produced it, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub value: f64,
    pub policy: Option<EdgePolicy>,
}

impl Derived {
    fn plain(value: f64) -> Self {
        Self { value, policy: None }
    }
}

/// `NX = X - M`.
pub fn net_exports(exports: f64, imports: f64) -> f64 {
    exports - imports
}

/// Capital stock level in the base year: `K[b] = Y[b] * (K/Y)`.
pub fn base_capital(gdp_base: f64, capital_output_ratio: f64) -> f64 {
    gdp_base * capital_output_ratio
}

/// Rebase the capital index: `K[t] = rkna[t]/rkna[b] * K[b] * pl[t]/pl[b]`.
///
/// Callers guarantee `rkna_base` and `pl_base` are non-zero.
pub fn capital_stock(rkna: f64, rkna_base: f64, pl: f64, pl_base: f64, capital_base: f64) -> f64 {
    (rkna / rkna_base) * capital_base * (pl / pl_base)
}

/// Cobb-Douglas residual `TFP = Y / (K^α (L H)^(1-α))`.
///
/// - `Y = 0` with `K > 0` is defined as `TFP = 0` (`EdgePolicy::ZeroOutput`).
/// - `K = 0` with non-zero output cannot be attributed and is an error, as is
///   `K = Y = 0`, negative capital, or non-positive effective labour.
pub fn tfp(output: f64, capital: f64, labor: f64, human_capital: f64, alpha: f64) -> Result<Derived, String> {
    if capital < 0.0 {
        return Err(format!("negative capital stock {capital}"));
    }
    if output == 0.0 {
        if capital > 0.0 {
            return Ok(Derived {
                value: 0.0,
                policy: Some(EdgePolicy::ZeroOutput),
            });
        }
        return Err("zero output with zero capital is indeterminate".to_string());
    }
    if capital == 0.0 {
        return Err(format!("output {output} cannot be attributed to zero capital"));
    }
    let effective_labor = labor * human_capital;
    if effective_labor <= 0.0 {
        return Err(format!("effective labour L*H must be positive, got {effective_labor}"));
    }

    let value = output / (capital.powf(alpha) * effective_labor.powf(1.0 - alpha));
    if !value.is_finite() {
        return Err(format!("non-finite TFP from Y={output}, K={capital}, L*H={effective_labor}"));
    }
    Ok(Derived::plain(value))
}

/// `(X + M) / Y`; undefined for zero output.
pub fn openness(exports: f64, imports: f64, output: f64) -> Result<f64, String> {
    if output == 0.0 {
        return Err("openness ratio is undefined for zero output".to_string());
    }
    Ok((exports + imports) / output)
}

/// `C = (1 - s) Y - G`.
pub fn consumption(output: f64, government: f64, saving_rate: f64) -> f64 {
    (1.0 - saving_rate) * output - government
}

/// `I = s Y - NX`.
pub fn investment(output: f64, net_exports: f64, saving_rate: f64) -> f64 {
    saving_rate * output - net_exports
}

/// `S = Y - C - G`.
pub fn national_saving(output: f64, consumption: f64, government: f64) -> f64 {
    output - consumption - government
}

/// `Sp = Y - T - C`.
pub fn private_saving(output: f64, taxes: f64, consumption: f64) -> f64 {
    output - taxes - consumption
}

/// `Sg = T - G`.
pub fn public_saving(taxes: f64, government: f64) -> f64 {
    taxes - government
}

/// National saving net of depreciation: `S - δ K`.
pub fn net_saving(national_saving: f64, capital: f64, depreciation_rate: f64) -> f64 {
    national_saving - depreciation_rate * capital
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn zero_output_with_positive_capital_is_exactly_zero() {
        let d = tfp(0.0, 3_000.0, 780.0, 2.5, 0.3).unwrap();
        assert_eq!(d.value, 0.0);
        assert!(!d.value.is_nan());
        assert_eq!(d.policy, Some(EdgePolicy::ZeroOutput));
    }

    #[rstest]
    #[case(1_000.0, 0.0, 780.0, 2.5)] // positive output, zero capital
    #[case(0.0, 0.0, 780.0, 2.5)] // indeterminate
    #[case(1_000.0, -1.0, 780.0, 2.5)] // negative capital
    #[case(1_000.0, 3_000.0, 0.0, 2.5)] // no labour
    #[case(1_000.0, 3_000.0, 780.0, -1.0)] // negative human capital
    fn tfp_rejects_degenerate_inputs(#[case] y: f64, #[case] k: f64, #[case] l: f64, #[case] h: f64) {
        assert!(tfp(y, k, l, h, 0.3).is_err());
    }

    #[test]
    fn tfp_inverts_cobb_douglas() {
        let (a, k, l, h, alpha): (f64, f64, f64, f64, f64) = (1.7, 2_500.0, 700.0, 2.4, 0.35);
        let y = a * k.powf(alpha) * (l * h).powf(1.0 - alpha);
        let d = tfp(y, k, l, h, alpha).unwrap();
        assert!((d.value - a).abs() < 1e-12);
        assert_eq!(d.policy, None);
    }

    #[rstest]
    #[case(1.2, 1.0, 1.05, 1.0, 3_000.0, 3_780.0)]
    #[case(1.0, 1.0, 1.0, 1.0, 3_000.0, 3_000.0)]
    #[case(0.5, 2.0, 2.0, 1.0, 1_000.0, 500.0)]
    fn capital_stock_rebases_index(
        #[case] rkna: f64,
        #[case] rkna_b: f64,
        #[case] pl: f64,
        #[case] pl_b: f64,
        #[case] k_b: f64,
        #[case] expected: f64,
    ) {
        assert!((capital_stock(rkna, rkna_b, pl, pl_b, k_b) - expected).abs() < 1e-9);
    }

    #[test]
    fn openness_requires_output() {
        assert!((openness(300.0, 200.0, 1_000.0).unwrap() - 0.5).abs() < 1e-15);
        assert!(openness(300.0, 200.0, 0.0).is_err());
    }

    #[test]
    fn expenditure_components_add_up() {
        let (y, g, x, m, s) = (1_000.0, 150.0, 300.0, 260.0, 0.3);
        let nx = net_exports(x, m);
        let c = consumption(y, g, s);
        let i = investment(y, nx, s);
        assert!((y - (c + i + g + nx)).abs() < 1e-9);
        let sn = national_saving(y, c, g);
        assert!((sn - s * y).abs() < 1e-9);
        assert!((private_saving(y, 120.0, c) + public_saving(120.0, g) - sn).abs() < 1e-9);
        assert!((net_saving(sn, 3_000.0, 0.05) - (sn - 150.0)).abs() < 1e-9);
    }
}
