//! Derived-variable calculator.
//!
//! Two entry points, run at different points of the pipeline:
//!
//! - `derive_history`: after normalization. Computes the anchored series
//!   (capital stock, TFP) and every identity series on the years where their
//!   inputs are observed.
//! - `fill_anchored_gaps`: after the raw series are interpolated. Recomputes
//!   the anchored series on their interior gap years from the filled inputs.
//! - `close_identities`: after extrapolation. Fills the identity series on the
//!   remaining years from the extrapolated inputs, then verifies the
//!   expenditure identity `Y = C + I + G + NX` on every year.
//!
//! Every value written appends a `DerivationRecord`. Errors are collected for
//! the whole stage and returned together; they are never auto-recovered.

pub mod formulas;

use tracing::{debug, info};

use crate::audit::{DerivationRecord, Formula, LogEntry, NamedInput, TransformationLog};
use crate::domain::schema::*;
use crate::domain::{ParameterSet, Year};
use crate::error::PanelError;
use crate::panel::PartialPanel;

use formulas::Derived;

/// Derive anchored and identity series on observed years.
pub fn derive_history(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
) -> Result<(), PanelError> {
    let mut errors = Vec::new();

    derive_capital_stock(panel, params, log, &mut errors);
    derive_tfp(panel, params, log, &mut errors);
    derive_identities(panel, params, log, &mut errors);

    if !errors.is_empty() {
        return Err(PanelError::collect(errors));
    }
    info!(records = log.derivations().count(), "derived historical variables");
    Ok(())
}

/// Recompute capital stock and TFP on the interior gap years of their own
/// history, once every input series is interpolated.
///
/// Years after the last derived value are left to the extrapolation engine.
pub fn fill_anchored_gaps(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
) -> Result<(), PanelError> {
    let before = log.derivations().count();
    let mut errors = Vec::new();

    let years = interior_gaps(panel, CAPITAL_STOCK);
    if !years.is_empty() {
        capital_stock_on(panel, params, log, &mut errors, &years);
    }
    let years = interior_gaps(panel, TFP);
    tfp_on(panel, params, log, &mut errors, &years);

    if !errors.is_empty() {
        return Err(PanelError::collect(errors));
    }
    let filled = log.derivations().count() - before;
    if filled > 0 {
        info!(records = filled, "derived anchored series on interpolated years");
    }
    Ok(())
}

/// Missing years between the first and last value of `series`.
fn interior_gaps(panel: &PartialPanel, series: &str) -> Vec<Year> {
    let Some(s) = panel.get(series) else {
        return Vec::new();
    };
    match (s.first_observed(), s.last_observed()) {
        (Some(first), Some(last)) => (first..=last).filter(|&y| s.get(y).is_none()).collect(),
        _ => Vec::new(),
    }
}

/// Fill identity series on every remaining year and verify the expenditure
/// identity within `tolerance` (relative to output).
pub fn close_identities(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    tolerance: f64,
    log: &mut TransformationLog,
) -> Result<(), PanelError> {
    let before = log.derivations().count();
    let mut errors = Vec::new();

    derive_identities(panel, params, log, &mut errors);
    if errors.is_empty() {
        check_expenditure_identity(panel, tolerance, &mut errors);
    }

    if !errors.is_empty() {
        return Err(PanelError::collect(errors));
    }
    info!(
        records = log.derivations().count() - before,
        "closed identities over forecast years"
    );
    Ok(())
}

fn derive_capital_stock(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
) {
    let years: Vec<Year> = panel.span().years().collect();
    capital_stock_on(panel, params, log, errors, &years);
}

fn capital_stock_on(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
    years: &[Year],
) {
    let formula = Formula::CapitalStockRebase;
    let base = params.base_year;

    let rkna_base = base_value(panel, RKNA, base, formula, errors);
    let pl_base = base_value(panel, PL_GDPO, base, formula, errors);
    let gdp_base = panel.value(GDP, base);
    if gdp_base.is_none() {
        errors.push(PanelError::derivation(
            formula.name(),
            base,
            format!("{GDP}[base] is missing, so K[base] is undefined"),
        ));
    }
    let (Some(rkna_base), Some(pl_base), Some(gdp_base)) = (rkna_base, pl_base, gdp_base) else {
        return;
    };

    let capital_base = formulas::base_capital(gdp_base, params.capital_output_ratio);
    for &year in years {
        let (Some(rkna), Some(pl)) = (panel.value(RKNA, year), panel.value(PL_GDPO, year)) else {
            continue;
        };
        let value = formulas::capital_stock(rkna, rkna_base, pl, pl_base, capital_base);
        let inputs = vec![
            NamedInput::new(RKNA, rkna),
            NamedInput::new("rkna[base]", rkna_base),
            NamedInput::new(PL_GDPO, pl),
            NamedInput::new("pl_gdpo[base]", pl_base),
            NamedInput::new("gdp_usd_bn[base]", gdp_base),
            NamedInput::new("capital_output_ratio", params.capital_output_ratio),
        ];
        store(panel, log, errors, CAPITAL_STOCK, year, formula, inputs, ok(value));
    }
}

/// Base-year value that must exist and be non-zero (it is a divisor).
fn base_value(
    panel: &PartialPanel,
    series: &str,
    base: Year,
    formula: Formula,
    errors: &mut Vec<PanelError>,
) -> Option<f64> {
    match panel.value(series, base) {
        None => {
            errors.push(PanelError::derivation(
                formula.name(),
                base,
                format!("{series}[base] is missing"),
            ));
            None
        }
        Some(v) if v == 0.0 => {
            errors.push(PanelError::derivation(
                formula.name(),
                base,
                format!("{series}[base] is zero"),
            ));
            None
        }
        Some(v) => Some(v),
    }
}

fn derive_tfp(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
) {
    let years: Vec<Year> = panel.span().years().collect();
    tfp_on(panel, params, log, errors, &years);
}

fn tfp_on(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
    years: &[Year],
) {
    let alpha = params.capital_share;
    for &year in years {
        let Some([y, k, l, h]) = values(panel, year, [GDP, CAPITAL_STOCK, LABOR_FORCE, HUMAN_CAPITAL]) else {
            continue;
        };
        let inputs = vec![
            NamedInput::new(GDP, y),
            NamedInput::new(CAPITAL_STOCK, k),
            NamedInput::new(LABOR_FORCE, l),
            NamedInput::new(HUMAN_CAPITAL, h),
            NamedInput::new("capital_share", alpha),
        ];
        let result = formulas::tfp(y, k, l, h, alpha);
        store(panel, log, errors, TFP, year, Formula::CobbDouglasResidual, inputs, result);
    }
}

/// Identity series, in dependency order.
fn derive_identities(
    panel: &mut PartialPanel,
    params: &ParameterSet,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
) {
    let s = params.saving_rate;
    let delta = params.depreciation_rate;
    let years: Vec<Year> = panel.span().years().collect();

    for &year in &years {
        if panel.value(NET_EXPORTS, year).is_some() {
            continue;
        }
        if let Some([x, m]) = values(panel, year, [EXPORTS, IMPORTS]) {
            let inputs = vec![NamedInput::new(EXPORTS, x), NamedInput::new(IMPORTS, m)];
            let value = formulas::net_exports(x, m);
            store(panel, log, errors, NET_EXPORTS, year, Formula::NetExports, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(OPENNESS, year).is_some() {
            continue;
        }
        if let Some([x, m, y]) = values(panel, year, [EXPORTS, IMPORTS, GDP]) {
            let inputs = vec![
                NamedInput::new(EXPORTS, x),
                NamedInput::new(IMPORTS, m),
                NamedInput::new(GDP, y),
            ];
            let result = formulas::openness(x, m, y).map(|value| Derived { value, policy: None });
            store(panel, log, errors, OPENNESS, year, Formula::Openness, inputs, result);
        }
    }

    for &year in &years {
        if panel.value(CONSUMPTION, year).is_some() {
            continue;
        }
        if let Some([y, g]) = values(panel, year, [GDP, GOVERNMENT]) {
            let inputs = vec![
                NamedInput::new(GDP, y),
                NamedInput::new(GOVERNMENT, g),
                NamedInput::new("saving_rate", s),
            ];
            let value = formulas::consumption(y, g, s);
            store(panel, log, errors, CONSUMPTION, year, Formula::Consumption, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(INVESTMENT, year).is_some() {
            continue;
        }
        if let Some([y, nx]) = values(panel, year, [GDP, NET_EXPORTS]) {
            let inputs = vec![
                NamedInput::new(GDP, y),
                NamedInput::new(NET_EXPORTS, nx),
                NamedInput::new("saving_rate", s),
            ];
            let value = formulas::investment(y, nx, s);
            store(panel, log, errors, INVESTMENT, year, Formula::Investment, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(NATIONAL_SAVING, year).is_some() {
            continue;
        }
        if let Some([y, c, g]) = values(panel, year, [GDP, CONSUMPTION, GOVERNMENT]) {
            let inputs = vec![
                NamedInput::new(GDP, y),
                NamedInput::new(CONSUMPTION, c),
                NamedInput::new(GOVERNMENT, g),
            ];
            let value = formulas::national_saving(y, c, g);
            store(panel, log, errors, NATIONAL_SAVING, year, Formula::NationalSaving, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(PRIVATE_SAVING, year).is_some() {
            continue;
        }
        if let Some([y, t, c]) = values(panel, year, [GDP, TAX_REVENUE, CONSUMPTION]) {
            let inputs = vec![
                NamedInput::new(GDP, y),
                NamedInput::new(TAX_REVENUE, t),
                NamedInput::new(CONSUMPTION, c),
            ];
            let value = formulas::private_saving(y, t, c);
            store(panel, log, errors, PRIVATE_SAVING, year, Formula::PrivateSaving, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(PUBLIC_SAVING, year).is_some() {
            continue;
        }
        if let Some([t, g]) = values(panel, year, [TAX_REVENUE, GOVERNMENT]) {
            let inputs = vec![NamedInput::new(TAX_REVENUE, t), NamedInput::new(GOVERNMENT, g)];
            let value = formulas::public_saving(t, g);
            store(panel, log, errors, PUBLIC_SAVING, year, Formula::PublicSaving, inputs, ok(value));
        }
    }

    for &year in &years {
        if panel.value(NET_SAVING, year).is_some() {
            continue;
        }
        if let Some([sn, k]) = values(panel, year, [NATIONAL_SAVING, CAPITAL_STOCK]) {
            let inputs = vec![
                NamedInput::new(NATIONAL_SAVING, sn),
                NamedInput::new(CAPITAL_STOCK, k),
                NamedInput::new("depreciation_rate", delta),
            ];
            let value = formulas::net_saving(sn, k, delta);
            store(panel, log, errors, NET_SAVING, year, Formula::NetSaving, inputs, ok(value));
        }
    }
}

fn check_expenditure_identity(panel: &PartialPanel, tolerance: f64, errors: &mut Vec<PanelError>) {
    for year in panel.span().years() {
        let Some([y, c, i, g, nx]) = values(panel, year, [GDP, CONSUMPTION, INVESTMENT, GOVERNMENT, NET_EXPORTS])
        else {
            continue;
        };
        let gap = (y - (c + i + g + nx)).abs();
        // Scale by output; fall back to the component scale when output is zero.
        let scale = if y != 0.0 {
            y.abs()
        } else {
            [c, i, g, nx].iter().fold(0.0_f64, |m, v| m.max(v.abs()))
        };
        if gap > tolerance * scale {
            errors.push(PanelError::derivation(
                Formula::ExpenditureIdentity.name(),
                year,
                format!("|Y - (C + I + G + NX)| = {gap:e} exceeds {tolerance:e} x {scale}"),
            ));
        }
    }
}

/// Values of several series at one year, if all are present.
fn values<const N: usize>(panel: &PartialPanel, year: Year, names: [&str; N]) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, name) in out.iter_mut().zip(names) {
        *slot = panel.value(name, year)?;
    }
    Some(out)
}

fn ok(value: f64) -> Result<Derived, String> {
    Ok(Derived { value, policy: None })
}

#[allow(clippy::too_many_arguments)]
fn store(
    panel: &mut PartialPanel,
    log: &mut TransformationLog,
    errors: &mut Vec<PanelError>,
    series: &str,
    year: Year,
    formula: Formula,
    inputs: Vec<NamedInput>,
    result: Result<Derived, String>,
) {
    let derived = match result {
        Ok(d) if d.value.is_finite() => d,
        Ok(d) => {
            errors.push(PanelError::derivation(
                formula.name(),
                year,
                format!("non-finite result {}", d.value),
            ));
            return;
        }
        Err(reason) => {
            errors.push(PanelError::derivation(formula.name(), year, reason));
            return;
        }
    };

    if derived.policy.is_some() {
        debug!(series, year, policy = ?derived.policy, "edge-case policy applied");
    }
    panel.set(series, year, derived.value);
    log.append(LogEntry::Derivation(DerivationRecord {
        series: series.to_string(),
        year,
        formula,
        inputs,
        value: derived.value,
        policy: derived.policy,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Series, YearWindow};
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn panel_with(window: YearWindow, series: &[(&str, &[(Year, f64)])]) -> PartialPanel {
        let mut panel = PartialPanel::new(window);
        for (name, obs) in series {
            panel.insert(name, Series::from_observations(obs.iter().copied()));
        }
        panel
    }

    #[test]
    fn capital_stock_rebases_from_base_year() {
        let window = YearWindow::new(2017, 2020).unwrap();
        let mut panel = panel_with(
            window,
            &[
                (RKNA, &[(2017, 1.0), (2020, 1.2)]),
                (PL_GDPO, &[(2017, 1.0), (2020, 1.05)]),
                (GDP, &[(2017, 1_000.0)]),
            ],
        );
        let mut log = TransformationLog::new();
        let mut errors = Vec::new();
        derive_capital_stock(&mut panel, &ParameterSet::default(), &mut log, &mut errors);

        assert!(errors.is_empty());
        assert!((panel.value(CAPITAL_STOCK, 2017).unwrap() - 3_000.0).abs() < 1e-9);
        assert!((panel.value(CAPITAL_STOCK, 2020).unwrap() - 3_780.0).abs() < 1e-9);
        assert_eq!(panel.value(CAPITAL_STOCK, 2018), None);
        let record = log.derivations().find(|r| r.year == 2020).unwrap();
        assert_eq!(record.formula, Formula::CapitalStockRebase);
        assert_eq!(record.inputs.len(), 6);
    }

    #[test]
    fn zero_or_missing_base_values_fail() {
        let window = YearWindow::new(2017, 2020).unwrap();
        let mut panel = panel_with(
            window,
            &[(RKNA, &[(2017, 0.0), (2020, 1.2)]), (PL_GDPO, &[(2020, 1.05)])],
        );
        let mut log = TransformationLog::new();
        let mut errors = Vec::new();
        derive_capital_stock(&mut panel, &ParameterSet::default(), &mut log, &mut errors);

        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, PanelError::Derivation { year: 2017, .. })));
        assert!(panel.get(CAPITAL_STOCK).is_none());
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn tfp_zero_output_and_zero_capital_cases() {
        let window = YearWindow::new(2000, 2001).unwrap();
        let mut panel = panel_with(
            window,
            &[
                (GDP, &[(2000, 0.0), (2001, 500.0)]),
                (CAPITAL_STOCK, &[(2000, 1_000.0), (2001, 0.0)]),
                (LABOR_FORCE, &[(2000, 10.0), (2001, 10.0)]),
                (HUMAN_CAPITAL, &[(2000, 2.0), (2001, 2.0)]),
            ],
        );
        let mut log = TransformationLog::new();
        let mut errors = Vec::new();
        derive_tfp(&mut panel, &ParameterSet::default(), &mut log, &mut errors);

        assert_eq!(panel.value(TFP, 2000), Some(0.0));
        assert_eq!(panel.value(TFP, 2001), None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], PanelError::Derivation { year: 2001, formula, .. } if formula == "cobb_douglas_residual"));
        assert_eq!(
            log.derivations().next().unwrap().policy,
            Some(crate::audit::EdgePolicy::ZeroOutput)
        );
    }

    #[test]
    fn openness_with_zero_output_fails_the_stage() {
        let window = YearWindow::new(2000, 2000).unwrap();
        let mut panel = panel_with(
            window,
            &[(GDP, &[(2000, 0.0)]), (EXPORTS, &[(2000, 1.0)]), (IMPORTS, &[(2000, 1.0)])],
        );
        let mut log = TransformationLog::new();
        let mut errors = Vec::new();
        derive_identities(&mut panel, &ParameterSet::default(), &mut log, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("openness"));
        assert_eq!(panel.value(NET_EXPORTS, 2000), Some(0.0));
    }

    /// Random expenditure accounts; the identity must hold for every draw.
    #[test]
    fn expenditure_identity_holds_for_random_accounts() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let window = YearWindow::new(2000, 2009).unwrap();
            let mut panel = PartialPanel::new(window);
            for year in window.years() {
                let y = rng.gen_range(1.0..20_000.0);
                panel.set(GDP, year, y);
                panel.set(GOVERNMENT, year, y * rng.gen_range(0.05..0.3));
                panel.set(TAX_REVENUE, year, y * rng.gen_range(0.05..0.35));
                panel.set(EXPORTS, year, y * rng.gen_range(0.0..0.6));
                panel.set(IMPORTS, year, y * rng.gen_range(0.0..0.6));
                panel.set(CAPITAL_STOCK, year, y * rng.gen_range(1.0..4.0));
            }
            let params = ParameterSet {
                saving_rate: rng.gen_range(0.0..0.6),
                ..ParameterSet::default()
            };
            let mut log = TransformationLog::new();
            close_identities(&mut panel, &params, 1e-6, &mut log).unwrap();

            for year in window.years() {
                let y = panel.value(GDP, year).unwrap();
                let sum = panel.value(CONSUMPTION, year).unwrap()
                    + panel.value(INVESTMENT, year).unwrap()
                    + panel.value(GOVERNMENT, year).unwrap()
                    + panel.value(NET_EXPORTS, year).unwrap();
                assert!((y - sum).abs() <= 1e-6 * y);
            }
        }
    }

    #[test]
    fn anchored_gaps_are_derived_from_interpolated_inputs() {
        let window = YearWindow::new(2016, 2018).unwrap();
        let mut panel = panel_with(
            window,
            &[
                (RKNA, &[(2016, 0.9), (2017, 1.0), (2018, 1.1)]),
                (PL_GDPO, &[(2016, 1.0), (2017, 1.0), (2018, 1.0)]),
                (GDP, &[(2016, 900.0), (2017, 1_000.0), (2018, 1_100.0)]),
                (LABOR_FORCE, &[(2016, 10.0), (2017, 10.0), (2018, 10.0)]),
                (HUMAN_CAPITAL, &[(2016, 2.0), (2018, 2.2)]),
            ],
        );
        let params = ParameterSet::default();
        let mut log = TransformationLog::new();
        derive_history(&mut panel, &params, &mut log).unwrap();
        assert_eq!(panel.value(TFP, 2017), None);

        // Interpolated human capital, as the engine leaves it.
        panel.set(HUMAN_CAPITAL, 2017, 2.1);
        fill_anchored_gaps(&mut panel, &params, &mut log).unwrap();

        let (y, k, lh) = (1_000.0_f64, 3_000.0_f64, 21.0_f64);
        let expected = y / (k.powf(0.3) * lh.powf(0.7));
        assert!((panel.value(TFP, 2017).unwrap() - expected).abs() < 1e-9);
        let record = log.derivations().find(|r| r.series == TFP && r.year == 2017).unwrap();
        assert_eq!(record.formula, Formula::CobbDouglasResidual);
        assert_eq!(log.derivations().filter(|r| r.series == CAPITAL_STOCK).count(), 3);
    }

    #[test]
    fn closure_only_fills_missing_years() {
        let window = YearWindow::new(2000, 2001).unwrap();
        let mut panel = panel_with(
            window,
            &[
                (EXPORTS, &[(2000, 5.0), (2001, 6.0)]),
                (IMPORTS, &[(2000, 4.0), (2001, 4.0)]),
                (NET_EXPORTS, &[(2000, 1.0)]),
            ],
        );
        let mut log = TransformationLog::new();
        close_identities(&mut panel, &ParameterSet::default(), 1e-6, &mut log).unwrap();
        assert_eq!(panel.value(NET_EXPORTS, 2001), Some(2.0));
        assert_eq!(log.derivations().filter(|r| r.series == NET_EXPORTS).count(), 1);
    }
}
