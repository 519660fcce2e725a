//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline stays free of presentation concerns
//! and output changes are localized.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use crate::app::pipeline::PipelineOutput;
use crate::audit::{FitDiagnostics, Formula, TransformationLog};
use crate::domain::schema::{self, CANONICAL_SCHEMA, SeriesRole};
use crate::domain::{ResolvedConfig, StrategyKind, Year};

/// Series shown in the panel tail table.
const TAIL_COLUMNS: [&str; 6] = [
    schema::GDP,
    schema::CONSUMPTION,
    schema::INVESTMENT,
    schema::NET_EXPORTS,
    schema::CAPITAL_STOCK,
    schema::TFP,
];

/// Format the run summary: parameters, strategies applied, advisories, panel tail.
pub fn format_run_summary(
    output: &PipelineOutput,
    config: &ResolvedConfig,
    tail_years: usize,
    generated_at: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let panel = &output.panel;
    let log = &output.log;

    out.push_str("=== panel - macro panel run ===\n");
    out.push_str(&format!("Generated: {}\n", generated_at.to_rfc3339()));
    out.push_str(&format!(
        "Window: {}..={} ({} years, {} series)\n",
        panel.start_year(),
        panel.end_year(),
        panel.len_years(),
        panel.columns().len()
    ));

    let p = &config.params;
    out.push_str("\nParameters:\n");
    out.push_str(&format!(
        "  alpha={} delta={} s={} K/Y={} base_year={}\n",
        p.capital_share, p.depreciation_rate, p.saving_rate, p.capital_output_ratio, p.base_year
    ));
    for (name, value) in &p.elasticities {
        out.push_str(&format!("  {name}={value}\n"));
    }

    out.push_str(&format!(
        "\nLog: {} entries ({} derivations, {} interpolations, {} extrapolations)\n",
        log.len(),
        log.derivations().count(),
        log.interpolations().count(),
        log.extrapolations().count()
    ));

    out.push_str(&format_derivations(log));

    out.push_str("\nExtrapolation:\n");
    for r in log.extrapolations() {
        let marker = if r.used_fallback() { "!" } else { " " };
        out.push_str(&format!(
            "{marker} {:<24} {:<18} -> {:<18} last={} filled={} {}\n",
            r.series,
            r.requested.display_name(),
            r.applied.display_name(),
            r.last_observed_year,
            r.years_filled.len(),
            describe_diagnostics(&r.diagnostics)
        ));
        for f in &r.fallbacks {
            out.push_str(&format!("    fallback from {}: {}\n", f.from.display_name(), f.reason));
        }
    }

    if !output.advisories.is_empty() {
        out.push_str("\nAdvisories:\n");
        for a in &output.advisories {
            out.push_str(&format!("  [{:?}] {}: {}\n", a.kind, a.series, a.detail));
        }
    }

    out.push_str(&format_panel_tail(output, tail_years));
    out
}

/// One line per derived series and formula, with the formula text.
fn format_derivations(log: &TransformationLog) -> String {
    // (series, formula) -> (formula, records, first year, last year, edge policies)
    let mut groups: BTreeMap<(&str, &str), (Formula, usize, Year, Year, usize)> = BTreeMap::new();
    for r in log.derivations() {
        let entry = groups
            .entry((r.series.as_str(), r.formula.name()))
            .or_insert((r.formula, 0, r.year, r.year, 0));
        entry.1 += 1;
        entry.2 = entry.2.min(r.year);
        entry.3 = entry.3.max(r.year);
        entry.4 += usize::from(r.policy.is_some());
    }

    let mut out = String::from("\nDerivations:\n");
    for ((series, _), (formula, count, first, last, policies)) in groups {
        out.push_str(&format!(
            "  {series:<24} {first}..={last} n={count:<4} {}",
            formula.expression()
        ));
        if policies > 0 {
            out.push_str(&format!(" (edge policy x{policies})"));
        }
        out.push('\n');
    }
    out
}

fn format_panel_tail(output: &PipelineOutput, tail_years: usize) -> String {
    let panel = &output.panel;
    let mut out = String::new();
    let skip = panel.len_years().saturating_sub(tail_years);

    out.push_str("\nPanel (tail):\n");
    out.push_str(&format!("{:>6}", "year"));
    for name in TAIL_COLUMNS {
        out.push_str(&format!(" {:>22}", name));
    }
    out.push('\n');
    for year in panel.years().skip(skip) {
        out.push_str(&format!("{year:>6}"));
        for name in TAIL_COLUMNS {
            let cell = panel
                .value(name, year)
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(" {cell:>22}"));
        }
        out.push('\n');
    }
    out
}

fn describe_diagnostics(d: &FitDiagnostics) -> String {
    match d {
        FitDiagnostics::Arima {
            phi,
            theta,
            constant,
            css,
            ..
        } => format!("phi={phi:.3} theta={theta:.3} c={constant:.4} css={css:.4}"),
        FitDiagnostics::LinearRegression { slope, r_squared, .. } => {
            format!("slope={slope:.4} R2={r_squared:.4}")
        }
        FitDiagnostics::AverageGrowth { rate, ratios_used } => {
            format!("rate={:.3}% over {ratios_used} ratio(s)", rate * 100.0)
        }
        FitDiagnostics::ConstantHold { value } => format!("held at {value:.4}"),
    }
}

/// Canonical schema with roles and assigned strategies.
pub fn format_schema(config: &ResolvedConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24} {:<16} {:<18} {}\n", "series", "unit", "role", "strategy"));
    for c in CANONICAL_SCHEMA {
        let role = match c.role {
            SeriesRole::Raw { required: true } => "raw",
            SeriesRole::Raw { required: false } => "raw (optional)",
            SeriesRole::Anchored => "anchored",
            SeriesRole::Identity => "identity",
        };
        let strategy = config
            .strategy_for(c.name)
            .map(StrategyKind::display_name)
            .unwrap_or("closed by identity");
        out.push_str(&format!("{:<24} {:<16} {:<18} {}\n", c.name, c.unit, role, strategy));
    }

    out.push_str("\nSources (priority order):\n");
    for m in &config.mapping {
        out.push_str(&format!(
            "  {:<10} {:<18} -> {:<24} {}\n",
            m.source,
            m.column,
            m.canonical,
            m.conversion.describe()
        ));
    }
    out
}
