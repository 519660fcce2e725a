//! Seeded synthetic raw tables.
//!
//! Produces a raw table in the native units and column names of the built-in
//! source mapping, with the coverage problems real downloads have:
//!
//! - columns end in different years
//! - scattered interior gaps and stale cache cells
//! - labour force reported by two sources over different ranges
//!
//! Every column is observed in the first year and the base year, so a run over
//! `[start_year, horizon]` can always complete.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{RawTable, RawValue, Year};
use crate::error::PanelError;

/// Probability that an interior year of a column is missing.
const GAP_PROBABILITY: f64 = 0.08;
/// Probability that an interior year is delivered as a stale cell.
const STALE_PROBABILITY: f64 = 0.03;
/// Columns end up to this many years before `last_year`.
const MAX_END_LAG: i32 = 3;

/// Generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub seed: u64,
    pub start_year: Year,
    /// Latest year any column may reach.
    pub last_year: Year,
    /// Year in which `rkna` and `pl_gdpo` equal 1.
    pub base_year: Year,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_year: 2000,
            last_year: 2022,
            base_year: 2017,
        }
    }
}

/// Underlying "true" economy, one value per year from `start_year`.
struct Economy {
    gdp_usd: Vec<f64>,
    exports_usd: Vec<f64>,
    imports_usd: Vec<f64>,
    government_usd: Vec<f64>,
    tax_usd: Vec<f64>,
    population: Vec<f64>,
    labor: Vec<f64>,
    human_capital: Vec<f64>,
    rkna: Vec<f64>,
    pl_gdpo: Vec<f64>,
}

/// Generate a raw table for the built-in source mapping.
pub fn generate_raw_table(config: &SynthConfig) -> Result<RawTable, PanelError> {
    let SynthConfig {
        seed,
        start_year,
        last_year,
        base_year,
    } = *config;
    if start_year > last_year {
        return Err(PanelError::Config(format!(
            "synthetic start year {start_year} is after last year {last_year}"
        )));
    }
    if base_year < start_year || base_year > last_year {
        return Err(PanelError::Config(format!(
            "synthetic base year {base_year} is outside {start_year}..={last_year}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).map_err(|e| PanelError::Config(format!("noise distribution error: {e}")))?;
    let years = (last_year - start_year + 1) as usize;
    let economy = simulate(&mut rng, &noise, years, (base_year - start_year) as usize);

    let mut raw = RawTable::new();
    let columns: [(&str, &str, &[f64]); 10] = [
        ("worldbank", "NY.GDP.MKTP.CD", &economy.gdp_usd),
        ("worldbank", "NE.EXP.GNFS.CD", &economy.exports_usd),
        ("worldbank", "NE.IMP.GNFS.CD", &economy.imports_usd),
        ("worldbank", "NE.CON.GOVT.CD", &economy.government_usd),
        ("imf", "tax_revenue_usd", &economy.tax_usd),
        ("worldbank", "SP.POP.TOTL", &economy.population),
        ("worldbank", "SL.TLF.TOTL.IN", &economy.labor),
        ("pwt", "hc", &economy.human_capital),
        ("pwt", "rkna", &economy.rkna),
        ("pwt", "pl_gdpo", &economy.pl_gdpo),
    ];
    for (source, column, values) in columns {
        let end = (last_year - rng.gen_range(0..=MAX_END_LAG)).max(base_year);
        emit_column(&mut rng, &mut raw, source, column, start_year, end, base_year, values);
    }

    // Second labour source in millions, shorter and ending earlier: it only
    // matters where the first source has holes.
    let pwt_end = (last_year - MAX_END_LAG - 1).max(base_year);
    for year in start_year..=pwt_end {
        let idx = (year - start_year) as usize;
        raw.insert_fresh("pwt", "emp", year, economy.labor[idx] / 1e6 * 0.97);
    }

    Ok(raw)
}

fn simulate(rng: &mut StdRng, noise: &Normal<f64>, years: usize, base_idx: usize) -> Economy {
    let mut gdp = rng.gen_range(200.0..3_000.0) * 1e9;
    let trend = rng.gen_range(0.01..0.06);
    let export_share = rng.gen_range(0.15..0.45);
    let import_share = rng.gen_range(0.15..0.45);
    let government_share = rng.gen_range(0.10..0.25);
    let tax_share = rng.gen_range(0.12..0.35);
    let mut population = rng.gen_range(5.0..300.0) * 1e6;
    let pop_growth = rng.gen_range(0.0..0.02);
    let participation = rng.gen_range(0.40..0.55);
    let hc_start = rng.gen_range(1.5..3.0);
    let hc_slope = rng.gen_range(0.005..0.02);
    let capital_growth: f64 = trend + rng.gen_range(-0.005..0.01);
    let inflation: f64 = rng.gen_range(0.0..0.03);

    let mut economy = Economy {
        gdp_usd: Vec::with_capacity(years),
        exports_usd: Vec::with_capacity(years),
        imports_usd: Vec::with_capacity(years),
        government_usd: Vec::with_capacity(years),
        tax_usd: Vec::with_capacity(years),
        population: Vec::with_capacity(years),
        labor: Vec::with_capacity(years),
        human_capital: Vec::with_capacity(years),
        rkna: Vec::with_capacity(years),
        pl_gdpo: Vec::with_capacity(years),
    };

    for t in 0..years {
        if t > 0 {
            gdp *= 1.0 + trend + 0.015 * noise.sample(rng);
            population *= 1.0 + pop_growth;
        }
        let from_base = t as f64 - base_idx as f64;
        economy.gdp_usd.push(gdp);
        economy.exports_usd.push(gdp * jitter(export_share, noise, rng));
        economy.imports_usd.push(gdp * jitter(import_share, noise, rng));
        economy.government_usd.push(gdp * jitter(government_share, noise, rng));
        economy.tax_usd.push(gdp * jitter(tax_share, noise, rng));
        economy.population.push(population);
        economy.labor.push(population * participation);
        economy.human_capital.push(hc_start + hc_slope * t as f64);
        economy.rkna.push((1.0 + capital_growth).powf(from_base));
        economy.pl_gdpo.push((1.0 + inflation).powf(from_base));
    }
    economy
}

/// `base` with 3% multiplicative noise.
fn jitter(base: f64, noise: &Normal<f64>, rng: &mut StdRng) -> f64 {
    base * (1.0 + 0.03 * noise.sample(rng))
}

#[allow(clippy::too_many_arguments)]
fn emit_column(
    rng: &mut StdRng,
    raw: &mut RawTable,
    source: &str,
    column: &str,
    start: Year,
    end: Year,
    base_year: Year,
    values: &[f64],
) {
    for year in start..=end {
        let value = values[(year - start) as usize];
        let interior = year != start && year != end && year != base_year;
        if interior && rng.gen_bool(GAP_PROBABILITY) {
            continue;
        }
        if interior && rng.gen_bool(STALE_PROBABILITY) {
            raw.insert(source, column, year, RawValue::Stale(value * 10.0));
            continue;
        }
        raw.insert_fresh(source, column, year, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_table() {
        let config = SynthConfig::default();
        assert_eq!(generate_raw_table(&config).unwrap(), generate_raw_table(&config).unwrap());
        let other = SynthConfig {
            seed: 43,
            ..SynthConfig::default()
        };
        assert_ne!(generate_raw_table(&config).unwrap(), generate_raw_table(&other).unwrap());
    }

    #[test]
    fn first_and_base_years_are_always_fresh() {
        for seed in 0..20 {
            let raw = generate_raw_table(&SynthConfig {
                seed,
                ..SynthConfig::default()
            })
            .unwrap();
            for column in ["NY.GDP.MKTP.CD", "SL.TLF.TOTL.IN"] {
                let fresh: Vec<_> = raw.fresh_values("worldbank", column).map(|(y, _)| y).collect();
                assert!(fresh.contains(&2000));
                assert!(fresh.contains(&2017));
            }
            let rkna: Vec<_> = raw.fresh_values("pwt", "rkna").collect();
            assert!(rkna.iter().any(|&(y, v)| y == 2017 && (v - 1.0).abs() < 1e-12));
        }
    }

    #[test]
    fn rejects_base_year_outside_range() {
        let config = SynthConfig {
            base_year: 2030,
            ..SynthConfig::default()
        };
        assert!(matches!(generate_raw_table(&config), Err(PanelError::Config(_))));
    }
}
