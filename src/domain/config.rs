//! Run configuration.
//!
//! `RunConfig` is what users write (JSON) or what the CLI builds. It is
//! resolved exactly once into a `ResolvedConfig`, which every stage receives by
//! reference and never mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::schema::{self, ColumnMapping, SeriesRole};
use crate::domain::{StrategyKind, UnitConversion, Year, YearWindow};
use crate::error::PanelError;

/// Lowest ARIMA observation threshold we accept in configuration.
const ARIMA_MIN_OBSERVATIONS_FLOOR: usize = 4;

/// Named scalar constants of the growth model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    /// Capital share `α` in the Cobb-Douglas production function.
    pub capital_share: f64,
    /// Depreciation rate `δ`.
    pub depreciation_rate: f64,
    /// Gross saving rate `s`.
    pub saving_rate: f64,
    /// `K / Y` in the base year, used to anchor the capital stock level.
    pub capital_output_ratio: f64,
    /// Base year of the capital stock rebasing.
    pub base_year: Year,
    /// Extra named scalars (trade elasticities etc.), carried for the report.
    pub elasticities: BTreeMap<String, f64>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        let mut elasticities = BTreeMap::new();
        elasticities.insert("export_price_elasticity".to_string(), 1.5);
        elasticities.insert("import_income_elasticity".to_string(), 1.0);
        Self {
            capital_share: 0.3,
            depreciation_rate: 0.05,
            saving_rate: 0.3,
            capital_output_ratio: 3.0,
            base_year: 2017,
            elasticities,
        }
    }
}

impl ParameterSet {
    pub fn validate(&self) -> Result<(), PanelError> {
        let mut problems = Vec::new();
        if !(self.capital_share.is_finite() && self.capital_share > 0.0 && self.capital_share < 1.0) {
            problems.push(format!("capital_share must be in (0, 1), got {}", self.capital_share));
        }
        if !(self.depreciation_rate.is_finite() && (0.0..=1.0).contains(&self.depreciation_rate)) {
            problems.push(format!(
                "depreciation_rate must be in [0, 1], got {}",
                self.depreciation_rate
            ));
        }
        if !(self.saving_rate.is_finite() && (0.0..=1.0).contains(&self.saving_rate)) {
            problems.push(format!("saving_rate must be in [0, 1], got {}", self.saving_rate));
        }
        if !(self.capital_output_ratio.is_finite() && self.capital_output_ratio > 0.0) {
            problems.push(format!(
                "capital_output_ratio must be > 0, got {}",
                self.capital_output_ratio
            ));
        }
        for (name, value) in &self.elasticities {
            if !value.is_finite() {
                problems.push(format!("elasticity `{name}` is not finite"));
            }
        }
        config_result(problems)
    }
}

/// User-facing run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub start_year: Year,
    /// Horizon year: the last year the panel must cover.
    pub end_year: Year,
    pub parameters: ParameterSet,
    /// Series name -> extrapolation strategy.
    pub strategies: BTreeMap<String, StrategyKind>,
    /// Raw column -> canonical series mapping.
    pub mapping: Vec<ColumnMapping>,
    /// Minimum history length before ARIMA is attempted.
    pub arima_min_observations: usize,
    /// Relative tolerance of the expenditure identity check.
    pub identity_tolerance: f64,
    /// Fan out per-series extrapolation across threads.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_year: 2000,
            end_year: 2050,
            parameters: ParameterSet::default(),
            strategies: schema::default_strategies(),
            mapping: schema::default_mapping(),
            arima_min_observations: 5,
            identity_tolerance: 1e-6,
            parallel: false,
        }
    }
}

impl RunConfig {
    /// Default configuration over `[start_year, end_year]`.
    pub fn with_window(start_year: Year, end_year: Year) -> Self {
        Self {
            start_year,
            end_year,
            ..Self::default()
        }
    }

    /// Validate everything once and freeze the result.
    pub fn resolve(&self) -> Result<ResolvedConfig, PanelError> {
        let window = YearWindow::new(self.start_year, self.end_year)?;
        self.parameters.validate()?;

        let mut problems = Vec::new();

        let mut strategies = BTreeMap::new();
        for (name, kind) in &self.strategies {
            match schema::canonical(name) {
                None => problems.push(format!("strategy assigned to unknown series `{name}`")),
                Some(c) if !c.role.is_extrapolated() => problems.push(format!(
                    "series `{name}` is derived by identity and cannot take a strategy"
                )),
                Some(c) => {
                    strategies.insert(c.name, *kind);
                }
            }
        }
        for c in schema::extrapolated_series() {
            if !strategies.contains_key(c.name) {
                problems.push(format!("no extrapolation strategy assigned to `{}`", c.name));
            }
        }

        for m in &self.mapping {
            match schema::canonical(&m.canonical) {
                Some(c) if matches!(c.role, SeriesRole::Raw { .. }) => {}
                Some(_) => problems.push(format!(
                    "mapping {}/{} targets derived series `{}`",
                    m.source, m.column, m.canonical
                )),
                None => problems.push(format!(
                    "mapping {}/{} targets unknown series `{}`",
                    m.source, m.column, m.canonical
                )),
            }
            if let UnitConversion::Scale(factor) = m.conversion {
                if !(factor.is_finite() && factor != 0.0) {
                    problems.push(format!(
                        "mapping {}/{} has invalid scale factor {factor}",
                        m.source, m.column
                    ));
                }
            }
        }

        if self.arima_min_observations < ARIMA_MIN_OBSERVATIONS_FLOOR {
            problems.push(format!(
                "arima_min_observations must be >= {ARIMA_MIN_OBSERVATIONS_FLOOR}, got {}",
                self.arima_min_observations
            ));
        }
        if !(self.identity_tolerance.is_finite() && self.identity_tolerance > 0.0) {
            problems.push(format!(
                "identity_tolerance must be > 0, got {}",
                self.identity_tolerance
            ));
        }

        config_result(problems)?;

        Ok(ResolvedConfig {
            window,
            params: self.parameters.clone(),
            strategies,
            mapping: self.mapping.clone(),
            arima_min_observations: self.arima_min_observations,
            identity_tolerance: self.identity_tolerance,
            parallel: self.parallel,
        })
    }
}

/// Validated, immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub window: YearWindow,
    pub params: ParameterSet,
    pub strategies: BTreeMap<&'static str, StrategyKind>,
    pub mapping: Vec<ColumnMapping>,
    pub arima_min_observations: usize,
    pub identity_tolerance: f64,
    pub parallel: bool,
}

impl ResolvedConfig {
    pub fn strategy_for(&self, series: &str) -> Option<StrategyKind> {
        self.strategies.get(series).copied()
    }
}

fn config_result(problems: Vec<String>) -> Result<(), PanelError> {
    if problems.is_empty() {
        return Ok(());
    }
    Err(PanelError::collect(
        problems.into_iter().map(PanelError::Config).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves() {
        let resolved = RunConfig::with_window(2000, 2030).resolve().unwrap();
        assert_eq!(resolved.window.len(), 31);
        assert_eq!(resolved.strategy_for(schema::GDP), Some(StrategyKind::Arima));
        assert_eq!(resolved.strategy_for(schema::NET_EXPORTS), None);
    }

    #[test]
    fn base_year_may_precede_the_window() {
        let resolved = RunConfig::with_window(2018, 2030).resolve().unwrap();
        assert_eq!(resolved.params.base_year, 2017);
        assert!(!resolved.window.contains(resolved.params.base_year));
    }

    #[test]
    fn resolve_collects_every_problem() {
        let mut config = RunConfig::with_window(2000, 2030);
        config.strategies.remove(schema::TFP);
        config
            .strategies
            .insert(schema::OPENNESS.to_string(), StrategyKind::AverageGrowth);
        config.strategies.insert("gdp".to_string(), StrategyKind::Arima);
        config.arima_min_observations = 2;

        let err = config.resolve().unwrap_err();
        assert_eq!(err.errors().len(), 4);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut config = RunConfig::with_window(2000, 2030);
        config.parameters.capital_share = 1.0;
        config.parameters.saving_rate = -0.1;
        let err = config.resolve().unwrap_err();
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn config_round_trips_through_json_with_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"start_year": 1995, "end_year": 2040, "parameters": {"capital_share": 0.4}}"#)
                .unwrap();
        assert_eq!(config.parameters.capital_share, 0.4);
        assert_eq!(config.parameters.base_year, 2017);
        assert_eq!(config.mapping, schema::default_mapping());
        assert!(config.resolve().is_ok());
    }
}
