//! The canonical output schema.
//!
//! Column order in the final panel follows `CANONICAL_SCHEMA`, independent of
//! which sources actually supplied data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{StrategyKind, UnitConversion};

pub const GDP: &str = "gdp_usd_bn";
pub const EXPORTS: &str = "exports_usd_bn";
pub const IMPORTS: &str = "imports_usd_bn";
pub const GOVERNMENT: &str = "government_usd_bn";
pub const TAX_REVENUE: &str = "tax_revenue_usd_bn";
pub const POPULATION: &str = "population_mn";
pub const LABOR_FORCE: &str = "labor_force_mn";
pub const HUMAN_CAPITAL: &str = "human_capital_index";
pub const RKNA: &str = "rkna";
pub const PL_GDPO: &str = "pl_gdpo";

pub const CAPITAL_STOCK: &str = "capital_stock_usd_bn";
pub const TFP: &str = "tfp";

pub const NET_EXPORTS: &str = "net_exports_usd_bn";
pub const OPENNESS: &str = "openness_ratio";
pub const CONSUMPTION: &str = "consumption_usd_bn";
pub const INVESTMENT: &str = "investment_usd_bn";
pub const NATIONAL_SAVING: &str = "national_saving_usd_bn";
pub const PRIVATE_SAVING: &str = "private_saving_usd_bn";
pub const PUBLIC_SAVING: &str = "public_saving_usd_bn";
pub const NET_SAVING: &str = "net_saving_usd_bn";

/// How a canonical series comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesRole {
    /// Observed in raw sources. Required series abort the run when absent.
    Raw { required: bool },
    /// Derived from history, then extrapolated like a raw series.
    Anchored,
    /// Derived for every year from other series (never extrapolated).
    Identity,
}

impl SeriesRole {
    /// Whether the extrapolation engine fills this series.
    pub fn is_extrapolated(self) -> bool {
        !matches!(self, SeriesRole::Identity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSeries {
    pub name: &'static str,
    pub unit: &'static str,
    pub role: SeriesRole,
}

const fn raw(name: &'static str, unit: &'static str, required: bool) -> CanonicalSeries {
    CanonicalSeries {
        name,
        unit,
        role: SeriesRole::Raw { required },
    }
}

const fn derived(name: &'static str, unit: &'static str, role: SeriesRole) -> CanonicalSeries {
    CanonicalSeries { name, unit, role }
}

pub const CANONICAL_SCHEMA: &[CanonicalSeries] = &[
    raw(GDP, "billions USD", true),
    raw(EXPORTS, "billions USD", true),
    raw(IMPORTS, "billions USD", true),
    raw(GOVERNMENT, "billions USD", true),
    raw(TAX_REVENUE, "billions USD", true),
    raw(POPULATION, "millions", false),
    raw(LABOR_FORCE, "millions", true),
    raw(HUMAN_CAPITAL, "index", true),
    raw(RKNA, "index (2017=1)", true),
    raw(PL_GDPO, "index (2017=1)", true),
    derived(CAPITAL_STOCK, "billions USD", SeriesRole::Anchored),
    derived(TFP, "index", SeriesRole::Anchored),
    derived(NET_EXPORTS, "billions USD", SeriesRole::Identity),
    derived(OPENNESS, "ratio", SeriesRole::Identity),
    derived(CONSUMPTION, "billions USD", SeriesRole::Identity),
    derived(INVESTMENT, "billions USD", SeriesRole::Identity),
    derived(NATIONAL_SAVING, "billions USD", SeriesRole::Identity),
    derived(PRIVATE_SAVING, "billions USD", SeriesRole::Identity),
    derived(PUBLIC_SAVING, "billions USD", SeriesRole::Identity),
    derived(NET_SAVING, "billions USD", SeriesRole::Identity),
];

pub fn canonical(name: &str) -> Option<&'static CanonicalSeries> {
    CANONICAL_SCHEMA.iter().find(|c| c.name == name)
}

/// Canonical series filled by the extrapolation engine (raw + anchored).
pub fn extrapolated_series() -> impl Iterator<Item = &'static CanonicalSeries> {
    CANONICAL_SCHEMA.iter().filter(|c| c.role.is_extrapolated())
}

/// One raw column feeding a canonical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub source: String,
    pub column: String,
    pub canonical: String,
    pub conversion: UnitConversion,
}

impl ColumnMapping {
    pub fn new(source: &str, column: &str, canonical: &str, conversion: UnitConversion) -> Self {
        Self {
            source: source.to_string(),
            column: column.to_string(),
            canonical: canonical.to_string(),
            conversion,
        }
    }
}

/// Built-in source mapping (World Bank WDI, Penn World Table, IMF).
///
/// Order matters: for a given year the first mapping with a fresh value wins.
pub fn default_mapping() -> Vec<ColumnMapping> {
    use UnitConversion::*;
    vec![
        ColumnMapping::new("worldbank", "NY.GDP.MKTP.CD", GDP, UsdToBillions),
        ColumnMapping::new("worldbank", "NE.EXP.GNFS.CD", EXPORTS, UsdToBillions),
        ColumnMapping::new("worldbank", "NE.IMP.GNFS.CD", IMPORTS, UsdToBillions),
        ColumnMapping::new("worldbank", "NE.CON.GOVT.CD", GOVERNMENT, UsdToBillions),
        ColumnMapping::new("imf", "tax_revenue_usd", TAX_REVENUE, UsdToBillions),
        ColumnMapping::new("worldbank", "SP.POP.TOTL", POPULATION, PeopleToMillions),
        ColumnMapping::new("worldbank", "SL.TLF.TOTL.IN", LABOR_FORCE, PeopleToMillions),
        ColumnMapping::new("pwt", "emp", LABOR_FORCE, Identity),
        ColumnMapping::new("pwt", "hc", HUMAN_CAPITAL, Identity),
        ColumnMapping::new("pwt", "rkna", RKNA, Identity),
        ColumnMapping::new("pwt", "pl_gdpo", PL_GDPO, Identity),
    ]
}

/// Built-in strategy table for every extrapolated series.
pub fn default_strategies() -> BTreeMap<String, StrategyKind> {
    extrapolated_series()
        .map(|c| {
            let kind = match c.name {
                GDP => StrategyKind::Arima,
                POPULATION | LABOR_FORCE | HUMAN_CAPITAL => StrategyKind::LinearRegression,
                _ => StrategyKind::AverageGrowth,
            };
            (c.name.to_string(), kind)
        })
        .collect()
}
