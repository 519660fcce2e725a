//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory by every pipeline stage
//! - exported to JSON/CSV
//! - reloaded later for inspection

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Calendar year.
pub type Year = i32;

/// Inclusive `[start, end]` range of years covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: Year,
    pub end: Year,
}

impl YearWindow {
    pub fn new(start: Year, end: Year) -> Result<Self, PanelError> {
        if start > end {
            return Err(PanelError::Config(format!(
                "start year {start} is after end year {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: Year) -> bool {
        year >= self.start && year <= self.end
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Annual series over a contiguous range of years.
///
/// The range starts at `start_year` and has one slot per year; a slot is `None`
/// when the value is missing. Years are contiguous and unique by construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    start_year: Year,
    values: Vec<Option<f64>>,
}

impl Series {
    /// An empty series (no years defined yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from `(year, value)` pairs. Later duplicates win.
    pub fn from_observations(obs: impl IntoIterator<Item = (Year, f64)>) -> Self {
        let mut out = Self::new();
        for (year, value) in obs {
            out.set(year, value);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First year of the defined range.
    pub fn start_year(&self) -> Option<Year> {
        (!self.values.is_empty()).then_some(self.start_year)
    }

    /// Last year of the defined range.
    pub fn end_year(&self) -> Option<Year> {
        (!self.values.is_empty()).then(|| self.start_year + self.values.len() as Year - 1)
    }

    pub fn get(&self, year: Year) -> Option<f64> {
        let idx = self.index_of(year)?;
        self.values[idx]
    }

    /// Set a value, extending the range with missing slots as needed.
    pub fn set(&mut self, year: Year, value: f64) {
        if self.values.is_empty() {
            self.start_year = year;
            self.values.push(Some(value));
            return;
        }
        if year < self.start_year {
            let pad = (self.start_year - year) as usize;
            let mut values = vec![None; pad];
            values.append(&mut self.values);
            self.values = values;
            self.start_year = year;
        }
        let idx = (year - self.start_year) as usize;
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
    }

    pub fn first_observed(&self) -> Option<Year> {
        self.values
            .iter()
            .position(Option::is_some)
            .map(|i| self.start_year + i as Year)
    }

    pub fn last_observed(&self) -> Option<Year> {
        self.values
            .iter()
            .rposition(Option::is_some)
            .map(|i| self.start_year + i as Year)
    }

    pub fn observation_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// All observed `(year, value)` pairs in year order.
    pub fn observations(&self) -> Vec<(Year, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (self.start_year + i as Year, v)))
            .collect()
    }

    /// Years of `window` without a value.
    pub fn missing_years(&self, window: YearWindow) -> Vec<Year> {
        window.years().filter(|&y| self.get(y).is_none()).collect()
    }

    fn index_of(&self, year: Year) -> Option<usize> {
        if self.values.is_empty() || year < self.start_year {
            return None;
        }
        let idx = (year - self.start_year) as usize;
        (idx < self.values.len()).then_some(idx)
    }
}

/// Key of a raw cell: `(source, raw column, year)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawKey {
    pub source: String,
    pub column: String,
    pub year: Year,
}

/// A raw value as delivered by the download/cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawValue {
    Fresh(f64),
    /// Marked stale by the cache layer; treated as absent.
    Stale(f64),
}

/// The raw input table keyed by `(source, column, year)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    cells: BTreeMap<RawKey, RawValue>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: &str, column: &str, year: Year, value: RawValue) {
        self.cells.insert(
            RawKey {
                source: source.to_string(),
                column: column.to_string(),
                year,
            },
            value,
        );
    }

    pub fn insert_fresh(&mut self, source: &str, column: &str, year: Year, value: f64) {
        self.insert(source, column, year, RawValue::Fresh(value));
    }

    pub fn get(&self, source: &str, column: &str, year: Year) -> Option<RawValue> {
        let key = RawKey {
            source: source.to_string(),
            column: column.to_string(),
            year,
        };
        self.cells.get(&key).copied()
    }

    pub fn contains(&self, source: &str, column: &str, year: Year) -> bool {
        self.get(source, column, year).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RawKey, &RawValue)> {
        self.cells.iter()
    }

    /// All cells of one `(source, column)` in year order.
    pub fn column(&self, source: &str, column: &str) -> impl Iterator<Item = (Year, RawValue)> + '_ {
        let lo = RawKey {
            source: source.to_string(),
            column: column.to_string(),
            year: Year::MIN,
        };
        let hi = RawKey {
            source: source.to_string(),
            column: column.to_string(),
            year: Year::MAX,
        };
        self.cells.range(lo..=hi).map(|(k, v)| (k.year, *v))
    }

    /// Fresh, finite values of one `(source, column)` in year order.
    pub fn fresh_values(&self, source: &str, column: &str) -> impl Iterator<Item = (Year, f64)> + '_ {
        self.column(source, column).filter_map(|(year, v)| match v {
            RawValue::Fresh(x) if x.is_finite() => Some((year, x)),
            _ => None,
        })
    }
}

/// Extrapolation strategy assigned to a series in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Arima,
    LinearRegression,
    AverageGrowth,
}

impl StrategyKind {
    pub fn display_name(self) -> &'static str {
        match self {
            StrategyKind::Arima => "ARIMA(1,1,1)",
            StrategyKind::LinearRegression => "linear regression",
            StrategyKind::AverageGrowth => "average growth",
        }
    }
}

/// Method that actually produced the filled values.
///
/// This is `StrategyKind` plus the last-resort constant hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Arima,
    LinearRegression,
    AverageGrowth,
    ConstantHold,
}

impl FillMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FillMethod::Arima => StrategyKind::Arima.display_name(),
            FillMethod::LinearRegression => StrategyKind::LinearRegression.display_name(),
            FillMethod::AverageGrowth => StrategyKind::AverageGrowth.display_name(),
            FillMethod::ConstantHold => "constant hold",
        }
    }
}

impl From<StrategyKind> for FillMethod {
    fn from(value: StrategyKind) -> Self {
        match value {
            StrategyKind::Arima => FillMethod::Arima,
            StrategyKind::LinearRegression => FillMethod::LinearRegression,
            StrategyKind::AverageGrowth => FillMethod::AverageGrowth,
        }
    }
}

/// Unit conversion applied to a raw column before it enters the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConversion {
    Identity,
    /// USD → billions of USD (× 1e-9).
    UsdToBillions,
    /// People → millions of people (÷ 1e6).
    PeopleToMillions,
    /// Thousands → millions (÷ 1e3).
    ThousandsToMillions,
    /// Arbitrary multiplicative factor.
    Scale(f64),
}

impl UnitConversion {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnitConversion::Identity => value,
            UnitConversion::UsdToBillions => value * 1e-9,
            UnitConversion::PeopleToMillions => value / 1e6,
            UnitConversion::ThousandsToMillions => value / 1e3,
            UnitConversion::Scale(factor) => value * factor,
        }
    }

    pub fn describe(self) -> String {
        match self {
            UnitConversion::Identity => "as reported".to_string(),
            UnitConversion::UsdToBillions => "USD -> billions USD (x 1e-9)".to_string(),
            UnitConversion::PeopleToMillions => "people -> millions (/ 1e6)".to_string(),
            UnitConversion::ThousandsToMillions => "thousands -> millions (/ 1e3)".to_string(),
            UnitConversion::Scale(factor) => format!("scaled (x {factor})"),
        }
    }
}
