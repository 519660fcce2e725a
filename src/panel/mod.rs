//! Panel types and the final assembler.
//!
//! - `PartialPanel`: working table during normalization/derivation/extrapolation,
//!   values may be missing.
//! - `Panel`: the final, gap-free table in canonical schema order. Only
//!   `assemble` builds one, so holding a `Panel` means the completeness check
//!   passed.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::domain::{CANONICAL_SCHEMA, Series, Year, YearWindow};
use crate::error::PanelError;

/// Working set of series during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialPanel {
    window: YearWindow,
    series: BTreeMap<String, Series>,
}

impl PartialPanel {
    pub fn new(window: YearWindow) -> Self {
        Self {
            window,
            series: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> YearWindow {
        self.window
    }

    /// The run window widened to every observed year of every series.
    pub fn span(&self) -> YearWindow {
        let mut span = self.window;
        for series in self.series.values() {
            if let Some(first) = series.first_observed() {
                span.start = span.start.min(first);
            }
            if let Some(last) = series.last_observed() {
                span.end = span.end.max(last);
            }
        }
        span
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn insert(&mut self, name: &str, series: Series) {
        self.series.insert(name.to_string(), series);
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn value(&self, name: &str, year: Year) -> Option<f64> {
        self.series.get(name).and_then(|s| s.get(year))
    }

    /// Set one value, creating the series if needed.
    pub fn set(&mut self, name: &str, year: Year, value: f64) {
        self.series.entry(name.to_string()).or_default().set(year, value);
    }

    /// Remove and return a series (used to hand series to per-series workers).
    pub fn take(&mut self, name: &str) -> Option<Series> {
        self.series.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One column of the final panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelColumn {
    pub name: &'static str,
    pub unit: &'static str,
    pub values: Vec<f64>,
}

/// Final, gap-free, year-indexed panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    start_year: Year,
    end_year: Year,
    columns: Vec<PanelColumn>,
}

impl Panel {
    pub fn start_year(&self) -> Year {
        self.start_year
    }

    pub fn end_year(&self) -> Year {
        self.end_year
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start_year..=self.end_year
    }

    pub fn len_years(&self) -> usize {
        (self.end_year - self.start_year + 1) as usize
    }

    /// Columns in canonical schema order.
    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&PanelColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn value(&self, name: &str, year: Year) -> Option<f64> {
        if year < self.start_year || year > self.end_year {
            return None;
        }
        let idx = (year - self.start_year) as usize;
        self.column(name).map(|c| c.values[idx])
    }
}

/// Merge the working panel into the final panel and verify completeness.
///
/// Only the run window is kept; history outside it is dropped here. Fails with `IncompletePanel` listing every `(series, year)` without a finite
/// value, including declared series that are absent altogether.
pub fn assemble(partial: &PartialPanel) -> Result<Panel, PanelError> {
    let window = partial.window();
    let mut missing = Vec::new();
    let mut columns = Vec::with_capacity(CANONICAL_SCHEMA.len());

    for canonical in CANONICAL_SCHEMA {
        let series = partial.get(canonical.name);
        let mut values = Vec::with_capacity(window.len());
        for year in window.years() {
            match series.and_then(|s| s.get(year)) {
                Some(v) if v.is_finite() => values.push(v),
                _ => {
                    missing.push((canonical.name.to_string(), year));
                    values.push(f64::NAN);
                }
            }
        }
        columns.push(PanelColumn {
            name: canonical.name,
            unit: canonical.unit,
            values,
        });
    }

    if !missing.is_empty() {
        return Err(PanelError::IncompletePanel { missing });
    }

    info!(
        columns = columns.len(),
        start = window.start,
        end = window.end,
        "assembled panel"
    );
    Ok(Panel {
        start_year: window.start,
        end_year: window.end,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_partial(window: YearWindow) -> PartialPanel {
        let mut partial = PartialPanel::new(window);
        for (i, c) in CANONICAL_SCHEMA.iter().enumerate() {
            for year in window.years() {
                partial.set(c.name, year, i as f64 + f64::from(year - window.start));
            }
        }
        partial
    }

    #[test]
    fn assembles_in_canonical_order() {
        let window = YearWindow::new(2000, 2003).unwrap();
        let mut partial = full_partial(window);
        partial.set("not_in_schema", 2000, 1.0);

        let panel = assemble(&partial).unwrap();
        let names: Vec<_> = panel.columns().iter().map(|c| c.name).collect();
        let expected: Vec<_> = CANONICAL_SCHEMA.iter().map(|c| c.name).collect();
        assert_eq!(names, expected);
        assert_eq!(panel.len_years(), 4);
        assert_eq!(panel.value(CANONICAL_SCHEMA[2].name, 2003), Some(5.0));
        assert_eq!(panel.value(CANONICAL_SCHEMA[2].name, 2004), None);
    }

    #[test]
    fn lists_every_missing_cell() {
        let window = YearWindow::new(2000, 2002).unwrap();
        let mut partial = full_partial(window);
        let tfp = crate::domain::schema::TFP;
        partial.take(tfp);
        partial.insert(tfp, Series::from_observations([(2001, 1.0), (2002, f64::NAN)]));
        partial.take(crate::domain::schema::OPENNESS);

        let err = assemble(&partial).unwrap_err();
        let PanelError::IncompletePanel { missing } = err else {
            panic!("expected IncompletePanel");
        };
        assert_eq!(missing.len(), 5);
        assert!(missing.contains(&(tfp.to_string(), 2000)));
        assert!(missing.contains(&(tfp.to_string(), 2002)));
        assert!(missing.contains(&(crate::domain::schema::OPENNESS.to_string(), 2001)));
    }

    #[test]
    fn history_outside_the_window_is_cut_at_assembly() {
        let window = YearWindow::new(2000, 2001).unwrap();
        let mut partial = full_partial(window);
        let gdp = crate::domain::schema::GDP;
        partial.set(gdp, 1995, 7.0);
        partial.set(gdp, 2005, 9.0);
        assert_eq!(partial.span(), YearWindow::new(1995, 2005).unwrap());

        let panel = assemble(&partial).unwrap();
        assert_eq!((panel.start_year(), panel.end_year()), (2000, 2001));
        assert_eq!(panel.value(gdp, 1995), None);
        assert_eq!(panel.column(gdp).unwrap().values.len(), 2);
    }
}
