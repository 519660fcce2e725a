//! Unit & schema normalization.
//!
//! This module turns the heterogeneous raw table (many sources, native units)
//! into canonical series in canonical units:
//!
//! - **Priority merge**: when several raw columns feed one canonical series, the
//!   first mapping (in declared order) with a fresh value wins for each year.
//! - **Stale/non-finite cells** are treated as absent.
//! - **Strict schema**: every required canonical series must have at least one
//!   value, otherwise the run fails (all missing series are reported together).
//! - **Full history**: years outside the run window are kept. Derivation,
//!   interpolation and model fitting see the whole record; only the assembler
//!   cuts the panel down to the window.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::audit::{LogEntry, PassthroughNote, SourceContribution, TransformationLog};
use crate::domain::{CANONICAL_SCHEMA, RawTable, RawValue, ResolvedConfig, Series, SeriesRole};
use crate::error::PanelError;
use crate::panel::PartialPanel;

/// Normalize the raw table into a partial panel of canonical raw series.
pub fn normalize(
    raw: &RawTable,
    config: &ResolvedConfig,
    log: &mut TransformationLog,
) -> Result<PartialPanel, PanelError> {
    let mut panel = PartialPanel::new(config.window);
    let mut errors = Vec::new();

    for canonical in CANONICAL_SCHEMA {
        let SeriesRole::Raw { required } = canonical.role else {
            continue;
        };

        let mut series = Series::new();
        let mut sources = Vec::new();

        for mapping in config.mapping.iter().filter(|m| m.canonical == canonical.name) {
            let stale_ignored = raw
                .column(&mapping.source, &mapping.column)
                .filter(|(_, v)| matches!(v, RawValue::Stale(_)))
                .count();

            let mut years_used = 0usize;
            for (year, value) in raw.fresh_values(&mapping.source, &mapping.column) {
                if series.get(year).is_some() {
                    continue;
                }
                let converted = mapping.conversion.apply(value);
                if !converted.is_finite() {
                    warn!(
                        series = canonical.name,
                        source = %mapping.source,
                        column = %mapping.column,
                        year,
                        "conversion produced a non-finite value; cell ignored"
                    );
                    continue;
                }
                series.set(year, converted);
                years_used += 1;
            }

            if stale_ignored > 0 {
                debug!(
                    series = canonical.name,
                    source = %mapping.source,
                    column = %mapping.column,
                    stale_ignored,
                    "ignored stale cells"
                );
            }

            sources.push(SourceContribution {
                source: mapping.source.clone(),
                column: mapping.column.clone(),
                conversion: mapping.conversion,
                years_used,
                stale_ignored,
            });
        }

        let observations = series.observation_count();
        if observations == 0 {
            if required {
                errors.push(PanelError::Schema {
                    series: canonical.name.to_string(),
                });
            } else {
                warn!(series = canonical.name, "optional series has no source data");
            }
        }

        log.append(LogEntry::Passthrough(PassthroughNote {
            series: canonical.name.to_string(),
            sources,
            observations,
        }));
        panel.insert(canonical.name, series);
    }

    report_unmapped_columns(raw, config);

    if !errors.is_empty() {
        return Err(PanelError::collect(errors));
    }

    info!(series = panel.len(), "normalized raw table");
    Ok(panel)
}

fn report_unmapped_columns(raw: &RawTable, config: &ResolvedConfig) {
    let mapped: BTreeSet<(&str, &str)> = config
        .mapping
        .iter()
        .map(|m| (m.source.as_str(), m.column.as_str()))
        .collect();
    let unmapped: BTreeSet<(&str, &str)> = raw
        .iter()
        .map(|(k, _)| (k.source.as_str(), k.column.as_str()))
        .filter(|key| !mapped.contains(key))
        .collect();
    for (source, column) in unmapped {
        debug!(source, column, "raw column has no canonical mapping; ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunConfig;
    use crate::domain::schema::*;

    fn config() -> ResolvedConfig {
        RunConfig::with_window(2015, 2025).resolve().unwrap()
    }

    /// One observation for every required raw series.
    fn minimal_raw() -> RawTable {
        let mut raw = RawTable::new();
        for m in default_mapping() {
            if m.source != "pwt" || m.column != "emp" {
                raw.insert_fresh(&m.source, &m.column, 2017, 1.0);
            }
        }
        raw
    }

    #[test]
    fn converts_units_and_records_passthrough() {
        let mut raw = minimal_raw();
        raw.insert_fresh("worldbank", "NY.GDP.MKTP.CD", 2018, 1.2e13);
        raw.insert_fresh("worldbank", "SP.POP.TOTL", 2018, 1.39e9);

        let mut log = TransformationLog::new();
        let panel = normalize(&raw, &config(), &mut log).unwrap();

        assert!((panel.value(GDP, 2018).unwrap() - 12_000.0).abs() < 1e-9);
        assert!((panel.value(POPULATION, 2018).unwrap() - 1_390.0).abs() < 1e-9);
        assert_eq!(log.passthroughs().count(), 10);
        let note = log.passthroughs().find(|n| n.series == GDP).unwrap();
        assert_eq!(note.observations, 2);
        assert_eq!(note.sources[0].conversion, crate::domain::UnitConversion::UsdToBillions);
    }

    #[test]
    fn first_mapping_wins_and_second_fills_gaps() {
        let mut raw = minimal_raw();
        raw.insert_fresh("worldbank", "SL.TLF.TOTL.IN", 2018, 800e6);
        raw.insert_fresh("pwt", "emp", 2018, 1.0);
        raw.insert_fresh("pwt", "emp", 2019, 790.0);

        let mut log = TransformationLog::new();
        let panel = normalize(&raw, &config(), &mut log).unwrap();

        assert!((panel.value(LABOR_FORCE, 2018).unwrap() - 800.0).abs() < 1e-9);
        assert_eq!(panel.value(LABOR_FORCE, 2019), Some(790.0));
        let note = log.passthroughs().find(|n| n.series == LABOR_FORCE).unwrap();
        assert_eq!(note.sources[1].years_used, 1);
    }

    #[test]
    fn stale_cells_are_absent() {
        let mut raw = minimal_raw();
        raw.insert("pwt", "hc", 2018, RawValue::Stale(3.0));

        let mut log = TransformationLog::new();
        let panel = normalize(&raw, &config(), &mut log).unwrap();

        assert_eq!(panel.value(HUMAN_CAPITAL, 2018), None);
        let note = log.passthroughs().find(|n| n.series == HUMAN_CAPITAL).unwrap();
        assert_eq!(note.sources[0].stale_ignored, 1);
    }

    #[test]
    fn history_outside_the_window_is_kept() {
        let mut raw = minimal_raw();
        raw.insert_fresh("pwt", "hc", 1990, 2.1);
        raw.insert_fresh("pwt", "hc", 2030, 3.5);
        raw.insert("pwt", "hc", 1991, RawValue::Stale(2.2));

        let mut log = TransformationLog::new();
        let panel = normalize(&raw, &config(), &mut log).unwrap();

        assert_eq!(panel.value(HUMAN_CAPITAL, 1990), Some(2.1));
        assert_eq!(panel.value(HUMAN_CAPITAL, 1991), None);
        assert_eq!(panel.value(HUMAN_CAPITAL, 2030), Some(3.5));
        let note = log.passthroughs().find(|n| n.series == HUMAN_CAPITAL).unwrap();
        assert_eq!((note.observations, note.sources[0].stale_ignored), (3, 1));
    }

    #[test]
    fn every_missing_required_series_is_reported() {
        let mut raw = RawTable::new();
        raw.insert_fresh("worldbank", "NY.GDP.MKTP.CD", 2017, 1e12);

        let mut log = TransformationLog::new();
        let err = normalize(&raw, &config(), &mut log).unwrap_err();

        let series: Vec<String> = err
            .errors()
            .into_iter()
            .filter_map(|e| match e {
                PanelError::Schema { series } => Some(series.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(series.len(), 8);
        assert!(series.contains(&RKNA.to_string()));
        assert!(!series.contains(&POPULATION.to_string()));
        assert_eq!(err.exit_code(), 3);
    }
}
