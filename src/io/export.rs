//! Exports: the panel as wide CSV, the log as JSON, raw tables as long CSV.
//!
//! The CSV layouts are meant to be easy to consume in spreadsheets or
//! downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::audit::TransformationLog;
use crate::domain::{RawTable, RawValue};
use crate::error::PanelError;
use crate::panel::Panel;

/// Write the panel as wide CSV: `year` plus one column per canonical series.
pub fn write_panel_csv(path: &Path, panel: &Panel) -> Result<(), PanelError> {
    let file = create(path)?;
    write_panel(file, panel)
}

pub fn write_panel<W: Write>(out: W, panel: &Panel) -> Result<(), PanelError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["year".to_string()];
    header.extend(panel.columns().iter().map(|c| c.name.to_string()));
    writer.write_record(&header)?;

    for (idx, year) in panel.years().enumerate() {
        let mut row = Vec::with_capacity(panel.columns().len() + 1);
        row.push(year.to_string());
        row.extend(panel.columns().iter().map(|c| format!("{:.6}", c.values[idx])));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the transformation log as pretty JSON.
pub fn write_log_json(path: &Path, log: &TransformationLog) -> Result<(), PanelError> {
    let file = create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), log)?;
    Ok(())
}

/// Write a raw table in the long format read by `load_raw_table`.
pub fn write_raw_csv(path: &Path, raw: &RawTable) -> Result<(), PanelError> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(["source", "column", "year", "value", "stale"])?;
    for (key, value) in raw.iter() {
        let (v, stale) = match value {
            RawValue::Fresh(v) => (v, "false"),
            RawValue::Stale(v) => (v, "true"),
        };
        let year = key.year.to_string();
        let v = v.to_string();
        writer.write_record([key.source.as_str(), key.column.as_str(), year.as_str(), v.as_str(), stale])?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> Result<File, PanelError> {
    File::create(path).map_err(|e| PanelError::Input(format!("failed to create '{}': {e}", path.display())))
}
