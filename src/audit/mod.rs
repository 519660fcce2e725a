//! Transformation log: the append-only audit trail of a run.
//!
//! Every stage appends entries describing how a value came to be. Entries are
//! never mutated after being appended; the report renderer (and JSON export)
//! only reads them.

pub mod records;

pub use records::*;

use serde::{Deserialize, Serialize};

/// Append-only log of every computation and extrapolation decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationLog {
    entries: Vec<LogEntry>,
}

impl TransformationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Append one series' batch of entries.
    ///
    /// Callers append batches in canonical-name order so the log order does not
    /// depend on how the batches were computed.
    pub fn append_series(&mut self, batch: SeriesLog) {
        self.entries.extend(batch.entries);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passthroughs(&self) -> impl Iterator<Item = &PassthroughNote> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Passthrough(n) => Some(n),
            _ => None,
        })
    }

    pub fn derivations(&self) -> impl Iterator<Item = &DerivationRecord> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Derivation(r) => Some(r),
            _ => None,
        })
    }

    pub fn interpolations(&self) -> impl Iterator<Item = &InterpolationRecord> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Interpolation(r) => Some(r),
            _ => None,
        })
    }

    pub fn extrapolations(&self) -> impl Iterator<Item = &ExtrapolationRecord> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Extrapolation(r) => Some(r),
            _ => None,
        })
    }

    pub fn advisories(&self) -> impl Iterator<Item = &Advisory> {
        self.entries.iter().filter_map(|e| match e {
            LogEntry::Advisory(a) => Some(a),
            _ => None,
        })
    }

    pub fn extrapolation_for(&self, series: &str) -> Option<&ExtrapolationRecord> {
        self.extrapolations().find(|r| r.series == series)
    }

    pub fn entries_for<'a>(&'a self, series: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.series() == series)
    }
}

/// Entries produced for a single series, owned by that series' worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesLog {
    entries: Vec<LogEntry>,
}

impl SeriesLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}
