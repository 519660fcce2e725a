//! Error taxonomy for the panel pipeline.
//!
//! `PanelError` is what callers see. Stages collect every error they hit and
//! return them together as `PanelError::Aggregate` so one run reports all
//! problems at once.
//!
//! `StrategyError` is internal to the extrapolation engine: it is always caught
//! and turned into a recorded fallback, never surfaced as a run failure.

use thiserror::Error;

use crate::domain::Year;

#[derive(Debug, Error)]
pub enum PanelError {
    /// A required canonical series has no raw data across all sources.
    #[error("schema error: required series `{series}` has no source data")]
    Schema { series: String },

    /// A formula's preconditions are violated.
    #[error("derivation error: {formula} in {year}: {reason}")]
    Derivation {
        formula: String,
        year: Year,
        reason: String,
    },

    /// A series has no historical observation at all.
    #[error("insufficient data: series `{series}` has no historical observations")]
    InsufficientData { series: String },

    /// Post-condition failure of the assembler.
    #[error("incomplete panel: {} missing cell(s), first: {}", .missing.len(), first_missing(.missing))]
    IncompletePanel { missing: Vec<(String, Year)> },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Every error collected by a failing stage.
    #[error("pipeline failed with {} error(s):\n{}", .0.len(), list_errors(.0))]
    Aggregate(Vec<PanelError>),
}

impl PanelError {
    pub fn derivation(formula: impl Into<String>, year: Year, reason: impl Into<String>) -> Self {
        Self::Derivation {
            formula: formula.into(),
            year,
            reason: reason.into(),
        }
    }

    /// Wrap collected errors; a single error is returned as-is.
    pub fn collect(mut errors: Vec<PanelError>) -> Self {
        if errors.len() == 1 {
            return errors.remove(0);
        }
        Self::Aggregate(errors)
    }

    /// Flatten into the list of leaf errors.
    pub fn errors(&self) -> Vec<&PanelError> {
        match self {
            PanelError::Aggregate(inner) => inner.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// Process exit code for the `panel` binary.
    ///
    /// - 2: configuration, input or IO problems
    /// - 3: data coverage problems (schema, insufficient data, incomplete panel)
    /// - 4: derivation failures
    pub fn exit_code(&self) -> u8 {
        match self {
            PanelError::Config(_)
            | PanelError::Input(_)
            | PanelError::Io(_)
            | PanelError::Json(_)
            | PanelError::Csv(_) => 2,
            PanelError::Schema { .. }
            | PanelError::InsufficientData { .. }
            | PanelError::IncompletePanel { .. } => 3,
            PanelError::Derivation { .. } => 4,
            PanelError::Aggregate(inner) => inner.iter().map(|e| e.exit_code()).max().unwrap_or(1),
        }
    }
}

fn first_missing(missing: &[(String, Year)]) -> String {
    missing
        .first()
        .map(|(series, year)| format!("{series}@{year}"))
        .unwrap_or_else(|| "-".to_string())
}

fn list_errors(errors: &[PanelError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recoverable failure of a single extrapolation strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("too few observations: need {needed}, have {got}")]
    TooFewObservations { needed: usize, got: usize },

    #[error("history contains non-finite values")]
    NonFiniteHistory,

    #[error("no valid fit candidate")]
    NoCandidate,

    #[error("least-squares solve failed")]
    Solver,

    #[error("non-finite forecast at step {step}")]
    NonFiniteForecast { step: usize },

    #[error("forecast diverged at step {step}")]
    Divergent { step: usize },
}
