//! Record types stored in the transformation log.

use serde::{Deserialize, Serialize};

use crate::domain::{FillMethod, StrategyKind, UnitConversion, Year};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Passthrough(PassthroughNote),
    Derivation(DerivationRecord),
    Interpolation(InterpolationRecord),
    Extrapolation(ExtrapolationRecord),
    Advisory(Advisory),
}

impl LogEntry {
    /// Canonical series the entry is about.
    pub fn series(&self) -> &str {
        match self {
            LogEntry::Passthrough(n) => &n.series,
            LogEntry::Derivation(r) => &r.series,
            LogEntry::Interpolation(r) => &r.series,
            LogEntry::Extrapolation(r) => &r.series,
            LogEntry::Advisory(a) => &a.series,
        }
    }
}

/// How a canonical raw series was taken from its sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughNote {
    pub series: String,
    pub sources: Vec<SourceContribution>,
    /// Years with a value after merging all sources.
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    pub source: String,
    pub column: String,
    pub conversion: UnitConversion,
    /// Years this source supplied (after higher-priority sources).
    pub years_used: usize,
    /// Cells ignored because the cache layer marked them stale.
    pub stale_ignored: usize,
}

/// Closed set of derivation formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    NetExports,
    CapitalStockRebase,
    CobbDouglasResidual,
    Openness,
    Consumption,
    Investment,
    NationalSaving,
    PrivateSaving,
    PublicSaving,
    NetSaving,
    ExpenditureIdentity,
}

impl Formula {
    pub fn name(self) -> &'static str {
        match self {
            Formula::NetExports => "net_exports",
            Formula::CapitalStockRebase => "capital_stock_rebase",
            Formula::CobbDouglasResidual => "cobb_douglas_residual",
            Formula::Openness => "openness",
            Formula::Consumption => "consumption",
            Formula::Investment => "investment",
            Formula::NationalSaving => "national_saving",
            Formula::PrivateSaving => "private_saving",
            Formula::PublicSaving => "public_saving",
            Formula::NetSaving => "net_saving",
            Formula::ExpenditureIdentity => "expenditure_identity",
        }
    }

    pub fn expression(self) -> &'static str {
        match self {
            Formula::NetExports => "NX = X - M",
            Formula::CapitalStockRebase => {
                "K[t] = rkna[t]/rkna[b] * K[b] * pl_gdpo[t]/pl_gdpo[b], K[b] = Y[b] * k_y"
            }
            Formula::CobbDouglasResidual => "TFP = Y / (K^a * (L*H)^(1-a))",
            Formula::Openness => "(X + M) / Y",
            Formula::Consumption => "C = (1 - s) * Y - G",
            Formula::Investment => "I = s * Y - NX",
            Formula::NationalSaving => "S = Y - C - G",
            Formula::PrivateSaving => "Sp = Y - T - C",
            Formula::PublicSaving => "Sg = T - G",
            Formula::NetSaving => "S - d * K",
            Formula::ExpenditureIdentity => "Y = C + I + G + NX",
        }
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit edge-case policy applied instead of propagating NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// `Y = 0` with positive capital: TFP is defined as exactly zero.
    ZeroOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedInput {
    pub name: String,
    pub value: f64,
}

impl NamedInput {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// One derived value and exactly what it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationRecord {
    pub series: String,
    pub year: Year,
    pub formula: Formula,
    pub inputs: Vec<NamedInput>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<EdgePolicy>,
}

/// Interior gaps filled by linear interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationRecord {
    pub series: String,
    pub years: Vec<Year>,
}

/// A strategy that was tried and abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStep {
    pub from: FillMethod,
    pub reason: String,
}

/// Fit diagnostics of the method that produced the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FitDiagnostics {
    Arima {
        phi: f64,
        theta: f64,
        constant: f64,
        /// Conditional sum of squares of the fit on the original history.
        css: f64,
        observations: usize,
        /// Number of one-step refits performed while forecasting.
        refits: usize,
    },
    LinearRegression {
        intercept: f64,
        slope: f64,
        r_squared: f64,
        observations: usize,
    },
    AverageGrowth {
        rate: f64,
        ratios_used: usize,
    },
    ConstantHold {
        value: f64,
    },
}

/// How a series was extended to the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrapolationRecord {
    pub series: String,
    pub requested: StrategyKind,
    pub applied: FillMethod,
    pub fallbacks: Vec<FallbackStep>,
    pub last_observed_year: Year,
    pub years_filled: Vec<Year>,
    pub diagnostics: FitDiagnostics,
    pub low_confidence: bool,
}

impl ExtrapolationRecord {
    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    /// The assigned strategy could not be used; a fallback produced the values.
    FallbackUsed,
    /// Values were held constant from too little history.
    LowConfidenceExtrapolation,
}

/// Non-fatal note surfaced to the caller with a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub series: String,
    pub kind: AdvisoryKind,
    pub detail: String,
}
