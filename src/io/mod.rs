//! Input/output helpers.
//!
//! - raw-table CSV ingest + validation (`ingest`)
//! - JSON run configuration (`config`)
//! - panel/log/raw exports (`export`)

pub mod config;
pub mod export;
pub mod ingest;

pub use config::*;
pub use export::*;
pub use ingest::*;
