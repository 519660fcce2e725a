//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - series, raw-table and year-window types (`types`)
//! - the canonical schema and built-in source mapping (`schema`)
//! - run configuration and the parameter set (`config`)

pub mod config;
pub mod schema;
pub mod types;

pub use config::*;
pub use schema::{CANONICAL_SCHEMA, CanonicalSeries, ColumnMapping, SeriesRole};
pub use types::*;
