//! `macro-panel` library crate.
//!
//! The binary (`panel`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - stages can be driven individually (notebooks, other front-ends)
//!
//! Pipeline stages, in order: `normalize`, `derive`, `extrapolate`,
//! `derive::close_identities`, `panel::assemble`. Every stage appends to the
//! `audit::TransformationLog`.

pub mod app;
pub mod audit;
pub mod cli;
pub mod data;
pub mod derive;
pub mod domain;
pub mod error;
pub mod extrapolate;
pub mod io;
pub mod math;
pub mod models;
pub mod normalize;
pub mod panel;
pub mod report;
