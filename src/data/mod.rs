//! Data sources that do not come from a file.
//!
//! - seeded synthetic raw tables (`synthetic`)

pub mod synthetic;

pub use synthetic::*;
