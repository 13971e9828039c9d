//! `paddock-stage`: turns raw CSV extracts into staging tables.
//!
//! Column steps (drop, rename, coerce, select, dedupe) are applied per table,
//! then the fuzzy link passes stitch loosely keyed sources together before
//! every staged table is written back out as CSV.

pub mod coerce;
pub mod config;
pub mod error;
pub mod link;
pub mod pipeline;
pub mod steps;
pub mod table;

pub use config::StageConfig;
pub use error::StageError;
pub use pipeline::{run, StageReport, Workspace};
pub use table::Table;
