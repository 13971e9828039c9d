//! `paddock-load`: bulk loads staged CSV files into SQLite.
//!
//! Files are mapped to `schema.table` targets from their names, ordered so
//! parent tables load before the tables that reference them, and inserted in
//! a single transaction with foreign-key checks deferred to commit.

pub mod config;
pub mod error;
pub mod loader;
pub mod plan;

pub use config::LoadConfig;
pub use error::LoadError;
pub use loader::{load, load_into, open, LoadReport, TableLoad};
pub use plan::{discover, parse_table_from_filename, PlannedLoad, TableRef};
