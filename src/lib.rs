//! Sparkify warehouse loader.
//!
//! Provisions the star schema on a Redshift cluster (or a local SQLite file)
//! and loads it from the song and event JSON sources.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod load;
mod runner;
pub mod warehouse;

pub use catalog::{Dialect, SchemaCatalog, Statement};
pub use config::DwhConfig;
pub use error::{ConfigError, EtlError, Phase, RunError};
pub use lifecycle::{reset_schema, verify_schema};
pub use load::run_load;
pub use runner::RunReport;
pub use warehouse::{connect, with_connection, Connection, Warehouse, WarehouseTarget};
