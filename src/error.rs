//! Error types for configuration, warehouse access and the runners.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the `dwh.cfg` configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Missing required config value [{section}] {key}")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("Invalid config value [{section}] {key} = {value:?}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised by the local JSON bulk loader.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Copy source {0:?} does not exist")]
    MissingSource(PathBuf),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid JSONPaths descriptor {path:?}: {reason}")]
    JsonPaths { path: PathBuf, reason: String },

    #[error("JSONPaths descriptor has {paths} paths but table {table} has {columns} columns")]
    JsonPathsArity {
        table: String,
        paths: usize,
        columns: usize,
    },

    #[error("Record in {path:?} is not a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("Cannot load {value} into column {column} ({path:?}): {reason}")]
    Value {
        path: PathBuf,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Failed to insert records from {path:?}: {source}")]
    Insert {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// The error reported by the database driver, passed through untranslated.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Postgres(#[from] postgres::Error),

    #[error(transparent)]
    Tls(#[from] native_tls::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    LocalCopy(#[from] CopyError),
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Could not connect to warehouse: {0}")]
    Connection(#[source] DriverError),

    #[error("Statement {statement} failed: {source}")]
    StatementExecution {
        statement: String,
        #[source]
        source: DriverError,
    },
}

impl EtlError {
    pub fn statement<E: Into<DriverError>>(statement: &str, source: E) -> Self {
        EtlError::StatementExecution {
            statement: statement.to_string(),
            source: source.into(),
        }
    }
}

/// The runner phases, in the order the two entry points execute them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drop,
    Create,
    Copy,
    Insert,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Drop => "drop",
            Phase::Create => "create",
            Phase::Copy => "copy",
            Phase::Insert => "insert",
        };
        f.write_str(name)
    }
}

/// A runner stopped partway through. Statements listed in `committed` stay
/// applied in the warehouse.
#[derive(Debug, Error)]
#[error(
    "{phase} phase stopped at {statement} after {} committed statement(s): {source}",
    .committed.len()
)]
pub struct RunError {
    pub phase: Phase,
    pub statement: String,
    pub committed: Vec<String>,
    #[source]
    pub source: EtlError,
}
