//! Connection management: one connection at a time, each statement
//! committed on its own.

mod local_copy;
mod redshift;
mod sqlite;

pub use local_copy::copy_into;
pub(crate) use local_copy::local_path;
pub use redshift::RedshiftWarehouse;
pub use sqlite::SqliteWarehouse;

use crate::catalog::{Dialect, Statement};
use crate::config::ClusterConfig;
use crate::error::{DriverError, EtlError};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Executes statements against a warehouse.
pub trait Warehouse {
    /// Runs one statement and commits it before returning. A failed
    /// statement is rolled back, earlier ones stay committed.
    fn execute(&mut self, statement: &Statement) -> Result<(), EtlError>;
}

trait Backend: Warehouse {
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

#[derive(Debug, Clone)]
pub enum WarehouseTarget {
    Redshift(ClusterConfig),
    Local(PathBuf),
}

impl WarehouseTarget {
    /// The catalog dialect matching this target.
    pub fn dialect(&self) -> Dialect {
        match self {
            WarehouseTarget::Redshift(_) => Dialect::Redshift,
            WarehouseTarget::Local(_) => Dialect::Sqlite,
        }
    }
}

/// An open warehouse connection. Closed exactly once, either through
/// [`Connection::close`] or when dropped.
pub struct Connection {
    backend: Option<Box<dyn Backend>>,
}

pub fn connect(target: &WarehouseTarget) -> Result<Connection, EtlError> {
    let backend: Box<dyn Backend> = match target {
        WarehouseTarget::Redshift(cluster) => Box::new(RedshiftWarehouse::connect(cluster)?),
        WarehouseTarget::Local(path) => Box::new(SqliteWarehouse::open(path)?),
    };
    info!("Connected.");
    Ok(Connection {
        backend: Some(backend),
    })
}

/// Opens a connection for the duration of `f`. The connection is closed
/// whether `f` succeeds or not; a close failure is only reported when `f`
/// itself succeeded, otherwise it is logged.
pub fn with_connection<T, E, F>(target: &WarehouseTarget, f: F) -> Result<T, E>
where
    F: FnOnce(&mut Connection) -> Result<T, E>,
    E: From<EtlError>,
{
    scoped(connect(target)?, f)
}

fn scoped<T, E, F>(mut connection: Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&mut Connection) -> Result<T, E>,
    E: From<EtlError>,
{
    let result = f(&mut connection);
    let closed = connection.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            warn!("Failed to close warehouse connection: {}", close_error);
            Err(e)
        }
    }
}

impl Connection {
    pub fn close(mut self) -> Result<(), EtlError> {
        match self.backend.take() {
            Some(backend) => {
                debug!("Closing warehouse connection");
                backend.close().map_err(EtlError::Connection)
            }
            None => Ok(()),
        }
    }
}

impl Warehouse for Connection {
    fn execute(&mut self, statement: &Statement) -> Result<(), EtlError> {
        match self.backend.as_mut() {
            Some(backend) => backend.execute(statement),
            None => unreachable!("connection used after close"),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(backend) = self.backend.take() {
            if let Err(e) = backend.close() {
                warn!("Failed to close warehouse connection: {}", e);
            }
        }
    }
}
