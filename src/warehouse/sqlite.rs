use super::local_copy::copy_into;
use super::{Backend, Warehouse};
use crate::catalog::Statement;
use crate::error::{DriverError, EtlError};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// An embedded SQLite file standing in for the cluster. Staging loads are
/// read from the local filesystem.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    pub fn open<T: AsRef<Path>>(db_path: T) -> Result<Self, EtlError> {
        info!("Opening local warehouse at {:?}...", db_path.as_ref());
        let conn = Connection::open(db_path).map_err(|e| EtlError::Connection(e.into()))?;
        Ok(SqliteWarehouse { conn })
    }
}

impl Warehouse for SqliteWarehouse {
    fn execute(&mut self, statement: &Statement) -> Result<(), EtlError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| EtlError::statement(statement.name(), e))?;
        match statement.copy_spec() {
            Some(spec) => {
                copy_into(&tx, spec).map_err(|e| EtlError::statement(statement.name(), e))?;
            }
            None => tx
                .execute_batch(statement.text())
                .map_err(|e| EtlError::statement(statement.name(), e))?,
        }
        tx.commit()
            .map_err(|e| EtlError::statement(statement.name(), e))
    }
}

impl Backend for SqliteWarehouse {
    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_, e)| DriverError::from(e))
    }
}
