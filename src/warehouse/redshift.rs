use super::{Backend, Warehouse};
use crate::catalog::Statement;
use crate::config::{ClusterConfig, SslMode};
use crate::error::{DriverError, EtlError};
use native_tls::TlsConnector;
use postgres::config::SslMode as DriverSslMode;
use postgres::Client;
use postgres_native_tls::MakeTlsConnector;
use tracing::info;

/// The warehouse cluster, reached over the PostgreSQL wire protocol.
pub struct RedshiftWarehouse {
    client: Client,
}

impl RedshiftWarehouse {
    pub fn connect(cluster: &ClusterConfig) -> Result<Self, EtlError> {
        info!(
            "Connecting to {}:{}/{} as {} (sslmode {:?})...",
            cluster.host, cluster.db_port, cluster.db_name, cluster.db_user, cluster.ssl_mode
        );
        let tls = tls_connector(cluster.ssl_mode).map_err(|e| EtlError::Connection(e.into()))?;
        let client = postgres::Config::new()
            .host(&cluster.host)
            .port(cluster.db_port)
            .dbname(&cluster.db_name)
            .user(&cluster.db_user)
            .password(&cluster.db_password)
            .ssl_mode(driver_ssl_mode(cluster.ssl_mode))
            .connect(tls)
            .map_err(|e| EtlError::Connection(e.into()))?;
        Ok(RedshiftWarehouse { client })
    }
}

/// Certificates are only checked in `verify-full`, as libpq does for the
/// other modes.
fn tls_connector(mode: SslMode) -> Result<MakeTlsConnector, native_tls::Error> {
    let mut builder = TlsConnector::builder();
    if mode != SslMode::VerifyFull {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    Ok(MakeTlsConnector::new(builder.build()?))
}

fn driver_ssl_mode(mode: SslMode) -> DriverSslMode {
    match mode {
        SslMode::Disable => DriverSslMode::Disable,
        SslMode::Prefer => DriverSslMode::Prefer,
        SslMode::Require | SslMode::VerifyFull => DriverSslMode::Require,
    }
}

impl Warehouse for RedshiftWarehouse {
    fn execute(&mut self, statement: &Statement) -> Result<(), EtlError> {
        // COPY runs on the cluster itself, copy statements need no special case.
        let mut transaction = self
            .client
            .transaction()
            .map_err(|e| EtlError::statement(statement.name(), e))?;
        transaction
            .batch_execute(statement.text())
            .map_err(|e| EtlError::statement(statement.name(), e))?;
        transaction
            .commit()
            .map_err(|e| EtlError::statement(statement.name(), e))
    }
}

impl Backend for RedshiftWarehouse {
    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.client.close().map_err(DriverError::from)
    }
}
