//! Backend selection: turns the validated `BackendConfig` into a repository.
//!
//! Each backend is compiled in only with its cargo feature (`postgres`,
//! `cassandra`); selecting one that was compiled out is a startup error.

use std::sync::Arc;

use domain::{AlbumRepository, CoreError};
use tracing::info;

use crate::config::BackendConfig;

/// Connect the configured backend. Fails if the store is unreachable.
pub fn connect(cfg: &BackendConfig) -> Result<Arc<dyn AlbumRepository>, CoreError> {
    info!(backend = cfg.name(), "connecting album repository");
    match cfg {
        BackendConfig::Postgres {
            url,
            max_connections,
        } => connect_postgres(url, *max_connections),
        BackendConfig::Cassandra {
            hosts,
            keyspace,
            consistency,
        } => connect_cassandra(hosts, keyspace, consistency),
    }
}

#[cfg(feature = "postgres")]
fn connect_postgres(url: &str, max_connections: u32) -> Result<Arc<dyn AlbumRepository>, CoreError> {
    let mut pg = postgres_adapter::PostgresConfig::new(url);
    pg.max_connections = max_connections;
    Ok(Arc::new(postgres_adapter::PostgresRepo::connect(&pg)?))
}

#[cfg(not(feature = "postgres"))]
fn connect_postgres(_url: &str, _max_connections: u32) -> Result<Arc<dyn AlbumRepository>, CoreError> {
    Err(not_compiled_in("postgres"))
}

#[cfg(feature = "cassandra")]
fn connect_cassandra(
    hosts: &str,
    keyspace: &str,
    consistency: &str,
) -> Result<Arc<dyn AlbumRepository>, CoreError> {
    use cassandra_adapter::{CassandraConfig, CassandraRepo, ConsistencyLevel};

    let consistency = ConsistencyLevel::parse(consistency).ok_or_else(|| {
        CoreError::InvalidArgument(format!("unsupported cassandra consistency '{consistency}'"))
    })?;
    let cfg = CassandraConfig {
        hosts: CassandraConfig::parse_hosts(hosts),
        keyspace: keyspace.to_string(),
        consistency,
        ..CassandraConfig::default()
    };
    Ok(Arc::new(CassandraRepo::connect(&cfg)?))
}

#[cfg(not(feature = "cassandra"))]
fn connect_cassandra(
    _hosts: &str,
    _keyspace: &str,
    _consistency: &str,
) -> Result<Arc<dyn AlbumRepository>, CoreError> {
    Err(not_compiled_in("cassandra"))
}

#[cfg(any(not(feature = "postgres"), not(feature = "cassandra")))]
fn not_compiled_in(name: &str) -> CoreError {
    CoreError::InvalidArgument(format!(
        "DB_BACKEND={name} but api-server was built without the `{name}` feature"
    ))
}
