//! Cassandra adapter implementing the `AlbumRepository` port.
//!
//! - Stores albums in the `albums` table of the configured keyspace, keyed by
//!   a client-generated version-1 time UUID (`id uuid PRIMARY KEY` or `timeuuid`).
//! - Ids cross the port as canonical hyphenated text. Anything that does not
//!   parse as a UUID is rejected before a request is sent.
//! - Every request runs at the configured consistency (quorum by default) with
//!   bounded connect/request timeouts and a small retry budget for transient
//!   failures. The driver's own retry policy is disabled so the budget is the
//!   real bound. All statements are idempotent and marked as such.
//! - `update` and `delete` read the key first: CQL `UPDATE` would upsert and
//!   `DELETE` is a silent no-op, while the port promises `NotFound`.
//!
//! Notes:
//! - The domain `AlbumRepository` trait is synchronous. We bridge to the async
//!   driver with `runtime_bridge::Bridge`.

mod retry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::{Album, AlbumId, AlbumRepository, CoreError, NewAlbum};
use runtime_bridge::Bridge;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::errors::{DbError, ExecutionError, RequestAttemptError};
use scylla::policies::retry::FallthroughRetryPolicy;
use scylla::response::query_result::QueryResult;
use scylla::statement::unprepared::Statement;
use scylla::statement::Consistency;
use tracing::{debug, info};
use uuid::Uuid;

use crate::retry::with_retries;

const SELECT_ALL: &str = "SELECT id, title, artist, price, year, image_url, genre FROM albums";
const SELECT_BY_ID: &str =
    "SELECT id, title, artist, price, year, image_url, genre FROM albums WHERE id = ? LIMIT 1";
const SELECT_KEY: &str = "SELECT id FROM albums WHERE id = ? LIMIT 1";
const INSERT: &str =
    "INSERT INTO albums (id, title, artist, price, year, image_url, genre) VALUES (?, ?, ?, ?, ?, ?, ?)";
const UPDATE: &str =
    "UPDATE albums SET title = ?, artist = ?, price = ?, year = ?, image_url = ?, genre = ? WHERE id = ?";
const DELETE: &str = "DELETE FROM albums WHERE id = ?";

/// Non-key columns are nullable in CQL.
type AlbumRow = (
    Uuid,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<i32>,
    Option<String>,
    Option<String>,
);

/// Read/write consistency used for every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyLevel {
    /// Majority of replicas; the production setting.
    Quorum,
    /// A single replica; for single-node test clusters.
    One,
}

impl ConsistencyLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "quorum" => Some(ConsistencyLevel::Quorum),
            "one" => Some(ConsistencyLevel::One),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Quorum => "quorum",
            ConsistencyLevel::One => "one",
        }
    }
}

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::One => Consistency::One,
        }
    }
}

/// Connection and request policy for the wide-column backend.
#[derive(Clone, Debug)]
pub struct CassandraConfig {
    /// Contact points as `host:port`.
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub consistency: ConsistencyLevel,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Total tries per request, including the first.
    pub retry_attempts: u32,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9042".into()],
            keyspace: "motown".into(),
            consistency: ConsistencyLevel::Quorum,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            retry_attempts: 3,
        }
    }
}

impl CassandraConfig {
    /// Split a host list separated by commas and/or whitespace.
    pub fn parse_hosts(raw: &str) -> Vec<String> {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Repository backed by a Cassandra (or ScyllaDB) cluster.
pub struct CassandraRepo {
    session: Session,
    retry_attempts: u32,
    node_id: [u8; 6],
    closed: AtomicBool,
    bridge: Bridge,
}

impl CassandraRepo {
    /// Connect to the cluster and switch to the configured keyspace.
    pub fn connect(config: &CassandraConfig) -> Result<Self, CoreError> {
        if config.hosts.is_empty() {
            return Err(CoreError::InvalidArgument(
                "at least one cassandra host is required".into(),
            ));
        }
        if config.keyspace.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "cassandra keyspace is required".into(),
            ));
        }
        let bridge = Bridge::new()
            .map_err(|e| CoreError::StorageUnavailable(format!("tokio runtime init: {e}")))?;

        let profile = ExecutionProfile::builder()
            .consistency(config.consistency.into())
            .request_timeout(Some(config.request_timeout))
            .retry_policy(Arc::new(FallthroughRetryPolicy::new()))
            .build();
        let session = bridge
            .block_on(
                SessionBuilder::new()
                    .known_nodes(&config.hosts)
                    .use_keyspace(config.keyspace.as_str(), false)
                    .connection_timeout(config.connect_timeout)
                    .default_execution_profile_handle(profile.into_handle())
                    .build(),
            )
            .map_err(|e| {
                CoreError::StorageUnavailable(format!(
                    "failed to connect to cassandra cluster {:?}: {e}",
                    config.hosts
                ))
            })?;
        info!(
            hosts = ?config.hosts,
            keyspace = %config.keyspace,
            consistency = config.consistency.as_str(),
            "cassandra session ready"
        );

        Ok(Self {
            session,
            retry_attempts: config.retry_attempts.max(1),
            node_id: random_node_id(),
            closed: AtomicBool::new(false),
            bridge,
        })
    }

    /// Run one statement under the retry budget.
    fn run<V>(&self, op_name: &str, statement: &str, values: V) -> Result<QueryResult, CoreError>
    where
        V: scylla::serialize::row::SerializeRow + Copy,
    {
        ensure_open(&self.closed)?;
        let mut stmt = Statement::new(statement);
        stmt.set_is_idempotent(true);
        self.bridge
            .block_on(with_retries(op_name, self.retry_attempts, is_transient, || {
                self.session.query_unpaged(stmt.clone(), values)
            }))
            .map_err(|e| CoreError::StorageUnavailable(format!("cassandra {op_name} failed: {e}")))
    }

    fn exists(&self, key: Uuid) -> Result<bool, CoreError> {
        let row = self
            .run("exists", SELECT_KEY, (key,))?
            .into_rows_result()
            .map_err(map_cql_err)?
            .maybe_first_row::<(Uuid,)>()
            .map_err(map_cql_err)?;
        Ok(row.is_some())
    }

    fn next_id(&self) -> Uuid {
        Uuid::now_v1(&self.node_id)
    }
}

impl AlbumRepository for CassandraRepo {
    fn get_all(&self) -> Result<Vec<Album>, CoreError> {
        let rows = self
            .run("get_all", SELECT_ALL, ())?
            .into_rows_result()
            .map_err(map_cql_err)?;
        let albums = rows
            .rows::<AlbumRow>()
            .map_err(map_cql_err)?
            .map(|row| row.map(row_to_album).map_err(map_cql_err))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = albums.len(), "cassandra get_all");
        Ok(albums)
    }

    fn get_by_id(&self, id: &AlbumId) -> Result<Album, CoreError> {
        let key = parse_album_id(id)?;
        self.run("get_by_id", SELECT_BY_ID, (key,))?
            .into_rows_result()
            .map_err(map_cql_err)?
            .maybe_first_row::<AlbumRow>()
            .map_err(map_cql_err)?
            .map(row_to_album)
            .ok_or(CoreError::NotFound)
    }

    fn create(&self, album: &NewAlbum) -> Result<AlbumId, CoreError> {
        let key = self.next_id();
        self.run(
            "create",
            INSERT,
            (
                key,
                album.title.as_str(),
                album.artist.as_str(),
                album.price,
                album.year,
                album.image_url.as_str(),
                album.genre.as_str(),
            ),
        )?;
        debug!(id = %key, "cassandra create ok");
        Ok(AlbumId::new(key.to_string()))
    }

    fn update(&self, album: &Album) -> Result<(), CoreError> {
        let key = parse_album_id(&album.id)?;
        if !self.exists(key)? {
            return Err(CoreError::NotFound);
        }
        self.run(
            "update",
            UPDATE,
            (
                album.title.as_str(),
                album.artist.as_str(),
                album.price,
                album.year,
                album.image_url.as_str(),
                album.genre.as_str(),
                key,
            ),
        )?;
        Ok(())
    }

    fn delete(&self, id: &AlbumId) -> Result<(), CoreError> {
        let key = parse_album_id(id)?;
        if !self.exists(key)? {
            return Err(CoreError::NotFound);
        }
        self.run("delete", DELETE, (key,))?;
        Ok(())
    }

    // Connections are released when the session drops.
    fn close(&self) -> Result<(), CoreError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("cassandra repository closed");
        }
        Ok(())
    }
}

/// Parse a port-level id into the native UUID form. Never touches the network.
pub fn parse_album_id(id: &AlbumId) -> Result<Uuid, CoreError> {
    Uuid::parse_str(id.as_str())
        .map_err(|e| CoreError::InvalidIdentifier(format!("invalid UUID {:?}: {e}", id.as_str())))
}

fn ensure_open(closed: &AtomicBool) -> Result<(), CoreError> {
    if closed.load(Ordering::SeqCst) {
        return Err(CoreError::StorageUnavailable(
            "cassandra repository is closed".into(),
        ));
    }
    Ok(())
}

/// Failures worth another attempt under the retry budget.
fn is_transient(err: &ExecutionError) -> bool {
    match err {
        ExecutionError::ConnectionPoolError(_) | ExecutionError::RequestTimeout(_) => true,
        ExecutionError::LastAttemptError(attempt) => match attempt {
            RequestAttemptError::BrokenConnectionError(_) => true,
            RequestAttemptError::DbError(db, _) => matches!(
                db,
                DbError::Unavailable { .. }
                    | DbError::Overloaded
                    | DbError::IsBootstrapping
                    | DbError::ReadTimeout { .. }
                    | DbError::WriteTimeout { .. }
            ),
            _ => false,
        },
        _ => false,
    }
}

fn map_cql_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::StorageUnavailable(format!("cassandra error: {e}"))
}

// Random node id with the multicast bit set, as RFC 4122 asks when no MAC address is used.
fn random_node_id() -> [u8; 6] {
    let mut node: [u8; 6] = rand::random();
    node[0] |= 0x01;
    node
}

fn row_to_album(row: AlbumRow) -> Album {
    let (id, title, artist, price, year, image_url, genre) = row;
    Album {
        id: AlbumId::new(id.to_string()),
        title: title.unwrap_or_default(),
        artist: artist.unwrap_or_default(),
        price: price.unwrap_or_default(),
        year: year.unwrap_or_default(),
        image_url: image_url.unwrap_or_default(),
        genre: genre.unwrap_or_default(),
    }
}
