//! Connection pool, pragmas and embedded migrations.

pub mod write_actor;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use sleepsync_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub use write_actor::{spawn_writer, WriteHandle};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Schema of an authority's store (accounts, daily rows, predictions, outbox).
pub const SERVER_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/server");
/// Schema of the client-side buffer.
pub const BUFFER_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/buffer");

#[derive(Debug, Clone)]
pub struct DbOptions {
    /// How long a checkout may wait before the store counts as unreachable.
    pub connection_timeout: Duration,
    pub pool_size: u32,
    pub busy_timeout_ms: u32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            pool_size: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug)]
struct ConnectionCustomizer {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {}; PRAGMA journal_mode = WAL;",
            self.busy_timeout_ms
        ))
        .map_err(r2d2::Error::QueryError)
    }
}

/// Ensures the parent directory of `db_path` exists and returns the path.
pub fn init(db_path: &str) -> Result<String> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Cannot create database directory {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
    }
    Ok(db_path.to_string())
}

/// Builds the pool without opening a connection up front, so an unreachable
/// store surfaces per operation rather than at startup.
pub fn create_pool(db_path: &str, options: &DbOptions) -> Result<Arc<DbPool>> {
    debug!("Creating SQLite pool for {}", db_path);
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(options.pool_size)
        .min_idle(Some(0))
        .connection_timeout(options.connection_timeout)
        .connection_customizer(Box::new(ConnectionCustomizer {
            busy_timeout_ms: options.busy_timeout_ms,
        }))
        .build_unchecked(manager);
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| Error::from(StorageError::Pool(e)))
}

pub fn run_migrations(pool: &DbPool, migrations: EmbeddedMigrations) -> Result<()> {
    let mut conn = get_connection(pool)?;
    let applied = conn
        .run_pending_migrations(migrations)
        .map_err(|e| Error::from(StorageError::Migration(e.to_string())))?;
    if !applied.is_empty() {
        info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// `init` + pool + migrations + writer for one SQLite file.
pub fn open_store(
    db_path: &str,
    options: &DbOptions,
    migrations: EmbeddedMigrations,
) -> Result<(Arc<DbPool>, WriteHandle)> {
    let db_path = init(db_path)?;
    let pool = create_pool(&db_path, options)?;
    run_migrations(&pool, migrations)?;
    let writer = spawn_writer(pool.as_ref().clone());
    Ok((pool, writer))
}
