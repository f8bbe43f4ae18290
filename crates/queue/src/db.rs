use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

// Claims and completions are serialized by the queue; the spare connections
// serve status tallies and URL exports taken while workers are running.
const POOL_SIZE: u32 = 4;
// Sixteen workers hammering one WAL file can hold the write lock for a while.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// The SQLite file backing one distribution's queue.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the queue file at `path` and bring its
    /// schema up to date.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, POOL_SIZE).await
    }

    /// A private queue that vanishes with the value. Every statement shares
    /// one connection because each `:memory:` connection is its own database.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(options().in_memory(true), 1).await
    }

    async fn open(options: SqliteConnectOptions, size: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(size)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Open)?;
        MIGRATOR.run(&pool).await.or_raise(|| ErrorKind::Schema)?;
        debug!(connections = size, "queue database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Flush the WAL and wait for every connection to be returned.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

// Set on the options so every pooled connection gets them, not just the first.
fn options() -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        // A committed claim must survive the process dying; only power loss
        // can cost the last few commits in WAL mode.
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .pragma("temp_store", "memory")
        .pragma("cache_size", "-8192")
}
