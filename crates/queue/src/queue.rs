//! The work queue: every package URL of a distribution and its state.
//!
//! Each [`Queue`] handle belongs to one pool *run*. A run number is handed
//! out when the queue is opened and stamped onto every item it claims, so an
//! item that fails during a run goes back to PENDING but is not handed out
//! again until the queue is reopened.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Outcome, State, Tally, WorkItem, WorkItemRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

fn now() -> i64 {
    UtcDateTime::now().unix_timestamp()
}

#[derive(Debug, Clone)]
pub struct Queue {
    pool: SqlitePool,
    // Claims and completions from every worker go through here one at a time.
    writer: Arc<Mutex<()>>,
    run: i64,
}

impl Queue {
    /// Open the queue for a new run.
    pub async fn open(db: &Database) -> Result<Self> {
        let pool = db.pool().clone();
        let run: i64 = sqlx::query_scalar(include_str!("../queries/next_run.sql"))
            .fetch_one(&pool)
            .await
            .or_raise(|| ErrorKind::Query)?;
        debug!(run, "opened work queue");
        Ok(Self { pool, writer: Arc::new(Mutex::new(())), run })
    }

    /// The run number stamped onto items claimed through this handle.
    pub fn run(&self) -> i64 {
        self.run
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Add a URL as PENDING.
    ///
    /// Returns `false` if the URL was already queued, in which case its state
    /// is left untouched.
    pub async fn insert(&self, url: impl AsRef<str>) -> Result<bool> {
        self.insert_with_state(url.as_ref(), State::Pending).await
    }

    /// Add many URLs as PENDING in a single transaction, returning how many
    /// were new.
    #[instrument(skip_all)]
    pub async fn insert_many<I, S>(&self, urls: I) -> Result<u64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _guard = self.writer.lock().await;
        let now = now();
        let mut inserted = 0;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Query)?;
        for url in urls {
            let result = sqlx::query(include_str!("../queries/insert.sql"))
                .bind(url.as_ref())
                .bind(State::Pending.code())
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Query)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.or_raise(|| ErrorKind::Query)?;
        Ok(inserted)
    }

    /// Add a URL with a known state, as read back from an exported URL list.
    ///
    /// An item that was in progress when it was exported is queued as
    /// PENDING, since nothing is working on it any more.
    pub async fn import(&self, url: impl AsRef<str>, state: State) -> Result<bool> {
        let state = match state {
            State::InProgress => State::Pending,
            other => other,
        };
        self.insert_with_state(url.as_ref(), state).await
    }

    async fn insert_with_state(&self, url: &str, state: State) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let now = now();
        let result = sqlx::query(include_str!("../queries/insert.sql"))
            .bind(url)
            .bind(state.code())
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Atomically move the oldest claimable PENDING item to IN_PROGRESS.
    ///
    /// Returns `None` once nothing is left for this run.
    pub async fn claim(&self) -> Result<Option<String>> {
        let _guard = self.writer.lock().await;
        sqlx::query_scalar(include_str!("../queries/claim.sql"))
            .bind(self.run)
            .bind(now())
            .bind(self.run)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)
    }

    /// Finish a claimed item.
    ///
    /// Only call with [`Outcome::Done`] once every result row for the item is
    /// durably written. Returns [`ErrorKind::NotInProgress`] if the item was
    /// not claimed.
    pub async fn complete(&self, url: impl AsRef<str>, outcome: Outcome) -> Result<()> {
        let url = url.as_ref();
        let _guard = self.writer.lock().await;
        let query = match &outcome {
            Outcome::Done => sqlx::query(include_str!("../queries/complete_done.sql")).bind(now()),
            Outcome::Failed(reason) => sqlx::query(include_str!("../queries/complete_failed.sql"))
                .bind(reason.as_str())
                .bind(now()),
        };
        let result = query.bind(url).execute(&self.pool).await.or_raise(|| ErrorKind::Query)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotInProgress(url.to_string()));
        }
        Ok(())
    }

    /// Put every IN_PROGRESS item back to PENDING.
    ///
    /// Items are only left in progress by a run that died before finishing
    /// them, so call this before starting workers.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<u64> {
        let _guard = self.writer.lock().await;
        let result = sqlx::query(include_str!("../queries/recover.sql"))
            .bind(now())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, url: impl AsRef<str>) -> Result<Option<WorkItem>> {
        let row: Option<WorkItemRow> = sqlx::query_as(include_str!("../queries/get.sql"))
            .bind(url.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)?;
        row.map(WorkItem::try_from).transpose()
    }

    pub async fn tally(&self) -> Result<Tally> {
        let (pending, in_progress, done, failed): (i64, i64, i64, i64) =
            sqlx::query_as(include_str!("../queries/tally.sql"))
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Query)?;
        let count = |n: i64| u64::try_from(n).or_raise(|| ErrorKind::Corrupt("count"));
        Ok(Tally { pending: count(pending)?, in_progress: count(in_progress)?, done: count(done)?, failed: count(failed)? })
    }

    /// Every queued URL with its state, in insertion order.
    pub async fn list(&self) -> Result<Vec<(String, State)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(include_str!("../queries/list.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Query)?;
        rows.into_iter().map(|(url, code)| Ok((url, State::try_from(code)?))).collect()
    }
}
