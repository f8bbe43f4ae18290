use crate::error::{Error, ErrorKind};
use crate::models::State;
use exn::ResultExt;
use time::UtcDateTime;

/// A package URL and where it stands in the hashing lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub state: State,
    /// The pool run that last claimed the item (0 if never claimed).
    pub run: i64,
    pub attempts: u32,
    pub failures: u32,
    /// Reason for the most recent failure, cleared on success.
    pub last_error: Option<String>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(sqlx::FromRow)]
pub(crate) struct WorkItemRow {
    url: String,
    state: i64,
    run: i64,
    attempts: i64,
    failures: i64,
    last_error: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = Error;
    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            url: row.url,
            state: State::try_from(row.state)?,
            run: row.run,
            attempts: u32::try_from(row.attempts).or_raise(|| ErrorKind::Corrupt("attempts"))?,
            failures: u32::try_from(row.failures).or_raise(|| ErrorKind::Corrupt("failures"))?,
            last_error: row.last_error,
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::Corrupt("creation date"))?,
            updated_at: UtcDateTime::from_unix_timestamp(row.updated_at)
                .or_raise(|| ErrorKind::Corrupt("update date"))?,
        })
    }
}

/// How a claimed item finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every result row was flushed; the item is DONE.
    Done,
    /// The item goes back to PENDING with the given reason.
    Failed(String),
}

/// Item counts per state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub pending: u64,
    pub in_progress: u64,
    pub done: u64,
    /// Pending items that have failed at least once.
    pub failed: u64,
}

impl Tally {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.pending + self.in_progress + self.done
    }
}
