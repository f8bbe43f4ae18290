//! Persisted work queue of package URLs.
//!
//! One SQLite database per distribution records every package URL that
//! discovery has found, together with its lifecycle state:
//!
//! - **PENDING** (`-1`): waiting to be hashed (new, or failed previously).
//! - **IN_PROGRESS** (`0`): claimed by a worker.
//! - **DONE** (`1`): every result row has been written. Never revisited.
//!
//! The database is the source of truth for resumption: a crawl that is
//! interrupted at any point can be restarted, and after [`Queue::recover`]
//! no DONE item is hashed twice.

mod db;
pub mod error;
mod models;
mod queue;

pub use crate::db::Database;
pub use crate::models::{Outcome, State, Tally, WorkItem};
pub use crate::queue::Queue;
