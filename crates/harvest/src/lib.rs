//! Hashing packages and recording the results.
//!
//! - [`discover`]: seed a [`Queue`](mirrorhash_queue::Queue) from a mirror's
//!   directory listings.
//! - [`Pool`]: drain the queue with a bounded set of workers, each running a
//!   [`Harvester`] over one package URL at a time.
//! - [`Sink`]: the append-only `packages.csv` and `files.csv` tables.
//! - [`export_urls`] and [`import_urls`]: the queue as a `url,state` table.

mod csv;
pub mod error;
pub mod hash;
mod pool;
mod seed;
mod sink;
mod urls;
mod worker;

pub use crate::pool::{DEFAULT_WORKERS, Pool, PoolOptions, Summary};
pub use crate::seed::{DiscoverSummary, discover};
pub use crate::sink::{FILES_HEADER, FileRecord, PACKAGES_HEADER, PackageRecord, Sink};
pub use crate::urls::{ImportSummary, URLS_HEADER, export_urls, import_urls};
pub use crate::worker::{Harvester, Processed};
