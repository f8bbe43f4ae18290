//! Seeding the work queue from a mirror's directory listings.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use mirrorhash_mirror::{DiscoverEvent, Discoverer};
use mirrorhash_queue::Queue;
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiscoverSummary {
    /// Folder listings read.
    pub folders: u64,
    /// Distinct package URLs seen.
    pub found: u64,
    /// Package URLs that were not queued before.
    pub inserted: u64,
    /// Listings (or roots) that could not be read.
    pub failed_listings: u64,
    /// Stopped early by `cancel`; the counts cover what was read until then.
    pub cancelled: bool,
}

/// Walk `roots` and queue every package URL found.
///
/// Without a queue nothing is written and only the counts are reported. A
/// listing that can't be fetched is logged and skipped. Once `cancel` fires
/// no further listing is read; packages already listed stay queued.
#[instrument(skip_all, fields(roots = roots.len(), dry_run = queue.is_none()))]
pub async fn discover(
    discoverer: &Discoverer,
    roots: &[String],
    queue: Option<&Queue>,
    cancel: &CancellationToken,
) -> Result<DiscoverSummary> {
    let mut summary = DiscoverSummary::default();
    let mut events = pin!(discoverer.discover(roots));
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                summary.cancelled = true;
                break;
            },
            event = events.next() => event,
        };
        let Some(event) = event else {
            break;
        };
        match event {
            Ok(DiscoverEvent::Started(roots)) => debug!(roots, "discovery started"),
            Ok(DiscoverEvent::Listed { folder, packages }) => {
                summary.folders += 1;
                summary.found += packages.len() as u64;
                if let Some(queue) = queue
                    && !packages.is_empty()
                {
                    summary.inserted += queue.insert_many(&packages).await.or_raise(|| ErrorKind::Queue)?;
                }
                debug!(folder = %folder, packages = packages.len(), "folder listed");
            },
            Ok(DiscoverEvent::Complete { folders, packages }) => debug!(folders, packages, "listings exhausted"),
            Err(err) => {
                let reason = &*err;
                warn!(error = %reason, "skipping listing");
                summary.failed_listings += 1;
            },
        }
    }
    info!(
        folders = summary.folders,
        found = summary.found,
        inserted = summary.inserted,
        failed = summary.failed_listings,
        cancelled = summary.cancelled,
        "discovery finished"
    );
    Ok(summary)
}
