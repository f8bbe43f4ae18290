//! The worker pool draining a distribution's work queue.
//!
//! Every worker loops over claim, process and complete until the queue has
//! nothing left for this run, the pool is cancelled, or the disk fills up.
//! Item failures are recorded on the item and never stop the pool.

use crate::error::{ErrorKind, Result};
use crate::urls::export_urls;
use crate::worker::Harvester;
use exn::ResultExt;
use mirrorhash_queue::{Outcome, Queue, Tally};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_WORKERS: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolOptions {
    pub workers: usize,
    /// Pause between two progress reports.
    pub progress_interval: Duration,
    /// Where to write the `urls.csv` snapshot, on every progress report and
    /// once more when the pool stops.
    pub snapshot: Option<PathBuf>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self { workers: DEFAULT_WORKERS, progress_interval: Duration::from_secs(30), snapshot: None }
    }
}

/// How a pool run ended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Items hashed and marked DONE during this run.
    pub done: u64,
    /// Items that failed during this run and went back to PENDING.
    pub failed: u64,
    /// Workers that stopped early because the disk was full or they panicked.
    pub retired: usize,
    pub cancelled: bool,
    /// Queue counts once every worker has stopped.
    pub tally: Tally,
}

#[derive(Debug, Default)]
struct WorkerReport {
    done: u64,
    failed: u64,
    retired: bool,
}

pub struct Pool {
    queue: Queue,
    harvester: Harvester,
    options: PoolOptions,
}

impl Pool {
    pub fn new(queue: Queue, harvester: Harvester, options: PoolOptions) -> Self {
        Self { queue, harvester, options }
    }

    /// Drain the queue.
    ///
    /// Items left IN_PROGRESS by an earlier run are put back to PENDING
    /// first. Cancelling `cancel` stops workers from claiming more work; each
    /// finishes the item in hand. Returns an error only if the queue itself
    /// (rather than an item) fails.
    #[instrument(skip_all, fields(run = self.queue.run(), workers = self.options.workers))]
    pub async fn run(self, cancel: CancellationToken) -> Result<Summary> {
        tokio::fs::create_dir_all(self.harvester.temp_root()).await.map_err(ErrorKind::filesystem)?;
        let recovered = self.queue.recover().await.or_raise(|| ErrorKind::Queue)?;
        if recovered > 0 {
            info!(recovered, "requeued items left in progress by an earlier run");
        }

        // Cancelled by a failing worker without touching the caller's token.
        let stop = cancel.child_token();
        let mut workers = JoinSet::new();
        for id in 0..self.options.workers.max(1) {
            workers.spawn(work(id, self.queue.clone(), self.harvester.clone(), stop.clone()));
        }

        let period = self.options.progress_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = Summary::default();
        let mut failure = None;
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(Ok(Ok(report))) => {
                        summary.done += report.done;
                        summary.failed += report.failed;
                        summary.retired += usize::from(report.retired);
                    },
                    Some(Ok(Err(err))) => {
                        let reason = &*err;
                        error!(error = %reason, "worker stopped on a queue failure");
                        stop.cancel();
                        failure.get_or_insert(err);
                    },
                    Some(Err(join)) => {
                        error!(error = %join, "worker panicked");
                        summary.retired += 1;
                    },
                    None => break,
                },
                _ = ticker.tick() => self.report().await,
            }
        }

        self.snapshot().await;
        if let Some(err) = failure {
            return Err(err);
        }
        summary.cancelled = cancel.is_cancelled();
        summary.tally = self.queue.tally().await.or_raise(|| ErrorKind::Queue)?;
        info!(
            done = summary.done,
            failed = summary.failed,
            retired = summary.retired,
            cancelled = summary.cancelled,
            pending = summary.tally.pending,
            "pool stopped"
        );
        Ok(summary)
    }

    async fn report(&self) {
        match self.queue.tally().await {
            Ok(tally) => info!(
                done = tally.done,
                in_progress = tally.in_progress,
                pending = tally.pending,
                failed = tally.failed,
                "progress"
            ),
            Err(err) => {
                let reason = &*err;
                warn!(error = %reason, "could not read queue tally");
            },
        }
        self.snapshot().await;
    }

    async fn snapshot(&self) {
        let Some(path) = &self.options.snapshot else {
            return;
        };
        if let Err(err) = export_urls(&self.queue, path).await {
            let reason = &*err;
            warn!(error = %reason, path = %path.display(), "could not write URL snapshot");
        }
    }
}

#[instrument(skip(queue, harvester, cancel))]
async fn work(id: usize, queue: Queue, harvester: Harvester, cancel: CancellationToken) -> Result<WorkerReport> {
    let mut report = WorkerReport::default();
    while !cancel.is_cancelled() {
        let Some(url) = queue.claim().await.or_raise(|| ErrorKind::Queue)? else {
            debug!("queue drained");
            break;
        };
        match harvester.process(&url).await {
            Ok(processed) => {
                queue.complete(&url, Outcome::Done).await.or_raise(|| ErrorKind::Queue)?;
                report.done += 1;
                info!(
                    url = %url,
                    name = %processed.label.name,
                    version = %processed.label.version,
                    files = processed.files,
                    "hashed"
                );
            },
            Err(err) => {
                let reason = (*err).to_string();
                warn!(url = %url, error = %reason, "item failed");
                queue.complete(&url, Outcome::Failed(reason)).await.or_raise(|| ErrorKind::Queue)?;
                report.failed += 1;
                if err.is_disk_full() {
                    error!("disk is full, retiring worker");
                    report.retired = true;
                    break;
                }
            },
        }
    }
    Ok(report)
}
