mod cli;

use crate::cli::{Cli, Commands};
use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use mirrorhash_config::{Config, Paths};
use mirrorhash_harvest::{Harvester, Pool, PoolOptions, Sink, discover, export_urls, import_urls};
use mirrorhash_mirror::fetch::{HttpFetcher, RetryingFetcher};
use mirrorhash_mirror::{Discoverer, Distro, FetchHandle};
use mirrorhash_queue::{Database, Queue};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Flatten an error tree into a report, keeping the full tree in the debug log.
fn report<E: StdError + Send + Sync + 'static>(err: exn::Exn<E>) -> miette::Report {
    debug!(error = ?err, "command failed");
    miette!("{}", &*err)
}

fn fetcher(config: &Config, cancel: &CancellationToken) -> Result<FetchHandle> {
    let options = config.http.fetch_options();
    let http = HttpFetcher::new(&options).map_err(report)?;
    Ok(Arc::new(RetryingFetcher::new(Arc::new(http), &options).with_cancel(cancel.clone())))
}

async fn open_queue(paths: &Paths) -> Result<(Database, Queue)> {
    tokio::fs::create_dir_all(&paths.dir).await.into_diagnostic()?;
    let db = Database::connect(&paths.queue).await.map_err(report)?;
    let queue = Queue::open(&db).await.map_err(report)?;
    Ok((db, queue))
}

fn interrupted(cancelled: bool) -> &'static str {
    if cancelled { " (interrupted)" } else { "" }
}

async fn run_discover(config: &Config, distro: Distro, dry_run: bool, cancel: &CancellationToken) -> Result<()> {
    let discoverer = Discoverer::new(fetcher(config, cancel)?, distro).with_concurrency(config.discovery.concurrency);
    let roots = config.roots(distro);
    if dry_run {
        let summary = discover(&discoverer, &roots, None, cancel).await.map_err(report)?;
        println!(
            "{distro}: {} packages in {} folders{}",
            summary.found,
            summary.folders,
            interrupted(summary.cancelled)
        );
        return Ok(());
    }

    let paths = config.paths(distro);
    let (db, queue) = open_queue(&paths).await?;
    let summary = discover(&discoverer, &roots, Some(&queue), cancel).await.map_err(report)?;
    export_urls(&queue, &paths.urls).await.map_err(report)?;
    db.close().await;
    println!(
        "{distro}: {} packages found, {} new, {} listings failed{}",
        summary.found,
        summary.inserted,
        summary.failed_listings,
        interrupted(summary.cancelled)
    );
    Ok(())
}

async fn run_hash(config: &Config, distro: Distro, cancel: CancellationToken) -> Result<()> {
    let paths = config.paths(distro);
    let (db, queue) = open_queue(&paths).await?;
    let sink = Sink::open(&paths.packages, &paths.files).await.map_err(report)?;
    let harvester = Harvester::new(fetcher(config, &cancel)?, Arc::new(sink), &paths.temp);
    let options = PoolOptions {
        workers: config.workers,
        progress_interval: Duration::from_secs(config.progress_interval),
        snapshot: Some(paths.urls.clone()),
    };
    let summary = Pool::new(queue, harvester, options).run(cancel).await.map_err(report)?;
    db.close().await;

    if summary.retired > 0 {
        warn!(retired = summary.retired, "some workers stopped early");
    }
    println!(
        "{distro}: {} hashed, {} failed this run; {} done, {} pending ({} failed), {} in progress{}",
        summary.done,
        summary.failed,
        summary.tally.done,
        summary.tally.pending,
        summary.tally.failed,
        summary.tally.in_progress,
        interrupted(summary.cancelled),
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref()).map_err(report)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("interrupted, finishing items in progress; interrupt again to quit now");
        on_interrupt.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted again, quitting");
            std::process::exit(130);
        }
    });

    match cli.command {
        Commands::Distros => {
            for distro in Distro::ALL {
                let format = distro.format();
                println!("{distro} ({format}, {})", format.suffixes().join(" "));
                for root in config.roots(distro) {
                    println!("  {root}");
                }
            }
        },
        Commands::Discover { distro, dry_run } => run_discover(&config, distro, dry_run, &cancel).await?,
        Commands::Hash { distro, workers } => {
            config.workers = workers.unwrap_or(config.workers);
            config.validate().map_err(report)?;
            run_hash(&config, distro, cancel).await?;
        },
        Commands::Run { distro, workers } => {
            config.workers = workers.unwrap_or(config.workers);
            config.validate().map_err(report)?;
            run_discover(&config, distro, false, &cancel).await?;
            if !cancel.is_cancelled() {
                run_hash(&config, distro, cancel).await?;
            }
        },
        Commands::Status { distro, url } => {
            let paths = config.paths(distro);
            if !paths.queue.is_file() {
                return Err(miette!("nothing queued for {distro} yet, run `mirrorhash discover {distro}` first"));
            }
            let (db, queue) = open_queue(&paths).await?;
            match url {
                Some(url) => {
                    let item = queue.get(&url).await.map_err(report)?;
                    db.close().await;
                    let item = item.ok_or_else(|| miette!("{url} is not queued for {distro}"))?;
                    println!("{}: {}", item.url, item.state);
                    println!("  attempts     {} ({} failed)", item.attempts, item.failures);
                    println!("  last run     {}", item.run);
                    println!("  updated      {}", item.updated_at);
                    if let Some(reason) = item.last_error {
                        println!("  last error   {reason}");
                    }
                },
                None => {
                    let tally = queue.tally().await.map_err(report)?;
                    db.close().await;
                    println!("{distro}: {} queued", tally.total());
                    println!("  done         {}", tally.done);
                    println!("  in progress  {}", tally.in_progress);
                    println!("  pending      {} ({} failed at least once)", tally.pending, tally.failed);
                },
            }
        },
        Commands::Export { distro, to } => {
            let paths = config.paths(distro);
            let (db, queue) = open_queue(&paths).await?;
            let target = to.unwrap_or_else(|| paths.urls.clone());
            let rows = export_urls(&queue, &target).await.map_err(report)?;
            db.close().await;
            println!("{distro}: wrote {rows} URLs to {}", target.display());
        },
        Commands::Import { distro, csv } => {
            let paths = config.paths(distro);
            let (db, queue) = open_queue(&paths).await?;
            let summary = import_urls(&queue, &csv).await.map_err(report)?;
            export_urls(&queue, &paths.urls).await.map_err(report)?;
            db.close().await;
            println!(
                "{distro}: {} imported, {} already queued, {} invalid rows",
                summary.imported, summary.existing, summary.invalid
            );
        },
    }
    Ok(())
}
