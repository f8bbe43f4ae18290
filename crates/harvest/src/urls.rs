//! `urls.csv`: the work queue as a `url,state` table.
//!
//! The database is authoritative; the table is a snapshot for people and
//! other tools, and the format earlier crawls produced, so it can be read
//! back in.

use crate::csv;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use mirrorhash_mirror::Url;
use mirrorhash_queue::{Queue, State};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

pub const URLS_HEADER: &str = "url,state\n";

/// Replace the table at `path` with the current queue contents, returning the
/// number of rows.
///
/// The rows go to a temporary file beside `path` which is renamed over it,
/// so readers see either the old snapshot or the new one.
#[instrument(skip(queue))]
pub async fn export_urls(queue: &Queue, path: &Path) -> Result<usize> {
    let rows = queue.list().await.or_raise(|| ErrorKind::Queue)?;
    let path = path.to_path_buf();
    let count = rows.len();
    tokio::task::spawn_blocking(move || write_snapshot(&path, &rows))
        .await
        .map_err(|err| exn::Exn::from(err).raise(ErrorKind::Task))??;
    Ok(count)
}

fn write_snapshot(path: &Path, rows: &[(String, State)]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(ErrorKind::filesystem)?;
    let file = tempfile::NamedTempFile::new_in(&parent).map_err(ErrorKind::filesystem)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(URLS_HEADER.as_bytes()).map_err(ErrorKind::filesystem)?;
    for (url, state) in rows {
        let code = state.code().to_string();
        writer.write_all(csv::line(&[url.as_str(), code.as_str()]).as_bytes()).map_err(ErrorKind::filesystem)?;
    }
    let file = writer.into_inner().map_err(|err| ErrorKind::filesystem(err.into_error()))?;
    file.as_file().sync_all().map_err(ErrorKind::filesystem)?;
    file.persist(path).map_err(|err| ErrorKind::filesystem(err.error))?;
    Ok(())
}

/// What [`import_urls`] did with each line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows that became new work items.
    pub imported: u64,
    /// Rows whose URL was already queued; their state is left alone.
    pub existing: u64,
    /// Rows that were skipped because they couldn't be understood.
    pub invalid: u64,
}

/// Read a `url,state` table into the queue.
///
/// Rows with state `1` are imported as DONE, any other valid state as
/// PENDING. The header line is optional. Unreadable rows are logged and
/// skipped.
#[instrument(skip(queue))]
pub async fn import_urls(queue: &Queue, path: &Path) -> Result<ImportSummary> {
    let content = tokio::fs::read_to_string(path).await.map_err(ErrorKind::filesystem)?;
    let mut summary = ImportSummary::default();
    for (index, line) in content.lines().enumerate() {
        let number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (url, state) = match parse_row(line) {
            Ok(row) => row,
            Err(_) if index == 0 && line.trim_start().starts_with("url") => continue,
            Err(reason) => {
                let err = ErrorKind::InvalidTable { line: number, reason };
                warn!(error = %err, "skipping row");
                summary.invalid += 1;
                continue;
            },
        };
        if queue.import(&url, state).await.or_raise(|| ErrorKind::Queue)? {
            summary.imported += 1;
        } else {
            summary.existing += 1;
        }
    }
    info!(imported = summary.imported, existing = summary.existing, invalid = summary.invalid, "imported URL table");
    Ok(summary)
}

fn parse_row(line: &str) -> std::result::Result<(String, State), &'static str> {
    let fields = csv::split(line).ok_or("unterminated quote")?;
    let [url, state] = fields.as_slice() else {
        return Err("expected two fields");
    };
    let url = url.trim();
    Url::parse(url).map_err(|_| "invalid URL")?;
    let state = state.parse::<State>().map_err(|_| "state must be -1, 0 or 1")?;
    let state = match state {
        State::Done => State::Done,
        _ => State::Pending,
    };
    Ok((url.to_string(), state))
}
