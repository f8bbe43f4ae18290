//! Append-only result tables.
//!
//! `packages.csv` gets one row per hashed archive and `files.csv` one row per
//! regular file inside it. Both only ever grow: the header is written when
//! the file is created and each batch of rows goes out in one blocking
//! `write_all` under the table lock, synced before [`Sink::record`] returns.
//! The async file types would split a large batch into several writes, which
//! a reader tailing the table could observe as a torn line.

use crate::csv;
use crate::error::{ErrorKind, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub const PACKAGES_HEADER: &str = "name,version,sha256,url\n";
pub const FILES_HEADER: &str = "name,version,sha256,file,url\n";

/// The result of hashing one package archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub sha256: String,
    pub url: String,
}

/// One regular file inside a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub sha256: String,
    /// Path relative to the extraction root.
    pub file: String,
}

struct Table {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl Table {
    async fn open(path: &Path, header: &'static str) -> Result<Self> {
        let owned = path.to_path_buf();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&owned)
                .map_err(ErrorKind::filesystem)?;
            if file.metadata().map_err(ErrorKind::filesystem)?.len() == 0 {
                file.write_all(header.as_bytes()).map_err(ErrorKind::filesystem)?;
                file.sync_data().map_err(ErrorKind::filesystem)?;
            }
            Ok(file)
        })
        .await
        .map_err(|err| exn::Exn::from(err).raise(ErrorKind::Task))??;
        Ok(Self { path: path.to_path_buf(), file: Arc::new(Mutex::new(file)) })
    }

    async fn append(&self, batch: String) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let bytes = batch.len();
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || -> Result<()> {
            // Nothing but whole-batch writes happens under the lock.
            let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
            file.write_all(batch.as_bytes()).map_err(ErrorKind::filesystem)?;
            file.sync_data().map_err(ErrorKind::filesystem)
        })
        .await
        .map_err(|err| exn::Exn::from(err).raise(ErrorKind::Task))??;
        debug!(table = %self.path.display(), bytes, "appended");
        Ok(())
    }
}

pub struct Sink {
    packages: Table,
    files: Table,
}

impl Sink {
    /// Open (creating if needed) both result tables.
    pub async fn open(packages: impl AsRef<Path>, files: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            packages: Table::open(packages.as_ref(), PACKAGES_HEADER).await?,
            files: Table::open(files.as_ref(), FILES_HEADER).await?,
        })
    }

    /// Durably append a package and its files.
    ///
    /// File rows go first: a package row in `packages.csv` means every one of
    /// its file rows is already on disk.
    pub async fn record(&self, package: &PackageRecord, files: &[FileRecord]) -> Result<()> {
        let mut batch = String::new();
        for file in files {
            batch.push_str(&csv::line(&[
                package.name.as_str(),
                package.version.as_str(),
                file.sha256.as_str(),
                file.file.as_str(),
                package.url.as_str(),
            ]));
        }
        self.files.append(batch).await?;
        let row = csv::line(&[
            package.name.as_str(),
            package.version.as_str(),
            package.sha256.as_str(),
            package.url.as_str(),
        ]);
        self.packages.append(row).await
    }
}
