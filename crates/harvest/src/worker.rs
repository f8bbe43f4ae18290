//! Processing of a single package URL: fetch, unpack, hash, record.

use crate::error::{ErrorKind, Result};
use crate::hash::{sha256_file, sha256_reader};
use crate::sink::{FileRecord, PackageRecord, Sink};
use mirrorhash_archive::error::ErrorKind as ArchiveErrorKind;
use mirrorhash_archive::{Format, Label, Member, walk};
use mirrorhash_mirror::FetchHandle;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const ARCHIVE_NAME: &str = "archive";

/// What a successfully processed package produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Processed {
    pub label: Label,
    pub sha256: String,
    pub size: u64,
    pub files: usize,
}

/// Everything one package needs, shared by all workers of a pool.
#[derive(Clone)]
pub struct Harvester {
    fetcher: FetchHandle,
    sink: Arc<Sink>,
    temp_root: PathBuf,
}

impl Harvester {
    pub fn new(fetcher: FetchHandle, sink: Arc<Sink>, temp_root: impl Into<PathBuf>) -> Self {
        Self { fetcher, sink, temp_root: temp_root.into() }
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Fetch, unpack and hash one package archive, then durably append its
    /// rows to the result tables.
    ///
    /// The archive is downloaded into a fresh directory under the temp root
    /// which is removed on every exit path, panics included.
    #[instrument(skip(self))]
    pub async fn process(&self, url: &str) -> Result<Processed> {
        let filename = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url).to_string();
        let Some(format) = Format::from_filename(&filename) else {
            exn::bail!(ErrorKind::Extraction(ArchiveErrorKind::UnsupportedFormat(filename)));
        };

        let scratch = tempfile::Builder::new()
            .prefix("item-")
            .tempdir_in(&self.temp_root)
            .map_err(ErrorKind::filesystem)?;
        let archive = scratch.path().join(ARCHIVE_NAME);
        let size = self.fetcher.fetch_to(url, &archive).await.map_err(ErrorKind::network)?;
        debug!(size, "downloaded");

        let (sha256, embedded, files) = tokio::task::spawn_blocking(move || hash_archive(format, &archive))
            .await
            .map_err(|err| exn::Exn::from(err).raise(ErrorKind::Task))??;
        drop(scratch);

        let label = Label::resolve(format, &filename, embedded);
        let package = PackageRecord {
            name: label.name.clone(),
            version: label.version.clone(),
            sha256: sha256.clone(),
            url: url.to_string(),
        };
        self.sink.record(&package, &files).await?;
        Ok(Processed { label, sha256, size, files: files.len() })
    }
}

/// Digest the archive itself, then every regular file inside it.
///
/// Hard links reuse the digest of the file they point at. A path that shows
/// up twice is only hashed the first time.
fn hash_archive(format: Format, archive: &Path) -> Result<(String, Option<Label>, Vec<FileRecord>)> {
    let sha256 = sha256_file(archive).map_err(ErrorKind::filesystem)?;
    let reader = BufReader::new(File::open(archive).map_err(ErrorKind::filesystem)?);

    let mut digests: HashMap<PathBuf, String> = HashMap::new();
    let mut files = Vec::new();
    let embedded = walk(format, reader, |path, member| {
        if digests.contains_key(path) {
            debug!(path = %path.display(), "duplicate member");
            return Ok(());
        }
        let digest = match member {
            Member::File(content) => sha256_reader(content)?,
            Member::HardLink(target) => match digests.get(target) {
                Some(digest) => digest.clone(),
                None => {
                    warn!(path = %path.display(), target = %target.display(), "hard link to unknown member");
                    return Ok(());
                },
            },
        };
        files.push(FileRecord { sha256: digest.clone(), file: path.to_string_lossy().into_owned() });
        digests.insert(path.to_path_buf(), digest);
        Ok(())
    })
    .map_err(ErrorKind::extraction)?;
    Ok((sha256, embedded, files))
}
