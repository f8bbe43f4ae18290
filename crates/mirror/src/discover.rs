use crate::error::{ErrorKind, Result};
use crate::listing::{Listing, filename};
use crate::{Distro, FetchHandle};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use mirrorhash_archive::Format;
use reqwest::Url;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Folders listed concurrently unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Progress events emitted by [`Discoverer::discover`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, with the number of roots.
/// 2. [`Listed`](Self::Listed) once per folder read, carrying the package
///    URLs first seen on that page.
/// 3. [`Complete`](Self::Complete) exactly once.
///
/// A folder that can't be listed is surfaced as an `Err` item; the stream
/// carries on with the remaining folders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoverEvent {
    Started(usize),
    Listed { folder: Url, packages: Vec<String> },
    Complete { folders: u64, packages: u64 },
}

/// Walks a mirror's directory listings looking for package archives.
#[derive(Clone)]
pub struct Discoverer {
    fetcher: FetchHandle,
    format: Format,
    depth: usize,
    concurrency: usize,
}

impl Discoverer {
    pub fn new(fetcher: FetchHandle, distro: Distro) -> Self {
        Self { fetcher, format: distro.format(), depth: distro.depth(), concurrency: DEFAULT_CONCURRENCY }
    }

    /// Limit how many listings of one level are fetched at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Streams [`DiscoverEvent`]s for every folder below `roots`.
    ///
    /// Each root is walked breadth-first, one folder level at a time, down to
    /// the distribution's layout depth. Packages are reported at every level
    /// and never more than once per call.
    pub fn discover<'a>(&'a self, roots: &'a [String]) -> impl Stream<Item = Result<DiscoverEvent>> + 'a {
        stream!({
            yield Ok(DiscoverEvent::Started(roots.len()));

            let mut seen_folders = HashSet::new();
            let mut seen_packages = HashSet::new();
            let mut level = Vec::new();
            for root in roots {
                match Self::root_url(root) {
                    Ok(url) => {
                        if seen_folders.insert(url.clone()) {
                            level.push((url.clone(), url));
                        }
                    },
                    Err(e) => yield Err(e),
                }
            }

            let (mut folders, mut packages) = (0u64, 0u64);
            for depth in 0..=self.depth {
                let mut next = Vec::new();
                let mut waiting = level.into_iter().map(|(root, folder)| self.list(root, folder));
                let mut processing = FuturesUnordered::new();
                processing.extend(waiting.by_ref().take(self.concurrency));
                while let Some((root, folder, result)) = processing.next().await {
                    if let Some(future) = waiting.next() {
                        processing.push(future);
                    }
                    let listing = match result {
                        Ok(listing) => listing,
                        Err(e) => {
                            yield Err(e);
                            continue;
                        },
                    };
                    folders += 1;
                    let found: Vec<String> = listing
                        .files
                        .into_iter()
                        .filter(|url| self.format.matches(filename(url)))
                        .map(String::from)
                        .filter(|url| seen_packages.insert(url.clone()))
                        .collect();
                    packages += found.len() as u64;
                    if depth < self.depth {
                        for sub in listing.folders {
                            if seen_folders.insert(sub.clone()) {
                                next.push((root.clone(), sub));
                            }
                        }
                    }
                    yield Ok(DiscoverEvent::Listed { folder, packages: found });
                }
                level = next;
            }

            yield Ok(DiscoverEvent::Complete { folders, packages });
        })
    }

    fn root_url(root: &str) -> Result<Url> {
        let mut url = Url::parse(root).or_raise(|| ErrorKind::InvalidUrl(root.to_string()))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    #[instrument(skip_all, fields(folder = %folder))]
    async fn list(&self, root: Url, folder: Url) -> (Url, Url, Result<Listing>) {
        let result = match self.fetcher.fetch(folder.as_str()).await {
            Ok(body) => {
                let listing = Listing::parse(&folder, &root, &String::from_utf8_lossy(&body));
                debug!(folders = listing.folders.len(), files = listing.files.len(), "listed");
                Ok(listing)
            },
            Err(e) => Err(e.raise(ErrorKind::Listing(folder.to_string()))),
        };
        (root, folder, result)
    }
}
