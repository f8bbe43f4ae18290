//! In-memory fetcher for testing.

use super::Fetch;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Url;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    pages: HashMap<String, Vec<u8>>,
    failures: HashMap<String, usize>,
    requests: HashMap<String, usize>,
}

/// In-memory fetcher for testing.
///
/// Serves a fixed set of URLs; everything else answers `HTTP 404`. Transient
/// failures can be scheduled per URL with [`fail_next()`](Self::fail_next),
/// and every request is counted.
///
/// # Examples
///
/// ```
/// use mirrorhash_mirror::{Fetch, fetch::MockFetcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = MockFetcher::with_pages([
///     ("https://mirror.example/pool/", b"<a href=\"foo.deb\">foo.deb</a>".to_vec()),
/// ]);
/// assert!(fetcher.fetch("https://mirror.example/pool/").await.is_ok());
/// assert!(fetcher.fetch("https://mirror.example/other/").await.is_err());
/// assert_eq!(fetcher.requests("https://mirror.example/pool/"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MockFetcher {
    state: Mutex<State>,
}

impl MockFetcher {
    pub fn with_pages(pages: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let pages = pages.into_iter().map(|(url, body)| (url.into(), body.into())).collect();
        Self { state: Mutex::new(State { pages, ..State::default() }) }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a page.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.lock().pages.insert(url.into(), body.into());
    }

    /// Make the next `times` requests for `url` fail with `HTTP 503`.
    pub fn fail_next(&self, url: impl Into<String>, times: usize) {
        self.lock().failures.insert(url.into(), times);
    }

    /// How many times `url` has been requested.
    pub fn requests(&self, url: &str) -> usize {
        self.lock().requests.get(url).copied().unwrap_or(0)
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>> {
        let mut state = self.lock();
        *state.requests.entry(url.to_string()).or_insert(0) += 1;
        Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
        if let Some(remaining) = state.failures.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            exn::bail!(ErrorKind::Status(503));
        }
        match state.pages.get(url) {
            Some(body) if body.is_empty() => exn::bail!(ErrorKind::EmptyBody),
            Some(body) => Ok(body.clone()),
            None => exn::bail!(ErrorKind::Status(404)),
        }
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.respond(url)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64> {
        let body = self.respond(url)?;
        tokio::fs::write(path, &body).await.map_err(ErrorKind::write)?;
        Ok(body.len() as u64)
    }
}
