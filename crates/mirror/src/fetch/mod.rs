//! Fetcher trait and implementations.
//!
//! [`Fetch`] is the one seam between the crawler and the network: listing
//! discovery reads pages through [`fetch()`](Fetch::fetch), workers stream
//! package archives to disk through [`fetch_to()`](Fetch::fetch_to).
//! [`HttpFetcher`] makes a single attempt per call; wrap it in
//! [`RetryingFetcher`] for the bounded retry policy.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod retry;

pub use self::http::HttpFetcher;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockFetcher;
pub use self::retry::RetryingFetcher;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Unified interface for fetching mirror content.
///
/// # Examples
///
/// ```no_run
/// use mirrorhash_mirror::{Fetch, error::Result};
/// use std::path::Path;
///
/// async fn download(fetcher: &dyn Fetch) -> Result<u64> {
///     let url = "https://mirrors.edge.kernel.org/alpine/v3.20/main/x86_64/busybox-1.36.1-r29.apk";
///     fetcher.fetch_to(url, Path::new("/tmp/busybox.apk")).await
/// }
/// ```
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch the complete response body.
    ///
    /// A successful response without a body is an
    /// [`EmptyBody`](crate::error::ErrorKind::EmptyBody) error.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Stream the response body into a file, returning its size in bytes.
    ///
    /// The file is created (or truncated) before the first byte is written.
    /// On failure no partial file is left behind.
    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64>;
}

/// Tuning for [`HttpFetcher`] and [`RetryingFetcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    /// Bound on a whole request, body transfer included.
    pub timeout: Duration,
    /// Total number of attempts, the first one included.
    pub attempts: u32,
    /// Fixed pause between two attempts.
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
            attempts: 3,
            retry_delay: Duration::from_secs(5),
            user_agent: concat!("mirrorhash/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
