//! Bounded-retry fetcher decorator.

use super::{Fetch, FetchOptions};
use crate::FetchHandle;
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Wraps another fetcher and retries network failures.
///
/// Up to `attempts` calls are made with a fixed delay in between. Errors
/// that aren't [retryable](ErrorKind::is_retryable) are returned straight
/// away; once the attempts are used up the last failure is raised as
/// [`ErrorKind::Exhausted`]. Cancelling the token given to
/// [`with_cancel`](Self::with_cancel) cuts the wait between attempts short
/// with [`ErrorKind::Cancelled`].
#[derive(Clone)]
pub struct RetryingFetcher {
    inner: FetchHandle,
    attempts: u32,
    delay: Duration,
    cancel: CancellationToken,
}

impl RetryingFetcher {
    pub fn new(inner: FetchHandle, options: &FetchOptions) -> Self {
        Self { inner, attempts: options.attempts.max(1), delay: options.retry_delay, cancel: CancellationToken::new() }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn exhausted(&self, err: Error) -> Error {
        let last = (*err).to_string();
        err.raise(ErrorKind::Exhausted { attempts: self.attempts, last })
    }

    /// Wait out the retry delay, handing `err` back if interrupted first.
    async fn pause(&self, err: Error) -> Result<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                let last = (*err).to_string();
                Err(err.raise(ErrorKind::Cancelled { last }))
            },
            () = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

#[async_trait]
impl Fetch for RetryingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.attempts => return Err(self.exhausted(err)),
                Err(err) => {
                    let reason = &*err;
                    warn!(url, attempt, error = %reason, "fetch failed, retrying");
                    self.pause(err).await?;
                },
            }
            attempt += 1;
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch_to(url, path).await {
                Ok(size) => return Ok(size),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= self.attempts => return Err(self.exhausted(err)),
                Err(err) => {
                    let reason = &*err;
                    warn!(url, attempt, error = %reason, "download failed, retrying");
                    self.pause(err).await?;
                },
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use crate::fetch::http::tests::{hit_count, serve};
    use crate::fetch::HttpFetcher;
    use std::sync::Arc;

    fn options(attempts: u32) -> FetchOptions {
        FetchOptions {
            attempts,
            retry_delay: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            ..FetchOptions::default()
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = Arc::new(MockFetcher::with_pages([("https://mirror.example/a.apk", b"apk".to_vec())]));
        mock.fail_next("https://mirror.example/a.apk", 2);
        let fetcher = RetryingFetcher::new(mock.clone(), &options(3));
        assert_eq!(fetcher.fetch("https://mirror.example/a.apk").await.unwrap(), b"apk");
        assert_eq!(mock.requests("https://mirror.example/a.apk"), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let mock = Arc::new(MockFetcher::default());
        let fetcher = RetryingFetcher::new(mock.clone(), &options(3));
        let err = fetcher.fetch("https://mirror.example/missing.apk").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Exhausted { attempts: 3, last: "HTTP 404".to_string() });
        assert!(!err.is_retryable());
        assert_eq!(mock.requests("https://mirror.example/missing.apk"), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_return_at_once() {
        let mock = Arc::new(MockFetcher::default());
        let fetcher = RetryingFetcher::new(mock.clone(), &options(3));
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidUrl(_)));
        assert_eq!(mock.requests("not a url"), 1);
    }

    #[tokio::test]
    async fn test_interrupt_cuts_retry_wait_short() {
        let mock = Arc::new(MockFetcher::default());
        let cancel = CancellationToken::new();
        let patient = FetchOptions { retry_delay: Duration::from_secs(300), ..options(5) };
        let fetcher = RetryingFetcher::new(mock.clone(), &patient).with_cancel(cancel.clone());

        let interrupt = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
        let err = tokio::time::timeout(Duration::from_secs(10), fetcher.fetch("https://mirror.example/slow.apk"))
            .await
            .expect("retry wait should end on interrupt")
            .unwrap_err();
        interrupt.await.unwrap();
        assert_eq!(*err, ErrorKind::Cancelled { last: "HTTP 404".to_string() });
        assert_eq!(mock.requests("https://mirror.example/slow.apk"), 1);
    }

    fn flaky(path: &str, hit: usize) -> (u16, &'static [u8]) {
        match (path, hit) {
            ("/flaky.deb", 1) => (503, b"busy".as_slice()),
            ("/flaky.deb", _) => (200, b"!<arch>\n".as_slice()),
            _ => (404, b"".as_slice()),
        }
    }

    #[tokio::test]
    async fn test_http_download_with_retry() {
        let (base, hits) = serve(flaky).await;
        let http = Arc::new(HttpFetcher::new(&options(3)).unwrap());
        let fetcher = RetryingFetcher::new(http, &options(3));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flaky.deb");

        let size = fetcher.fetch_to(&format!("{base}/flaky.deb"), &path).await.unwrap();
        assert_eq!(size, 8);
        assert_eq!(hit_count(&hits, "/flaky.deb"), 2);

        let err = fetcher.fetch_to(&format!("{base}/gone.deb"), &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Exhausted { attempts: 3, last: "HTTP 404".to_string() });
        assert_eq!(hit_count(&hits, "/gone.deb"), 3);
        assert!(!path.exists());
    }
}
