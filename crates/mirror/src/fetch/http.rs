//! Plain HTTP(S) fetcher.

use super::{Fetch, FetchOptions};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, Response, Url};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// Fetches over HTTP(S) with a connect timeout and an overall timeout.
///
/// Makes exactly one attempt per call; see
/// [`RetryingFetcher`](super::RetryingFetcher).
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(|e| ErrorKind::Client(e.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<Response> {
        let parsed = Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?;
        let response = self.client.get(parsed).send().await.map_err(ErrorKind::request)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<u64> {
        let mut response = self.send(url).await?;
        let mut file = File::create(path).await.map_err(ErrorKind::write)?;
        let mut size = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(ErrorKind::request)? {
            file.write_all(&chunk).await.map_err(ErrorKind::write)?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(ErrorKind::write)?;
        if size == 0 {
            exn::bail!(ErrorKind::EmptyBody);
        }
        Ok(size)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let body = self.send(url).await?.bytes().await.map_err(ErrorKind::request)?;
        if body.is_empty() {
            exn::bail!(ErrorKind::EmptyBody);
        }
        debug!(bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }

    #[instrument(skip(self, path))]
    async fn fetch_to(&self, url: &str, path: &Path) -> Result<u64> {
        let result = self.download(url, path).await;
        if result.is_err() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {},
                Err(e) if e.kind() == IoErrorKind::NotFound => {},
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial download"),
            }
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    pub(crate) type Hits = Arc<Mutex<HashMap<String, usize>>>;
    /// Maps a request path and how many times it has been requested
    /// (starting at 1) to a status code and body.
    pub(crate) type Handler = fn(&str, usize) -> (u16, &'static [u8]);

    /// A minimal HTTP/1.1 server on a random local port, one response per
    /// connection.
    pub(crate) async fn serve(handler: Handler) -> (String, Hits) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits: Hits = Arc::default();
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let mut len = 0;
                while len < buf.len() {
                    let n = socket.read(&mut buf[len..]).await.unwrap_or(0);
                    len += n;
                    if n == 0 || buf[..len].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request = String::from_utf8_lossy(&buf[..len]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let hit = {
                    let mut hits = counter.lock().unwrap();
                    let entry = hits.entry(path.clone()).or_insert(0);
                    *entry += 1;
                    *entry
                };
                let (status, body) = handler(&path, hit);
                let head = format!(
                    "HTTP/1.1 {status} Test\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });
        (base, hits)
    }

    pub(crate) fn hit_count(hits: &Hits, path: &str) -> usize {
        hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    fn routes(path: &str, _hit: usize) -> (u16, &'static [u8]) {
        match path {
            "/ok" => (200, b"hello mirror".as_slice()),
            "/empty" => (200, b"".as_slice()),
            "/broken" => (500, b"oops".as_slice()),
            _ => (404, b"not found".as_slice()),
        }
    }

    fn fetcher() -> HttpFetcher {
        let options = FetchOptions {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
            ..FetchOptions::default()
        };
        HttpFetcher::new(&options).unwrap()
    }

    #[tokio::test]
    async fn test_fetch() {
        let (base, hits) = serve(routes).await;
        let body = fetcher().fetch(&format!("{base}/ok")).await.unwrap();
        assert_eq!(body, b"hello mirror");
        assert_eq!(hit_count(&hits, "/ok"), 1);
    }

    #[tokio::test]
    async fn test_fetch_status_errors() {
        let (base, _) = serve(routes).await;
        let err = fetcher().fetch(&format!("{base}/missing")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Status(404));
        let err = fetcher().fetch(&format!("{base}/broken")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Status(500));
    }

    #[tokio::test]
    async fn test_empty_body_is_an_error() {
        let (base, _) = serve(routes).await;
        let err = fetcher().fetch(&format!("{base}/empty")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyBody);
    }

    #[tokio::test]
    async fn test_fetch_to() {
        let (base, _) = serve(routes).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.deb");
        let size = fetcher().fetch_to(&format!("{base}/ok"), &path).await.unwrap();
        assert_eq!(size, 12);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello mirror");
    }

    #[tokio::test]
    async fn test_fetch_to_removes_partial_file() {
        let (base, _) = serve(routes).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.deb");
        let err = fetcher().fetch_to(&format!("{base}/empty"), &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::EmptyBody);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fetch_to_unwritable_path() {
        let (base, _) = serve(routes).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("pkg.deb");
        let err = fetcher().fetch_to(&format!("{base}/ok"), &path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Write(IoErrorKind::NotFound));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = fetcher().fetch("not a url").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidUrl("not a url".to_string()));
    }
}
