//! End-to-end runs against an in-memory mirror and an on-disk queue.

use mirrorhash_archive::Label;
use mirrorhash_archive::fixtures::{self, Node};
use mirrorhash_compress::Compression;
use mirrorhash_harvest::hash::{DIGEST_LEN, sha256_hex};
use mirrorhash_harvest::{Harvester, Pool, PoolOptions, Sink, discover, export_urls};
use mirrorhash_mirror::fetch::MockFetcher;
use mirrorhash_mirror::{Discoverer, Distro};
use mirrorhash_queue::{Database, Outcome, Queue, State};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const FOO_URL: &str = "https://mirror.example/ubuntu/pool/main/f/foo/foo_1.2.3_amd64.deb";
const GONE_URL: &str = "https://mirror.example/ubuntu/pool/main/g/gone/gone_1.0_amd64.deb";

const FOO_TREE: &[Node<'static>] = &[
    Node::Dir("./usr/"),
    Node::File("./usr/bin/foo", b"#!/bin/sh\necho foo\n"),
    Node::File("./usr/share/doc/foo/copyright", b"MIT"),
    Node::Symlink("./usr/bin/foo-link", "foo"),
    Node::File("./etc/foo.conf", b"verbose = true\n"),
];

struct Mirror {
    dir: TempDir,
    fetcher: Arc<MockFetcher>,
}

impl Mirror {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap(), fetcher: Arc::new(MockFetcher::default()) }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Open the queue as a fresh process would.
    async fn queue(&self) -> (Database, Queue) {
        let db = Database::connect(self.path("queue.db")).await.unwrap();
        let queue = Queue::open(&db).await.unwrap();
        (db, queue)
    }

    async fn pool(&self, queue: Queue) -> Pool {
        let sink = Sink::open(self.path("packages.csv"), self.path("files.csv")).await.unwrap();
        let harvester = Harvester::new(self.fetcher.clone(), Arc::new(sink), self.path("tmp"));
        let options = PoolOptions { workers: 4, snapshot: Some(self.path("urls.csv")), ..PoolOptions::default() };
        Pool::new(queue, harvester, options)
    }

    async fn hash(&self) -> mirrorhash_harvest::Summary {
        let (db, queue) = self.queue().await;
        let summary = self.pool(queue).await.run(CancellationToken::new()).await.unwrap();
        db.close().await;
        summary
    }

    fn rows(&self, table: &str) -> Vec<Vec<String>> {
        let content = std::fs::read_to_string(self.path(table)).unwrap_or_default();
        content.lines().skip(1).map(|line| line.split(',').map(str::to_string).collect()).collect()
    }
}

fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_LEN && value.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_debian_package_is_hashed() {
    let mirror = Mirror::new();
    let bytes = fixtures::deb(FOO_TREE, Compression::Xz);
    mirror.fetcher.insert(FOO_URL, bytes.clone());
    let (_db, queue) = mirror.queue().await;
    queue.insert(FOO_URL).await.unwrap();

    let summary = mirror.hash().await;
    assert_eq!(summary.done, 1);

    let packages = mirror.rows("packages.csv");
    assert_eq!(packages, vec![vec!["foo".to_string(), "1.2.3".to_string(), sha256_hex(&bytes), FOO_URL.to_string()]]);
    assert!(is_digest(&packages[0][2]));

    let mut files = mirror.rows("files.csv");
    files.sort();
    assert_eq!(files.len(), 3);
    let expected = [
        ("etc/foo.conf", &b"verbose = true\n"[..]),
        ("usr/bin/foo", &b"#!/bin/sh\necho foo\n"[..]),
        ("usr/share/doc/foo/copyright", &b"MIT"[..]),
    ];
    for (row, (path, content)) in files.iter().zip(expected) {
        let expected = vec![
            "foo".to_string(),
            "1.2.3".to_string(),
            sha256_hex(content),
            path.to_string(),
            FOO_URL.to_string(),
        ];
        assert_eq!(row, &expected);
    }

    let snapshot = std::fs::read_to_string(mirror.path("urls.csv")).unwrap();
    assert_eq!(snapshot, format!("url,state\n{FOO_URL},1\n"));
}

#[tokio::test]
async fn test_missing_package_stays_pending_without_rows() {
    let mirror = Mirror::new();
    let (_db, queue) = mirror.queue().await;
    queue.insert(GONE_URL).await.unwrap();

    let summary = mirror.hash().await;
    assert_eq!(summary.failed, 1);
    assert!(mirror.rows("packages.csv").is_empty());
    assert!(mirror.rows("files.csv").is_empty());

    let (_db, queue) = mirror.queue().await;
    let item = queue.get(GONE_URL).await.unwrap().unwrap();
    assert_eq!(item.state, State::Pending);
    assert!(item.last_error.is_some());
    let snapshot = std::fs::read_to_string(mirror.path("urls.csv")).unwrap();
    assert_eq!(snapshot, format!("url,state\n{GONE_URL},-1\n"));
}

#[tokio::test]
async fn test_done_items_are_never_refetched() {
    let mirror = Mirror::new();
    mirror.fetcher.insert(FOO_URL, fixtures::deb(FOO_TREE, Compression::Gzip));
    let (_db, queue) = mirror.queue().await;
    queue.insert(FOO_URL).await.unwrap();

    assert_eq!(mirror.hash().await.done, 1);
    assert_eq!(mirror.hash().await.done, 0);
    assert_eq!(mirror.fetcher.requests(FOO_URL), 1);
    assert_eq!(mirror.rows("packages.csv").len(), 1);
}

#[tokio::test]
async fn test_failed_items_are_retried_by_the_next_run() {
    let mirror = Mirror::new();
    mirror.fetcher.insert(FOO_URL, fixtures::deb(FOO_TREE, Compression::Zstd));
    mirror.fetcher.fail_next(FOO_URL, 1);
    let (_db, queue) = mirror.queue().await;
    queue.insert(FOO_URL).await.unwrap();

    let first = mirror.hash().await;
    assert_eq!((first.done, first.failed), (0, 1));
    let second = mirror.hash().await;
    assert_eq!((second.done, second.failed), (1, 0));

    let (_db, queue) = mirror.queue().await;
    let item = queue.get(FOO_URL).await.unwrap().unwrap();
    assert_eq!(item.state, State::Done);
    assert_eq!(item.attempts, 2);
    assert_eq!(item.failures, 1);
}

#[tokio::test]
async fn test_item_left_in_progress_is_recovered() {
    let mirror = Mirror::new();
    mirror.fetcher.insert(FOO_URL, fixtures::deb(FOO_TREE, Compression::Gzip));
    {
        // A run that claimed the item and died before completing it.
        let (db, queue) = mirror.queue().await;
        queue.insert(FOO_URL).await.unwrap();
        assert_eq!(queue.claim().await.unwrap().as_deref(), Some(FOO_URL));
        db.close().await;
    }

    let summary = mirror.hash().await;
    assert_eq!(summary.done, 1);
    let (_db, queue) = mirror.queue().await;
    assert_eq!(queue.get(FOO_URL).await.unwrap().unwrap().state, State::Done);
}

#[tokio::test]
async fn test_completing_an_unclaimed_item_is_refused() {
    let mirror = Mirror::new();
    let (_db, queue) = mirror.queue().await;
    queue.insert(FOO_URL).await.unwrap();
    assert!(queue.complete(FOO_URL, Outcome::Done).await.is_err());
    assert_eq!(queue.get(FOO_URL).await.unwrap().unwrap().state, State::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_format_is_hashed() {
    let tree: &[Node<'static>] = &[
        Node::Dir("usr/"),
        Node::File("usr/lib/libfoo.so.1", b"\x7fELF"),
        Node::HardLink("usr/lib/libfoo.so.1.0", "usr/lib/libfoo.so.1"),
    ];
    let packages = [
        (
            "https://mirror.example/rocky/Packages/f/foo-2.0-1.el9.x86_64.rpm",
            fixtures::rpm(&Label::new("foo", "2.0"), "1.el9", tree, Compression::Xz),
            ("foo", "2.0-1.el9"),
        ),
        ("https://mirror.example/alpine/foo-2.0-r3.apk", fixtures::apk(tree), ("foo", "2.0-r3")),
        ("https://mirror.example/arch/foo-2.0-1-x86_64.pkg.tar.zst", fixtures::arch(tree), ("foo", "2.0-1")),
        (
            "https://mirror.example/debian/pool/main/f/foo/foo_2.0-1_amd64.deb",
            fixtures::deb(tree, Compression::Bzip2),
            ("foo", "2.0-1"),
        ),
    ];
    let mirror = Mirror::new();
    let (_db, queue) = mirror.queue().await;
    for (url, bytes, _) in &packages {
        mirror.fetcher.insert(*url, bytes.clone());
        queue.insert(*url).await.unwrap();
    }

    let summary = mirror.hash().await;
    assert_eq!(summary.done, 4);
    assert_eq!(summary.failed, 0);

    let rows = mirror.rows("packages.csv");
    let files = mirror.rows("files.csv");
    let digest = sha256_hex(b"\x7fELF");
    for (url, _, (name, version)) in &packages {
        let package = rows.iter().find(|row| row[3] == *url).unwrap();
        assert_eq!((package[0].as_str(), package[1].as_str()), (*name, *version));
        let mut paths: Vec<&str> = files
            .iter()
            .filter(|row| row[4] == *url)
            .inspect(|row| assert_eq!(row[2], digest))
            .map(|row| row[3].as_str())
            .collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["usr/lib/libfoo.so.1", "usr/lib/libfoo.so.1.0"]);
    }
}

#[tokio::test]
async fn test_corrupt_package_is_left_pending() {
    let mirror = Mirror::new();
    let url = "https://mirror.example/alpine/broken-1.0-r0.apk";
    mirror.fetcher.insert(url, b"<html>Service Unavailable</html>".to_vec());
    let (_db, queue) = mirror.queue().await;
    queue.insert(url).await.unwrap();

    let summary = mirror.hash().await;
    assert_eq!(summary.failed, 1);
    let (_db, queue) = mirror.queue().await;
    let item = queue.get(url).await.unwrap().unwrap();
    assert_eq!(item.state, State::Pending);
    assert!(item.last_error.unwrap().starts_with("extraction error"));
    assert!(mirror.rows("packages.csv").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_discover_then_hash() {
    let root = "https://mirror.example/ubuntu/pool/main/";
    let mirror = Mirror::new();
    let fetcher = &mirror.fetcher;
    fetcher.insert(root, r#"<a href="../">../</a><a href="f/">f/</a><a href="g/">g/</a>"#);
    fetcher.insert(format!("{root}f/"), r#"<a href="/ubuntu/pool/main/">Parent</a><a href="foo/">foo/</a>"#);
    fetcher.insert(format!("{root}g/"), r#"<a href="gone/">gone/</a>"#);
    fetcher.insert(
        format!("{root}f/foo/"),
        r#"<a href="foo_1.2.3_amd64.deb">deb</a><a href="foo_1.2.3.dsc">dsc</a><a href="foo_1.2.3.tar.xz">src</a>"#,
    );
    fetcher.insert(format!("{root}g/gone/"), r#"<a href="gone_1.0_amd64.deb">deb</a>"#);
    fetcher.insert(FOO_URL, fixtures::deb(FOO_TREE, Compression::Gzip));

    let discoverer = Discoverer::new(mirror.fetcher.clone(), Distro::Ubuntu);
    let roots = [root.to_string()];
    let (db, queue) = mirror.queue().await;
    let first = discover(&discoverer, &roots, Some(&queue), &CancellationToken::new()).await.unwrap();
    assert_eq!((first.folders, first.found, first.inserted), (5, 2, 2));
    let again = discover(&discoverer, &roots, Some(&queue), &CancellationToken::new()).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(export_urls(&queue, &mirror.path("urls.csv")).await.unwrap(), 2);
    let snapshot = std::fs::read_to_string(mirror.path("urls.csv")).unwrap();
    let mut lines: Vec<&str> = snapshot.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![format!("{FOO_URL},-1"), format!("{GONE_URL},-1"), "url,state".to_string()]);
    db.close().await;

    let summary = mirror.hash().await;
    assert_eq!((summary.done, summary.failed), (1, 1));
    let snapshot = std::fs::read_to_string(mirror.path("urls.csv")).unwrap();
    assert!(snapshot.contains(&format!("{FOO_URL},1\n")));
    assert!(snapshot.contains(&format!("{GONE_URL},-1\n")));
    assert_eq!(mirror.rows("files.csv").len(), 3);
    assert!(mirror.path("tmp").read_dir().unwrap().next().is_none());
}
