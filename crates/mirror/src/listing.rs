//! Directory listing parser.
//!
//! Mirrors serve their trees as autoindex HTML pages (Apache, nginx,
//! lighttpd). Every `a[href]` on such a page is either a subfolder (ending
//! in `/`) or a file.

use reqwest::Url;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Links found on one listing page, resolved against the page URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub folders: Vec<Url>,
    pub files: Vec<Url>,
}

impl Listing {
    /// Parse a listing page.
    ///
    /// Relative and absolute hrefs are resolved against `page`; only links
    /// that land strictly below both `root` and `page` survive. Navigation
    /// links (`../`, `./`), sort-order links (`?C=N;O=D`) and fragments are
    /// dropped.
    pub fn parse(page: &Url, root: &Url, html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut listing = Self::default();
        for anchor in document.select(&LINK_SELECTOR) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            let Some(url) = resolve(page, root, href) else {
                continue;
            };
            let list = if url.path().ends_with('/') { &mut listing.folders } else { &mut listing.files };
            if !list.contains(&url) {
                list.push(url);
            }
        }
        listing
    }
}

/// The final path segment of a URL (without a trailing slash).
pub fn filename(url: &Url) -> &str {
    url.path().trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn resolve(page: &Url, root: &Url, href: &str) -> Option<Url> {
    if href.is_empty()
        || matches!(href, "." | ".." | "./" | "../")
        || href.contains(['?', '#'])
    {
        return None;
    }
    let url = page.join(href).ok()?;
    let below_root = url.scheme() == root.scheme()
        && url.host_str() == root.host_str()
        && url.port_or_known_default() == root.port_or_known_default()
        && url.path().starts_with(root.path())
        && url.path().len() > root.path().len();
    // A link back up to the page itself (or one of its parents) would loop.
    let below_page = !page.path().starts_with(url.path());
    (below_root && below_page).then_some(url)
}
