//! Package mirror access.
//!
//! - [`fetch`]: the [`Fetch`] seam with an HTTP implementation, a bounded
//!   retry decorator and (behind the `mock` feature) an in-memory fetcher.
//! - [`Discoverer`]: walks a distribution's directory listings and reports
//!   every package archive URL it finds.
//! - [`Distro`]: the supported distributions, their default mirror roots
//!   and their listing layout.

mod discover;
mod distro;
pub mod error;
pub mod fetch;
mod listing;

pub use crate::discover::{DEFAULT_CONCURRENCY, DiscoverEvent, Discoverer};
pub use crate::distro::Distro;
pub use crate::fetch::{Fetch, FetchOptions};
pub use crate::listing::{Listing, filename};
pub use reqwest::Url;
use std::sync::Arc;

pub type FetchHandle = Arc<dyn Fetch + Send + Sync>;
