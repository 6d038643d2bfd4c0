//! Catalog discovery and file fetching for EPO bulk-data products.
//!
//! [`CatalogClient`] turns a product manifest into [`DownloadDescriptor`]s;
//! [`Fetcher`] downloads them under a bounded-concurrency semaphore with
//! retry, checksum-based skip, and cooperative cancellation.

mod catalog;
mod checksum;
mod error;
mod fetcher;
mod filesize;
mod retry;

pub use catalog::{CatalogClient, Delivery, DownloadDescriptor, Item, Product};
pub use checksum::{file_matches, sha1_file};
pub use error::{FetchError, Result};
pub use fetcher::{build_http_client, FetchOptions, Fetcher};
pub use filesize::parse_file_size;
pub use retry::with_retry;
