//! Product catalog: data model and data sources.
//!
//! The feed engine talks to the catalog exclusively through [`ProductSource`],
//! which maps a [`RequestDescriptor`] to one [`ResponsePage`]. Two sources are
//! provided:
//!
//! - [`MockCatalog`] - a deterministic in-memory catalog with simulated latency
//! - [`HttpCatalog`] - a REST client for `GET {base}/products`, optionally
//!   falling back to another source when the API is unreachable
//!
//! # Example
//!
//! ```ignore
//! use shelf::catalog::{MockCatalog, ProductSource, RequestDescriptor};
//!
//! let catalog = MockCatalog::new();
//! let page = catalog.fetch_products(&RequestDescriptor::default()).await?;
//! assert_eq!(page.products.len(), 12);
//! ```

mod http;
mod mock;
mod types;

use futures::future::BoxFuture;
use thiserror::Error;

pub use http::HttpCatalog;
pub use mock::{MockCatalog, BRANDS, CATEGORIES};
pub use types::{
    FilterPatch, FilterState, Pagination, PriceRange, Product, QueryError, RequestDescriptor,
    ResponsePage, SortKey, DEFAULT_MAX_PRICE, DEFAULT_PAGE_SIZE,
};

/// Errors a data source can report for a single request.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Connection dropped while reading a response body
    #[error("Response body interrupted: {0}")]
    Body(#[source] reqwest::Error),
    /// Body was not a valid `{ products, total }` payload
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Configured base URL is unusable
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    /// Failure reported by a source that has no transport of its own, such as
    /// a test double injecting errors
    #[error("{0}")]
    Unavailable(String),
}

impl SourceError {
    /// True when the request never produced an HTTP response. A body cut off
    /// after the status line is not a connectivity failure.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Timeout(_))
    }
}

/// Future returned by [`ProductSource::fetch_products`].
///
/// Boxed and `'static` so the engine can hand it to `tokio::spawn`.
pub type SourceFuture = BoxFuture<'static, Result<ResponsePage, SourceError>>;

/// The data-source contract.
///
/// Implementations apply, in order: exact category/brand match, inclusive
/// price bounds, the in-stock filter (only when requested), case-insensitive
/// search over name and description, the sort key, the feed-seed rotation and
/// finally the page slice.
pub trait ProductSource: Send + Sync {
    fn fetch_products(&self, request: &RequestDescriptor) -> SourceFuture;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
