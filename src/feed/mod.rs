//! The product feed engine.
//!
//! Turns user-driven query parameters into a paginated, progressively loaded
//! product list:
//!
//! - [`QueryNormalizer`] - debounces filter edits into request descriptors
//! - [`ResponseCache`] - never-evicting memo of responses per descriptor
//! - [`FeedStore`] - items, loading/error status and the `has_more` flag
//! - [`Prefetcher`] - speculative next-page fetches into the cache
//! - [`FeedEngine`] - wires the above to a [`ProductSource`] and the gesture
//!   triggers, on a single event loop
//!
//! # Example
//!
//! ```ignore
//! use shelf::feed::FeedEngine;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let mut engine = FeedEngine::new(source, &config, tx)?;
//! engine.start();
//! while let Some(event) = rx.recv().await {
//!     engine.handle_event(event);
//! }
//! ```
//!
//! [`ProductSource`]: crate::catalog::ProductSource

mod cache;
mod engine;
mod prefetch;
mod query;
mod store;

pub use cache::ResponseCache;
pub use engine::{FeedEngine, FeedEvent, FetchKind};
pub use prefetch::Prefetcher;
pub use query::QueryNormalizer;
pub use store::{compute_has_more, FeedState, FeedStatus, FeedStore, Settle};
