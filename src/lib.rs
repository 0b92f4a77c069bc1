//! `shelf`: a terminal catalog browser built on a paginated, prefetching
//! product feed engine.
//!
//! - [`catalog`] - product model and data sources
//! - [`feed`] - the feed engine: query debounce, response cache, feed store
//!   and prefetch
//! - [`gesture`] - infinite-scroll and pull-to-refresh triggers
//! - [`render`] - direct vs. windowed list selection
//! - [`ui`] - the ratatui front end

pub mod app;
pub mod catalog;
pub mod config;
pub mod feed;
pub mod gesture;
pub mod render;
pub mod ui;
pub mod util;
