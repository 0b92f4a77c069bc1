//! Shared helpers.
//!
//! - [`Debouncer`]: the cancel-and-reset timer behind every debounce site
//! - [`catch_task_panic`]: converts panics in spawned tasks into errors
//! - Text helpers for terminal rendering: width-aware truncation, control
//!   character stripping and price formatting

mod debounce;
mod task;
mod text;

pub use debounce::Debouncer;
pub use task::catch_task_panic;
pub use text::{display_width, format_price, sanitize, truncate_to_width};
