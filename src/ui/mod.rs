//! Terminal User Interface module.
//!
//! - `loop_runner` - main event loop and terminal management
//! - `input` - keyboard and mouse handling
//! - `render` - frame layout, header and product list
//! - `status` - status bar widget

mod input;
mod loop_runner;
mod render;
mod status;

pub use loop_runner::{run, Action};

/// Pull distance contributed by one terminal row of mouse drag.
pub(crate) const ROW_HEIGHT_PX: f32 = 8.0;
