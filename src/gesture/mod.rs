//! Input-driven feed triggers.
//!
//! - [`ScrollTrigger`] advances the page when the viewport nears the end
//! - [`PullGesture`] reshuffles the feed on a long enough drag from the top
//!
//! Both are plain state machines fed with the current time; the event loop
//! polls them at their deadlines.

mod pull;
mod scroll;

pub use pull::{PullGesture, PullRelease};
pub use scroll::{ScrollTrigger, TriggerGate};
