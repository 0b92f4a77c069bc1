//! Cancel-and-reset timer shared by every debounce site in the crate.
//!
//! A [`Debouncer`] holds at most one pending value and the deadline at which
//! it becomes due. Scheduling again discards the pending value and restarts the
//! window. Nothing runs on its own: the owner polls with the current time (the
//! event loop does so when [`Debouncer::deadline`] passes), which keeps the
//! primitive testable under `tokio::time::pause`.

use tokio::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending value with `value`, due `window` after `now`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.window, value));
    }

    /// Drop the pending value without running it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now => self.cancel(),
            _ => None,
        }
    }
}
