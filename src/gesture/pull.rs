use crate::util::Debouncer;
use tokio::time::{Duration, Instant};

/// What a released pull amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRelease {
    /// Past the threshold with nothing in flight: reshuffle the feed.
    Refresh,
    /// Released short of the threshold, or while a fetch was running.
    Cancelled,
    /// No drag was in progress.
    Ignored,
}

/// Pull-to-refresh drag tracking.
///
/// A drag only counts when it starts with the list scrolled to the top. The
/// visual offset is the downward distance scaled by `damping` and capped at
/// `max_offset`; the release decision compares that damped offset against
/// `release_threshold`. After release the offset springs back once the settle
/// timer passes.
#[derive(Debug)]
pub struct PullGesture {
    damping: f32,
    max_offset: f32,
    release_threshold: f32,
    origin: Option<f32>,
    offset: f32,
    settle: Debouncer<()>,
}

impl PullGesture {
    pub fn new(damping: f32, max_offset: f32, release_threshold: f32, settle: Duration) -> Self {
        Self {
            damping,
            max_offset,
            release_threshold,
            origin: None,
            offset: 0.0,
            settle: Debouncer::new(settle),
        }
    }

    /// Begin a drag at `y`. Returns false when the list is not at the top.
    pub fn start(&mut self, y: f32, at_top: bool) -> bool {
        if !at_top {
            self.origin = None;
            return false;
        }
        self.settle.cancel();
        self.origin = Some(y);
        true
    }

    /// Update the drag; returns the new visual offset.
    pub fn drag(&mut self, y: f32) -> f32 {
        let Some(origin) = self.origin else {
            return self.offset;
        };
        let distance = (y - origin).max(0.0);
        self.offset = (distance * self.damping).min(self.max_offset);
        self.offset
    }

    /// End the drag. `busy` is true while any feed fetch is in flight.
    pub fn release(&mut self, busy: bool, now: Instant) -> PullRelease {
        if self.origin.take().is_none() {
            return PullRelease::Ignored;
        }
        self.settle.schedule((), now);

        if self.offset >= self.release_threshold && !busy {
            tracing::debug!(offset = self.offset, "Pull released past threshold");
            PullRelease::Refresh
        } else {
            tracing::debug!(offset = self.offset, busy, "Pull released without refresh");
            PullRelease::Cancelled
        }
    }

    /// Spring the offset back once the settle timer passes. Returns true
    /// when the offset changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.settle.poll(now).is_none() {
            return false;
        }
        let moved = self.offset != 0.0;
        self.offset = 0.0;
        moved
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.settle.deadline()
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    /// Whether releasing now would pass the threshold.
    pub fn is_armed(&self) -> bool {
        self.is_dragging() && self.offset >= self.release_threshold
    }
}
