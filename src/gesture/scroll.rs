use crate::util::Debouncer;
use tokio::time::{Duration, Instant};

/// Feed conditions under which loading another page makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerGate {
    pub has_more: bool,
    pub loading: bool,
    /// The last fetch failed; paging resumes only on an explicit retry.
    pub failed: bool,
}

impl TriggerGate {
    pub fn is_open(&self) -> bool {
        self.has_more && !self.loading && !self.failed
    }
}

/// Infinite-scroll trigger.
///
/// Arms a one-shot timer when the viewport nears the end of the list. When
/// the timer fires and the gate is still open the trigger latches and reports
/// that the page should advance. The latch holds until the resulting fetch
/// settles, so one approach to the end loads exactly one page.
#[derive(Debug)]
pub struct ScrollTrigger {
    threshold: usize,
    timer: Debouncer<()>,
    latched: bool,
}

impl ScrollTrigger {
    pub fn new(threshold: usize, delay: Duration) -> Self {
        Self {
            threshold,
            timer: Debouncer::new(delay),
            latched: false,
        }
    }

    /// Report the last item index visible in a windowed list.
    pub fn observe_visible(
        &mut self,
        last_visible: usize,
        item_count: usize,
        gate: TriggerGate,
        now: Instant,
    ) -> bool {
        let near_end = item_count > 0 && last_visible + self.threshold >= item_count;
        near_end && self.arm(gate, now)
    }

    /// Report whether the end-of-list sentinel is on screen.
    pub fn observe_sentinel(&mut self, visible: bool, gate: TriggerGate, now: Instant) -> bool {
        visible && self.arm(gate, now)
    }

    fn arm(&mut self, gate: TriggerGate, now: Instant) -> bool {
        if self.latched || self.timer.is_pending() || !gate.is_open() {
            return false;
        }
        tracing::debug!(delay_ms = self.timer.window().as_millis() as u64, "Scroll trigger armed");
        self.timer.schedule((), now);
        true
    }

    /// Returns true when the page should advance now.
    pub fn poll(&mut self, gate: TriggerGate, now: Instant) -> bool {
        if self.timer.poll(now).is_none() {
            return false;
        }
        if !gate.is_open() {
            tracing::debug!(?gate, "Scroll trigger fired but no longer applicable");
            return false;
        }
        self.latched = true;
        true
    }

    /// The fetch started by the last advance finished, successfully or not.
    pub fn on_fetch_settled(&mut self) {
        self.latched = false;
    }

    /// Drop a pending timer, e.g. when the query resets the list.
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.latched = false;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }
}
