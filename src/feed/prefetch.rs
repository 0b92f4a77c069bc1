use super::cache::ResponseCache;
use crate::catalog::RequestDescriptor;
use std::collections::HashSet;

/// Tracks speculative next-page fetches.
///
/// A descriptor is prefetched at most once while in flight, and never when
/// the cache already holds it. Results go straight into the cache and never
/// touch the feed.
#[derive(Debug)]
pub struct Prefetcher {
    enabled: bool,
    in_flight: HashSet<RequestDescriptor>,
}

impl Prefetcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            in_flight: HashSet::new(),
        }
    }

    /// Whether `next` is worth requesting now.
    pub fn should_prefetch(&self, next: &RequestDescriptor, cache: &ResponseCache) -> bool {
        self.enabled && !cache.contains(next) && !self.in_flight.contains(next)
    }

    /// Record a started prefetch. Returns false when one is already running.
    pub fn mark(&mut self, descriptor: RequestDescriptor) -> bool {
        self.in_flight.insert(descriptor)
    }

    /// Record a finished prefetch, whatever its outcome.
    pub fn complete(&mut self, descriptor: &RequestDescriptor) {
        self.in_flight.remove(descriptor);
    }

    pub fn is_in_flight(&self, descriptor: &RequestDescriptor) -> bool {
        self.in_flight.contains(descriptor)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
