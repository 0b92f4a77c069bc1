use crate::catalog::{RequestDescriptor, ResponsePage};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Session-lifetime memo of data-source responses.
///
/// Keyed by the full request descriptor, page included, so every page is an
/// independent entry. Entries are never replaced or evicted: the first page
/// stored under a key is the one every later lookup sees.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<RequestDescriptor, Arc<ResponsePage>>,
    hits: u64,
    misses: u64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, descriptor: &RequestDescriptor) -> Option<Arc<ResponsePage>> {
        match self.entries.get(descriptor) {
            Some(page) => {
                self.hits += 1;
                Some(Arc::clone(page))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert-if-absent. Returns false when the key was already cached.
    pub fn put(&mut self, descriptor: RequestDescriptor, page: Arc<ResponsePage>) -> bool {
        match self.entries.entry(descriptor) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(page);
                true
            }
        }
    }

    /// Membership test that does not count as a lookup.
    pub fn contains(&self, descriptor: &RequestDescriptor) -> bool {
        self.entries.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since the session started.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
