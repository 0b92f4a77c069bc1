use crate::catalog::{FilterPatch, FilterState, QueryError, RequestDescriptor, SortKey};
use crate::util::Debouncer;
use tokio::time::{Duration, Instant};

/// Owns the query parameters and turns them into request descriptors.
///
/// Filter edits land in a draft immediately (so the UI can echo them) but only
/// reach `applied`, and therefore the descriptor, after the debounce window
/// passes without further edits. Sort, page, page size and seed changes apply
/// at once.
#[derive(Debug)]
pub struct QueryNormalizer {
    draft: FilterState,
    applied: FilterState,
    debounce: Debouncer<FilterState>,
    sort: SortKey,
    page: u32,
    page_size: u32,
    feed_seed: u64,
}

impl QueryNormalizer {
    pub fn new(page_size: u32, filter_debounce: Duration) -> Result<Self, QueryError> {
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        Ok(Self {
            draft: FilterState::default(),
            applied: FilterState::default(),
            debounce: Debouncer::new(filter_debounce),
            sort: SortKey::Default,
            page: 1,
            page_size,
            feed_seed: 0,
        })
    }

    /// The request for the current parameters.
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor {
            filters: self.applied.clone(),
            sort: self.sort,
            page: self.page,
            page_size: self.page_size,
            feed_seed: self.feed_seed,
        }
    }

    /// Merge `patch` into the draft and restart the quiescence window.
    pub fn set_filters(&mut self, patch: FilterPatch, now: Instant) {
        self.draft.apply(patch);
        self.debounce.schedule(self.draft.clone(), now);
    }

    /// Promote the draft once the window has elapsed.
    ///
    /// Returns true when the applied filters changed; the page is reset to 1
    /// in that case. A draft that ends up equal to the applied filters (an
    /// edit that was undone) is dropped without resetting anything.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(filters) = self.debounce.poll(now) else {
            return false;
        };
        if filters == self.applied {
            tracing::debug!("Debounced filters unchanged, nothing to propagate");
            return false;
        }
        self.applied = filters;
        self.page = 1;
        true
    }

    /// Deadline of the pending filter propagation, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Reset every filter to its default immediately.
    ///
    /// Returns true when the applied filters changed.
    pub fn clear_filters(&mut self) -> bool {
        self.debounce.cancel();
        self.draft = FilterState::default();
        if self.applied.is_default() {
            return false;
        }
        self.applied = FilterState::default();
        self.page = 1;
        true
    }

    /// Returns true when the key changed; the page restarts at 1.
    pub fn set_sort(&mut self, sort: SortKey) -> bool {
        if sort == self.sort {
            return false;
        }
        self.sort = sort;
        self.page = 1;
        true
    }

    /// Returns true when the size changed; the page restarts at 1.
    pub fn set_page_size(&mut self, page_size: u32) -> Result<bool, QueryError> {
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        if page_size == self.page_size {
            return Ok(false);
        }
        self.page_size = page_size;
        self.page = 1;
        Ok(true)
    }

    pub fn advance_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    /// Bump the seed and restart at page 1.
    pub fn reshuffle(&mut self) {
        self.feed_seed = self.feed_seed.wrapping_add(1);
        self.page = 1;
    }

    /// Filters as last edited, possibly not yet applied.
    pub fn draft(&self) -> &FilterState {
        &self.draft
    }

    /// Filters the current descriptor uses.
    pub fn applied(&self) -> &FilterState {
        &self.applied
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn feed_seed(&self) -> u64 {
        self.feed_seed
    }
}
