use crate::catalog::{Product, RequestDescriptor, ResponsePage};
use std::sync::Arc;

/// Lifecycle of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Read-only snapshot handed to rendering.
///
/// `items` is shared with the store; taking a snapshot is O(1).
#[derive(Debug, Clone)]
pub struct FeedState {
    pub items: Arc<Vec<Product>>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
}

/// Outcome of offering a response to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Applied to the feed.
    Applied,
    /// Not for the active request; dropped.
    Stale,
}

/// `true` while pages beyond `page` exist and the last page was non-empty.
///
/// The empty-page guard stops a stale `total` from promising rows the
/// source no longer returns.
pub fn compute_has_more(page: u32, page_size: u32, total: u64, returned: usize) -> bool {
    u64::from(page) * u64::from(page_size) < total && returned > 0
}

/// Authoritative feed state.
///
/// Only the response for the most recently begun request is accepted. Every
/// other arrival, including a duplicate of one already applied, is stale.
#[derive(Debug)]
pub struct FeedStore {
    items: Arc<Vec<Product>>,
    status: FeedStatus,
    error: Option<String>,
    has_more: bool,
    total: u64,
    active: Option<RequestDescriptor>,
    generation: u64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            status: FeedStatus::Idle,
            error: None,
            has_more: true,
            total: 0,
            active: None,
            generation: 0,
        }
    }

    /// Enter `loading` for `descriptor`, superseding any in-flight request.
    pub fn begin(&mut self, descriptor: RequestDescriptor) {
        let new_generation = self
            .active
            .as_ref()
            .map_or(true, |active| !active.same_generation(&descriptor));
        if new_generation {
            self.generation += 1;
        }
        if descriptor.page == 1 {
            self.has_more = true;
        }

        tracing::debug!(
            page = descriptor.page,
            seed = descriptor.feed_seed,
            generation = self.generation,
            "Feed loading"
        );
        self.status = FeedStatus::Loading;
        self.error = None;
        self.active = Some(descriptor);
    }

    /// Merge a successful response: page 1 replaces, later pages append.
    pub fn apply(&mut self, descriptor: &RequestDescriptor, page: &ResponsePage) -> Settle {
        if !self.accepts(descriptor) {
            tracing::debug!(
                page = descriptor.page,
                seed = descriptor.feed_seed,
                generation = self.generation,
                "Discarding stale response"
            );
            return Settle::Stale;
        }

        if descriptor.page <= 1 {
            self.items = Arc::new(page.products.clone());
        } else {
            Arc::make_mut(&mut self.items).extend(page.products.iter().cloned());
        }
        self.total = page.total;
        self.has_more = compute_has_more(
            descriptor.page,
            descriptor.page_size,
            page.total,
            page.products.len(),
        );
        self.status = FeedStatus::Loaded;

        tracing::debug!(
            page = descriptor.page,
            items = self.items.len(),
            total = self.total,
            has_more = self.has_more,
            "Feed loaded"
        );
        Settle::Applied
    }

    /// Record a failed fetch. Items and `has_more` are left as they were.
    pub fn fail(&mut self, descriptor: &RequestDescriptor, message: impl Into<String>) -> Settle {
        if !self.accepts(descriptor) {
            tracing::debug!(page = descriptor.page, "Discarding stale failure");
            return Settle::Stale;
        }
        let message = message.into();
        tracing::warn!(page = descriptor.page, error = %message, "Feed fetch failed");
        self.status = FeedStatus::Error;
        self.error = Some(message);
        Settle::Applied
    }

    fn accepts(&self, descriptor: &RequestDescriptor) -> bool {
        self.status == FeedStatus::Loading && self.active.as_ref() == Some(descriptor)
    }

    pub fn snapshot(&self) -> FeedState {
        FeedState {
            items: Arc::clone(&self.items),
            loading: self.is_loading(),
            error: self.error.clone(),
            has_more: self.has_more,
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FeedStatus::Loading
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Total reported by the last applied response.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The request the store is waiting for, or last settled.
    pub fn active(&self) -> Option<&RequestDescriptor> {
        self.active.as_ref()
    }

    /// Increments whenever filter, sort, page size or seed change.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FilterPatch, FilterState};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn product(id: u64) -> Product {
        Product {
            id,
            name: format!("P{id}"),
            price: 100,
            original_price: None,
            category: "Home".into(),
            brand: "Brand A".into(),
            image: None,
            description: String::new(),
            in_stock: true,
            rating: 4.0,
            review_count: 0,
            sales: 0,
            tags: Vec::new(),
        }
    }

    fn response(ids: &[u64], total: u64) -> ResponsePage {
        ResponsePage {
            products: ids.iter().copied().map(product).collect(),
            total,
        }
    }

    fn ids(store: &FeedStore) -> Vec<u64> {
        store.snapshot().items.iter().map(|p| p.id).collect()
    }

    fn page(n: u32) -> RequestDescriptor {
        RequestDescriptor::default().with_page(n)
    }

    #[test]
    fn test_starts_idle() {
        let store = FeedStore::new();
        assert_eq!(store.status(), FeedStatus::Idle);
        let state = store.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.loading);
        assert!(state.has_more);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_page_one_replaces_items() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.apply(&page(1), &response(&[9, 8], 4));

        store.begin(page(1));
        assert_eq!(store.apply(&page(1), &response(&[1, 2], 4)), Settle::Applied);
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[test]
    fn test_later_pages_append() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.apply(&page(1), &response(&[1, 2], 4));
        store.begin(page(2));
        store.apply(&page(2), &response(&[3, 4], 4));

        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert_eq!(store.status(), FeedStatus::Loaded);
        assert!(!store.has_more());
    }

    #[test]
    fn test_failure_keeps_items_and_has_more() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.apply(&page(1), &response(&[1, 2], 10));
        store.begin(page(2));

        assert_eq!(store.fail(&page(2), "Request timed out after 10s"), Settle::Applied);
        let state = store.snapshot();
        assert_eq!(store.status(), FeedStatus::Error);
        assert_eq!(state.error.as_deref(), Some("Request timed out after 10s"));
        assert!(!state.loading);
        assert!(state.has_more);
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[test]
    fn test_begin_clears_error() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.fail(&page(1), "boom");
        store.begin(page(1));
        assert!(store.snapshot().error.is_none());
        assert!(store.is_loading());
    }

    #[test]
    fn test_late_response_from_older_generation_is_stale() {
        let older = page(1);
        let mut newer_filters = FilterState::default();
        newer_filters.apply(FilterPatch::category("Apparel"));
        let newer = RequestDescriptor {
            filters: newer_filters,
            ..page(1)
        };

        let mut store = FeedStore::new();
        store.begin(older.clone());
        store.begin(newer.clone());
        assert_eq!(store.apply(&newer, &response(&[5, 6], 2)), Settle::Applied);
        assert_eq!(store.apply(&older, &response(&[1, 2], 2)), Settle::Stale);

        assert_eq!(ids(&store), vec![5, 6]);
    }

    #[test]
    fn test_duplicate_response_is_stale() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.apply(&page(1), &response(&[1, 2], 4));
        store.begin(page(2));
        store.apply(&page(2), &response(&[3, 4], 4));

        assert_eq!(store.apply(&page(2), &response(&[3, 4], 4)), Settle::Stale);
        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_stale_failure_does_not_surface() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        let other = RequestDescriptor {
            feed_seed: 9,
            ..page(1)
        };
        assert_eq!(store.fail(&other, "boom"), Settle::Stale);
        assert!(store.snapshot().error.is_none());
    }

    #[test]
    fn test_empty_page_ends_feed_despite_total() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        store.apply(&page(1), &response(&[], 30));
        assert!(!store.has_more());
    }

    #[test]
    fn test_generation_changes_only_with_query() {
        let mut store = FeedStore::new();
        store.begin(page(1));
        let first = store.generation();
        store.begin(page(2));
        assert_eq!(store.generation(), first);
        store.begin(RequestDescriptor {
            feed_seed: 1,
            ..page(1)
        });
        assert_eq!(store.generation(), first + 1);
    }

    proptest! {
        #[test]
        fn prop_has_more_law(
            page in 1u32..1000,
            page_size in 1u32..200,
            total in 0u64..200_000,
            returned in 0usize..200,
        ) {
            let expected = !(u64::from(page) * u64::from(page_size) >= total || returned == 0);
            prop_assert_eq!(compute_has_more(page, page_size, total, returned), expected);
        }
    }
}
