use super::cache::ResponseCache;
use super::prefetch::Prefetcher;
use super::query::QueryNormalizer;
use super::store::{FeedState, FeedStatus, FeedStore, Settle};
use crate::catalog::{
    FilterPatch, Pagination, ProductSource, QueryError, RequestDescriptor, ResponsePage,
    SortKey, SourceError,
};
use crate::config::Config;
use crate::gesture::{PullGesture, PullRelease, ScrollTrigger, TriggerGate};
use crate::render::{RenderPlan, RenderSelector, Viewport};
use crate::util::catch_task_panic;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// The feed is waiting for it.
    Foreground,
    /// Speculative next page; lands in the cache only.
    Prefetch,
}

/// Completion of a background fetch, delivered through the engine's channel.
#[derive(Debug)]
pub enum FeedEvent {
    Fetched {
        descriptor: RequestDescriptor,
        kind: FetchKind,
        result: Result<ResponsePage, SourceError>,
    },
    TaskPanicked {
        descriptor: RequestDescriptor,
        kind: FetchKind,
        error: String,
    },
}

/// The product feed engine.
///
/// Owns every piece of feed state and is driven from a single event loop:
/// commands from the UI, [`FeedEvent`]s from spawned fetches, and
/// [`FeedEngine::poll_timers`] whenever [`FeedEngine::next_deadline`] passes.
/// Fetches are never aborted; a response is applied only while the store is
/// still waiting for exactly its descriptor.
pub struct FeedEngine {
    source: Arc<dyn ProductSource>,
    query: QueryNormalizer,
    cache: ResponseCache,
    store: FeedStore,
    prefetcher: Prefetcher,
    in_flight: HashSet<RequestDescriptor>,
    scroll: ScrollTrigger,
    pull: PullGesture,
    render: RenderSelector,
    events: mpsc::Sender<FeedEvent>,
}

impl FeedEngine {
    pub fn new(
        source: Arc<dyn ProductSource>,
        config: &Config,
        events: mpsc::Sender<FeedEvent>,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            source,
            query: QueryNormalizer::new(config.feed.page_size, config.feed.filter_debounce())?,
            cache: ResponseCache::new(),
            store: FeedStore::new(),
            prefetcher: Prefetcher::new(config.feed.prefetch),
            in_flight: HashSet::new(),
            scroll: ScrollTrigger::new(config.scroll.threshold, config.scroll.delay()),
            pull: PullGesture::new(
                config.pull.damping,
                config.pull.max_offset,
                config.pull.release_threshold,
                config.pull.settle(),
            ),
            render: RenderSelector::from_config(&config.render),
            events,
        })
    }

    /// Load the first page for the default query.
    pub fn start(&mut self) {
        tracing::info!(source = self.source.name(), "Starting product feed");
        self.request(self.query.descriptor());
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Merge a partial filter update. The request goes out once the edits
    /// have been quiet for the debounce window.
    pub fn set_filters(&mut self, patch: FilterPatch) {
        tracing::debug!(?patch, "Filter edit");
        self.query.set_filters(patch, Instant::now());
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if self.query.set_sort(sort) {
            tracing::debug!(sort = %sort, "Sort changed");
            self.reset();
        }
    }

    /// Load the next page, or retry the failed request after an error.
    ///
    /// Returns false when there is nothing to load or a fetch is running.
    pub fn advance_page(&mut self) -> bool {
        match self.store.status() {
            FeedStatus::Loading => false,
            FeedStatus::Idle => {
                self.request(self.query.descriptor());
                true
            }
            FeedStatus::Error => {
                tracing::info!(page = self.query.page(), "Retrying failed page");
                self.request(self.query.descriptor());
                true
            }
            FeedStatus::Loaded if !self.store.has_more() => false,
            FeedStatus::Loaded => {
                self.query.advance_page();
                tracing::debug!(page = self.query.page(), "Advancing page");
                self.request(self.query.descriptor());
                true
            }
        }
    }

    /// Reshuffle: bump the feed seed and reload from page 1.
    pub fn refresh_feed(&mut self) {
        self.query.reshuffle();
        tracing::info!(seed = self.query.feed_seed(), "Refreshing feed");
        self.reset();
    }

    /// Reset filters to their defaults without waiting for the debounce.
    pub fn clear_filters(&mut self) {
        if self.query.clear_filters() {
            tracing::debug!("Filters cleared");
            self.reset();
        }
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), QueryError> {
        if self.query.set_page_size(page_size)? {
            tracing::debug!(page_size, "Page size changed");
            self.reset();
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.scroll.cancel();
        self.request(self.query.descriptor());
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Run every timer whose deadline has passed. Returns true when the
    /// visible state changed.
    pub fn poll_timers(&mut self) -> bool {
        let now = Instant::now();
        let mut changed = false;

        if self.query.poll(now) {
            tracing::debug!(filters = ?self.query.applied(), "Filters propagated");
            self.reset();
            changed = true;
        }
        if self.scroll.poll(self.gate(), now) {
            changed |= self.advance_page();
        }
        changed |= self.pull.poll(now);
        changed
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.query.deadline(),
            self.scroll.deadline(),
            self.pull.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ------------------------------------------------------------------
    // Fetch completion
    // ------------------------------------------------------------------

    /// Apply a completed fetch. Returns true when the feed state changed.
    pub fn handle_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Fetched {
                descriptor,
                kind,
                result,
            } => {
                self.finish(&descriptor, kind);
                match result {
                    Ok(page) => self.on_page(descriptor, kind, page),
                    Err(e) => self.on_failure(descriptor, kind, e.to_string()),
                }
            }
            FeedEvent::TaskPanicked {
                descriptor,
                kind,
                error,
            } => {
                tracing::error!(page = descriptor.page, ?kind, error = %error, "Fetch task panicked");
                self.finish(&descriptor, kind);
                self.on_failure(descriptor, kind, format!("Fetch task panicked: {error}"))
            }
        }
    }

    fn finish(&mut self, descriptor: &RequestDescriptor, kind: FetchKind) {
        match kind {
            FetchKind::Foreground => {
                self.in_flight.remove(descriptor);
            }
            FetchKind::Prefetch => self.prefetcher.complete(descriptor),
        }
    }

    fn on_page(&mut self, descriptor: RequestDescriptor, kind: FetchKind, page: ResponsePage) -> bool {
        let page = Arc::new(page);
        self.cache.put(descriptor.clone(), Arc::clone(&page));

        if kind == FetchKind::Prefetch {
            tracing::debug!(page = descriptor.page, products = page.products.len(), "Prefetched page cached");
            if !self.awaiting(&descriptor) {
                return false;
            }
        }
        self.settle_success(&descriptor, &page)
    }

    fn on_failure(&mut self, descriptor: RequestDescriptor, kind: FetchKind, message: String) -> bool {
        match kind {
            FetchKind::Foreground => {
                if self.store.fail(&descriptor, message) == Settle::Stale {
                    return false;
                }
                self.scroll.on_fetch_settled();
                true
            }
            FetchKind::Prefetch => {
                tracing::debug!(page = descriptor.page, error = %message, "Prefetch failed");
                // The feed caught up with this prefetch while it was running.
                if self.awaiting(&descriptor) && !self.in_flight.contains(&descriptor) {
                    self.spawn_fetch(descriptor, FetchKind::Foreground);
                }
                false
            }
        }
    }

    fn settle_success(&mut self, descriptor: &RequestDescriptor, page: &ResponsePage) -> bool {
        if self.store.apply(descriptor, page) == Settle::Stale {
            return false;
        }
        self.scroll.on_fetch_settled();
        self.maybe_prefetch();
        true
    }

    fn awaiting(&self, descriptor: &RequestDescriptor) -> bool {
        self.store.is_loading() && self.store.active() == Some(descriptor)
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    fn request(&mut self, descriptor: RequestDescriptor) {
        self.store.begin(descriptor.clone());

        if let Some(page) = self.cache.get(&descriptor) {
            tracing::debug!(page = descriptor.page, "Serving page from cache");
            self.settle_success(&descriptor, &page);
            return;
        }
        if self.in_flight.contains(&descriptor) || self.prefetcher.is_in_flight(&descriptor) {
            tracing::debug!(page = descriptor.page, "Joining in-flight fetch");
            return;
        }
        self.spawn_fetch(descriptor, FetchKind::Foreground);
    }

    fn maybe_prefetch(&mut self) {
        if !self.pagination().has_next_page() {
            return;
        }
        let next = self.query.descriptor().with_page(self.query.page() + 1);
        if self.in_flight.contains(&next) || !self.prefetcher.should_prefetch(&next, &self.cache) {
            return;
        }
        tracing::debug!(page = next.page, "Prefetching next page");
        self.prefetcher.mark(next.clone());
        self.spawn_fetch(next, FetchKind::Prefetch);
    }

    fn spawn_fetch(&mut self, descriptor: RequestDescriptor, kind: FetchKind) {
        if kind == FetchKind::Foreground {
            self.in_flight.insert(descriptor.clone());
        }
        let source = Arc::clone(&self.source);
        let tx = self.events.clone();

        tracing::debug!(
            source = source.name(),
            page = descriptor.page,
            ?kind,
            "Spawning fetch"
        );
        tokio::spawn(async move {
            let outcome = catch_task_panic(async { source.fetch_products(&descriptor).await }).await;
            let event = match outcome {
                Ok(result) => FeedEvent::Fetched {
                    descriptor,
                    kind,
                    result,
                },
                Err(error) => FeedEvent::TaskPanicked {
                    descriptor,
                    kind,
                    error,
                },
            };
            if let Err(e) = tx.send(event).await {
                tracing::warn!(error = %e, "Failed to deliver fetch result (receiver dropped)");
            }
        });
    }

    // ------------------------------------------------------------------
    // Rendering and gestures
    // ------------------------------------------------------------------

    pub fn render_plan(&self, viewport: Viewport) -> RenderPlan {
        self.render.plan(self.store.len(), viewport)
    }

    pub fn render_selector(&self) -> &RenderSelector {
        &self.render
    }

    /// Feed the visibility of the last drawn frame to the scroll trigger.
    /// Returns true when the trigger armed.
    pub fn observe_render(&mut self, plan: &RenderPlan) -> bool {
        let gate = self.gate();
        let now = Instant::now();
        let mut armed = false;
        if let Some(last_visible) = plan.last_visible {
            armed |= self
                .scroll
                .observe_visible(last_visible, self.store.len(), gate, now);
        }
        if plan.sentinel_visible {
            armed |= self.scroll.observe_sentinel(true, gate, now);
        }
        armed
    }

    fn gate(&self) -> TriggerGate {
        TriggerGate {
            has_more: self.store.has_more(),
            loading: self.store.is_loading(),
            failed: self.store.status() == FeedStatus::Error,
        }
    }

    pub fn pull_start(&mut self, y: f32, at_top: bool) -> bool {
        self.pull.start(y, at_top)
    }

    pub fn pull_move(&mut self, y: f32) -> f32 {
        self.pull.drag(y)
    }

    pub fn pull_release(&mut self) -> PullRelease {
        let release = self.pull.release(self.store.is_loading(), Instant::now());
        if release == PullRelease::Refresh {
            self.refresh_feed();
        }
        release
    }

    pub fn pull_offset(&self) -> f32 {
        self.pull.offset()
    }

    pub fn is_pulling(&self) -> bool {
        self.pull.is_dragging()
    }

    pub fn pull_armed(&self) -> bool {
        self.pull.is_armed()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn state(&self) -> FeedState {
        self.store.snapshot()
    }

    pub fn status(&self) -> FeedStatus {
        self.store.status()
    }

    pub fn query(&self) -> &QueryNormalizer {
        &self.query
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            current: self.query.page(),
            page_size: self.query.page_size(),
            total: self.store.total(),
        }
    }

    /// Bumped on every filter, sort, page size or seed change.
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    /// `(hits, misses)` of the response cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    pub fn is_prefetching(&self) -> bool {
        self.prefetcher.in_flight() > 0
    }

    pub fn is_scroll_armed(&self) -> bool {
        self.scroll.is_armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockCatalog, SourceFuture};
    use tokio::time::Duration;

    struct Panicking;

    impl ProductSource for Panicking {
        fn fetch_products(&self, _request: &RequestDescriptor) -> SourceFuture {
            panic!("catalog exploded")
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn engine(source: Arc<dyn ProductSource>) -> (FeedEngine, mpsc::Receiver<FeedEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let engine = FeedEngine::new(source, &Config::default(), tx).unwrap();
        (engine, rx)
    }

    #[tokio::test]
    async fn test_start_loads_first_page() {
        let source = Arc::new(MockCatalog::new().with_latency(Duration::ZERO));
        let (mut engine, mut rx) = engine(source);
        engine.start();
        assert!(engine.state().loading);

        let event = rx.recv().await.unwrap();
        assert!(engine.handle_event(event));
        let state = engine.state();
        assert_eq!(state.items.len(), 12);
        assert!(state.has_more);
        assert_eq!(engine.pagination().total, 48);
    }

    #[tokio::test]
    async fn test_panicking_source_surfaces_error() {
        let (mut engine, mut rx) = engine(Arc::new(Panicking));
        engine.start();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, FeedEvent::TaskPanicked { .. }));
        engine.handle_event(event);

        let state = engine.state();
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("Fetch task panicked: catalog exploded")
        );
        assert_eq!(engine.status(), FeedStatus::Error);
    }

    #[tokio::test]
    async fn test_advance_is_noop_while_loading() {
        let source = Arc::new(MockCatalog::new().with_latency(Duration::ZERO));
        let (mut engine, _rx) = engine(source);
        engine.start();
        assert!(!engine.advance_page());
        assert_eq!(engine.pagination().current, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_deadline_tracks_filter_debounce() {
        let source = Arc::new(MockCatalog::new());
        let (mut engine, _rx) = engine(source);
        assert_eq!(engine.next_deadline(), None);

        let before = Instant::now();
        engine.set_filters(FilterPatch::search("lamp"));
        assert_eq!(
            engine.next_deadline(),
            Some(before + Duration::from_millis(500))
        );
    }
}
