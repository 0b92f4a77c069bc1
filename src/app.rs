use crate::catalog::{FilterPatch, PriceRange, BRANDS, CATEGORIES, DEFAULT_MAX_PRICE};
use crate::feed::{FeedEngine, FeedEvent};
use crate::render::Viewport;
use std::borrow::Cow;
use tokio::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Price filter step for the `[ ] { }` keys.
pub const PRICE_STEP: u32 = 50;

/// Maximum search input length.
pub const MAX_SEARCH_LENGTH: usize = 128;

/// Terminal application state.
///
/// The feed itself lives in the engine; this holds only what the terminal
/// surface adds on top: scroll position, search input and status line.
pub struct App {
    pub engine: FeedEngine,
    /// First visible row of the list.
    pub scroll_offset: usize,
    /// Rows available to the list in the last frame.
    pub viewport_height: usize,
    pub search_mode: bool,
    pub search_input: String,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
    /// Engine generation the scroll position belongs to.
    seen_generation: u64,
}

impl App {
    pub fn new(engine: FeedEngine) -> Self {
        let seen_generation = engine.generation();
        Self {
            engine,
            scroll_offset: 0,
            viewport_height: 0,
            search_mode: false,
            search_input: String::new(),
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            seen_generation,
        }
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear the status message once it has expired. Returns true if cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        match &self.status_message {
            Some((_, at)) if at.elapsed() >= STATUS_TTL => {
                self.status_message = None;
                true
            }
            _ => false,
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            scroll_offset: self.scroll_offset,
            height: self.viewport_height,
        }
    }

    // ------------------------------------------------------------------
    // Feed plumbing
    // ------------------------------------------------------------------

    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        if self.engine.handle_event(event) {
            self.needs_redraw = true;
        }
        self.sync_generation();
    }

    pub fn poll_timers(&mut self) {
        if self.engine.poll_timers() {
            self.needs_redraw = true;
        }
        self.sync_generation();
    }

    /// A new query generation starts from the top of the list.
    pub fn sync_generation(&mut self) {
        let generation = self.engine.generation();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.scroll_offset = 0;
            self.needs_redraw = true;
        }
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    pub fn at_top(&self) -> bool {
        self.scroll_offset == 0
    }

    fn max_scroll(&self) -> usize {
        let items = self.engine.state().items.len();
        self.engine
            .render_selector()
            .max_scroll(items, self.viewport_height)
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(rows)
            .min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    pub fn page_rows(&self) -> usize {
        self.viewport_height.saturating_sub(1).max(1)
    }

    // ------------------------------------------------------------------
    // Filter shortcuts
    // ------------------------------------------------------------------

    pub fn cycle_category(&mut self) {
        let next = next_choice(&CATEGORIES, &self.engine.query().draft().category);
        self.set_status(format!("Category: {}", display_choice(next)));
        self.engine.set_filters(FilterPatch::category(next));
    }

    pub fn cycle_brand(&mut self) {
        let next = next_choice(&BRANDS, &self.engine.query().draft().brand);
        self.set_status(format!("Brand: {}", display_choice(next)));
        self.engine.set_filters(FilterPatch::brand(next));
    }

    pub fn toggle_in_stock(&mut self) {
        let in_stock = !self.engine.query().draft().in_stock;
        self.set_status(if in_stock {
            "Showing in-stock products only"
        } else {
            "Showing all stock states"
        });
        self.engine.set_filters(FilterPatch::in_stock(in_stock));
    }

    /// Move the upper price bound by `delta`, never below the lower bound.
    pub fn adjust_max_price(&mut self, delta: i64) {
        let range = self.engine.query().draft().price_range;
        let max = step_price(range.max(), delta).max(range.min());
        self.update_price_range(range.min(), max);
    }

    /// Move the lower price bound by `delta`, never above the upper bound.
    pub fn adjust_min_price(&mut self, delta: i64) {
        let range = self.engine.query().draft().price_range;
        let min = step_price(range.min(), delta).min(range.max());
        self.update_price_range(min, range.max());
    }

    fn update_price_range(&mut self, min: u32, max: u32) {
        match PriceRange::new(min, max) {
            Ok(range) => {
                self.set_status(format!("Price: ${min}-${max}"));
                self.engine.set_filters(FilterPatch::price_range(range));
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    pub fn cycle_sort(&mut self) {
        let next = self.engine.query().sort().next();
        self.set_status(format!("Sort: {}", next.label()));
        self.engine.set_sort(next);
        self.sync_generation();
    }

    pub fn refresh(&mut self) {
        self.set_status("Reshuffling feed...");
        self.engine.refresh_feed();
        self.sync_generation();
    }

    pub fn clear_filters(&mut self) {
        self.search_input.clear();
        self.set_status("Filters cleared");
        self.engine.clear_filters();
        self.sync_generation();
    }

    /// Load the next page by hand, or retry after an error.
    pub fn load_more(&mut self) {
        if !self.engine.advance_page() {
            self.set_status("Nothing more to load");
        }
    }

    // ------------------------------------------------------------------
    // Search input
    // ------------------------------------------------------------------

    pub fn enter_search(&mut self) {
        self.search_mode = true;
        self.search_input = self.engine.query().draft().search.clone();
    }

    pub fn exit_search(&mut self) {
        self.search_mode = false;
    }

    /// Every keystroke goes to the engine; the debounce collapses them.
    pub fn search_push(&mut self, c: char) {
        if self.search_input.chars().count() >= MAX_SEARCH_LENGTH {
            self.set_status(format!("Search is limited to {MAX_SEARCH_LENGTH} characters"));
            return;
        }
        self.search_input.push(c);
        self.engine
            .set_filters(FilterPatch::search(self.search_input.clone()));
    }

    pub fn search_pop(&mut self) {
        if self.search_input.pop().is_some() {
            self.engine
                .set_filters(FilterPatch::search(self.search_input.clone()));
        }
    }
}

/// The choice after `current` in `"" , choices...`, wrapping to "" (any).
fn next_choice<'a>(choices: &[&'a str], current: &str) -> &'a str {
    match choices.iter().position(|c| *c == current) {
        None => choices.first().copied().unwrap_or(""),
        Some(idx) if idx + 1 < choices.len() => choices[idx + 1],
        Some(_) => "",
    }
}

fn display_choice(choice: &str) -> &str {
    if choice.is_empty() {
        "All"
    } else {
        choice
    }
}

fn step_price(price: u32, delta: i64) -> u32 {
    (i64::from(price) + delta).clamp(0, i64::from(DEFAULT_MAX_PRICE)) as u32
}
