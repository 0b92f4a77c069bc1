//! Chooses how the product list is drawn.
//!
//! Small feeds are enumerated directly and rely on an end-of-list sentinel
//! row to request more. Once the feed reaches `virtualize_threshold` items it
//! is drawn as a window over the viewport, and the last visible index drives
//! the scroll trigger instead.

use std::ops::Range;

use crate::config::RenderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Direct,
    Windowed,
}

/// Scroll position and height of the list area, in rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_offset: usize,
    pub height: usize,
}

/// What to draw for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub strategy: RenderStrategy,
    /// Item indices to lay out.
    pub range: Range<usize>,
    /// Last item on screen; reported only by windowed plans.
    pub last_visible: Option<usize>,
    /// Whether the row after the last item is on screen; direct plans only.
    pub sentinel_visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderSelector {
    threshold: usize,
    item_extent: usize,
}

impl RenderSelector {
    pub fn new(threshold: usize, item_extent: usize) -> Self {
        Self {
            threshold,
            item_extent: item_extent.max(1),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.virtualize_threshold, config.item_extent)
    }

    pub fn item_extent(&self) -> usize {
        self.item_extent
    }

    pub fn select(&self, item_count: usize) -> RenderStrategy {
        if item_count >= self.threshold {
            RenderStrategy::Windowed
        } else {
            RenderStrategy::Direct
        }
    }

    pub fn plan(&self, item_count: usize, viewport: Viewport) -> RenderPlan {
        let first = (viewport.scroll_offset / self.item_extent).min(item_count);
        let bottom = viewport.scroll_offset + viewport.height;
        let end = bottom.div_ceil(self.item_extent).min(item_count);

        match self.select(item_count) {
            RenderStrategy::Direct => RenderPlan {
                strategy: RenderStrategy::Direct,
                range: 0..item_count,
                last_visible: None,
                sentinel_visible: viewport.height > 0 && item_count * self.item_extent < bottom,
            },
            RenderStrategy::Windowed => RenderPlan {
                strategy: RenderStrategy::Windowed,
                range: first..end,
                last_visible: (end > first).then(|| end - 1),
                sentinel_visible: false,
            },
        }
    }

    /// Largest useful scroll offset for `item_count` items plus the sentinel row.
    pub fn max_scroll(&self, item_count: usize, height: usize) -> usize {
        (item_count * self.item_extent + 1).saturating_sub(height)
    }
}

impl Default for RenderSelector {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(scroll_offset: usize, height: usize) -> Viewport {
        Viewport {
            scroll_offset,
            height,
        }
    }

    #[test]
    fn test_threshold_selects_strategy() {
        let selector = RenderSelector::default();
        assert_eq!(selector.select(99), RenderStrategy::Direct);
        assert_eq!(selector.select(100), RenderStrategy::Windowed);
        assert_eq!(selector.select(0), RenderStrategy::Direct);
    }

    #[test]
    fn test_direct_plan_reports_sentinel() {
        let selector = RenderSelector::new(100, 1);
        let short = selector.plan(12, viewport(0, 20));
        assert_eq!(short.range, 0..12);
        assert!(short.sentinel_visible);
        assert_eq!(short.last_visible, None);

        let long = selector.plan(40, viewport(0, 20));
        assert!(!long.sentinel_visible);
        assert!(selector.plan(40, viewport(21, 20)).sentinel_visible);
    }

    #[test]
    fn test_windowed_plan_covers_viewport() {
        let selector = RenderSelector::new(100, 2);
        let plan = selector.plan(150, viewport(20, 9));
        assert_eq!(plan.strategy, RenderStrategy::Windowed);
        assert_eq!(plan.range, 10..15);
        assert_eq!(plan.last_visible, Some(14));
        assert!(!plan.sentinel_visible);
    }

    #[test]
    fn test_windowed_plan_clamps_to_items() {
        let selector = RenderSelector::new(10, 1);
        let plan = selector.plan(12, viewport(8, 20));
        assert_eq!(plan.range, 8..12);
        assert_eq!(plan.last_visible, Some(11));
    }

    #[test]
    fn test_zero_extent_is_treated_as_one() {
        let selector = RenderSelector::new(1, 0);
        assert_eq!(selector.item_extent(), 1);
    }
}
