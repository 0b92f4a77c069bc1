use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upper price bound used by the default filter.
pub const DEFAULT_MAX_PRICE: u32 = 10_000;

/// Products per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

// ============================================================================
// Error Types
// ============================================================================

/// Rejected query parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid price range: min {min} exceeds max {max}")]
    InvertedPriceRange { min: u32, max: u32 },

    #[error("Page size must be at least 1")]
    ZeroPageSize,

    #[error("Unknown sort key: {0}")]
    UnknownSort(String),
}

// ============================================================================
// Product
// ============================================================================

/// A catalog entry as delivered by the data source.
///
/// The feed engine never looks inside a product; filtering and ordering are
/// the data source's job. Field names follow the wire format (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: u32,
    #[serde(default)]
    pub original_price: Option<u32>,
    pub category: String,
    pub brand: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    pub in_stock: bool,
    /// Some backends send the rating as a string ("4.3"), others as a number.
    #[serde(default, deserialize_with = "number_or_string")]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub sales: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Inclusive price bounds. Construction guarantees `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct PriceRange {
    min: u32,
    max: u32,
}

impl PriceRange {
    pub fn new(min: u32, max: u32) -> Result<Self, QueryError> {
        if min > max {
            return Err(QueryError::InvertedPriceRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, price: u32) -> bool {
        (self.min..=self.max).contains(&price)
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

impl TryFrom<(u32, u32)> for PriceRange {
    type Error = QueryError;

    fn try_from((min, max): (u32, u32)) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<PriceRange> for (u32, u32) {
    fn from(range: PriceRange) -> Self {
        (range.min, range.max)
    }
}

/// The user's filter selection. Empty strings mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub category: String,
    pub price_range: PriceRange,
    pub brand: String,
    /// Only `true` narrows the result; `false` shows every stock state.
    pub in_stock: bool,
    pub search: String,
}

impl FilterState {
    /// Merge a partial update; fields left `None` keep their value.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(range) = patch.price_range {
            self.price_range = range;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        if let Some(in_stock) = patch.in_stock {
            self.in_stock = in_stock;
        }
        if let Some(search) = patch.search {
            self.search = search;
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial filter update for [`FeedEngine::set_filters`](crate::feed::FeedEngine::set_filters).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub category: Option<String>,
    pub price_range: Option<PriceRange>,
    pub brand: Option<String>,
    pub in_stock: Option<bool>,
    pub search: Option<String>,
}

impl FilterPatch {
    pub fn category(value: impl Into<String>) -> Self {
        Self {
            category: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn brand(value: impl Into<String>) -> Self {
        Self {
            brand: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn search(value: impl Into<String>) -> Self {
        Self {
            search: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn in_stock(value: bool) -> Self {
        Self {
            in_stock: Some(value),
            ..Self::default()
        }
    }

    pub fn price_range(range: PriceRange) -> Self {
        Self {
            price_range: Some(range),
            ..Self::default()
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Result ordering requested from the data source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first (descending id).
    #[default]
    Default,
    PriceAsc,
    PriceDesc,
    Sales,
    Rating,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Default,
        SortKey::PriceAsc,
        SortKey::PriceDesc,
        SortKey::Sales,
        SortKey::Rating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Default => "default",
            SortKey::PriceAsc => "price_asc",
            SortKey::PriceDesc => "price_desc",
            SortKey::Sales => "sales",
            SortKey::Rating => "rating",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Default => "Newest",
            SortKey::PriceAsc => "Price ↑",
            SortKey::PriceDesc => "Price ↓",
            SortKey::Sales => "Best selling",
            SortKey::Rating => "Top rated",
        }
    }

    /// The key after this one, wrapping around.
    pub fn next(&self) -> SortKey {
        let idx = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| QueryError::UnknownSort(s.to_string()))
    }
}

// ============================================================================
// Pagination, requests and responses
// ============================================================================

/// Page cursor plus the last known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index.
    pub current: u32,
    pub page_size: u32,
    pub total: u64,
}

impl Pagination {
    /// Number of rows covered by pages `1..=current`.
    pub fn loaded_through(&self) -> u64 {
        u64::from(self.current) * u64::from(self.page_size)
    }

    /// True when the source reported rows beyond the current page.
    pub fn has_next_page(&self) -> bool {
        self.loaded_through() < self.total
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

/// Canonical request sent to the data source and used as the cache key.
///
/// Equality and hashing are structural over every field, so two descriptors
/// built from the same state always address the same cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    pub filters: FilterState,
    pub sort: SortKey,
    pub page: u32,
    pub page_size: u32,
    pub feed_seed: u64,
}

impl RequestDescriptor {
    /// Same query, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// True when both descriptors differ at most in `page`.
    pub fn same_generation(&self, other: &RequestDescriptor) -> bool {
        self.filters == other.filters
            && self.sort == other.sort
            && self.page_size == other.page_size
            && self.feed_seed == other.feed_seed
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            sort: SortKey::Default,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            feed_seed: 0,
        }
    }
}

/// One page of results. Extra fields in the payload (page, limit,
/// totalPages) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePage {
    #[serde(default)]
    pub products: Vec<Product>,
    pub total: u64,
}
