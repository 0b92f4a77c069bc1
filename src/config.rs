//! Configuration file parser for ~/.config/shelf/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Every section and key is defaulted, so any subset can be specified.
//! Unknown keys are accepted but logged as warnings to surface typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::DEFAULT_PAGE_SIZE;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub scroll: ScrollConfig,
    pub pull: PullConfig,
    pub render: RenderConfig,
    pub source: SourceConfig,
}

/// Query and paging behavior of the feed engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Products requested per page.
    pub page_size: u32,
    /// Quiescence window for filter edits, in milliseconds.
    pub filter_debounce_ms: u64,
    /// Speculatively fetch the next page into the cache.
    pub prefetch: bool,
}

impl FeedConfig {
    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter_debounce_ms: 500,
            prefetch: true,
        }
    }
}

/// Infinite-scroll trigger.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Arm when the last visible item is within this many items of the end.
    pub threshold: usize,
    /// Delay between arming and advancing the page, in milliseconds.
    pub delay_ms: u64,
}

impl ScrollConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            delay_ms: 800,
        }
    }
}

/// Pull-to-refresh gesture.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Damped offset at or beyond which a release reshuffles the feed.
    pub release_threshold: f32,
    /// Offset per unit of drag distance.
    pub damping: f32,
    /// Cap on the damped offset.
    pub max_offset: f32,
    /// Delay before the offset springs back after release, in milliseconds.
    pub settle_ms: u64,
}

impl PullConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            release_threshold: 60.0,
            damping: 0.5,
            max_offset: 120.0,
            settle_ms: 200,
        }
    }
}

/// Rendering strategy selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Item count at which rendering switches to a windowed list.
    pub virtualize_threshold: usize,
    /// Rows occupied by one product.
    pub item_extent: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            virtualize_threshold: 100,
            item_extent: 1,
        }
    }
}

/// Where products come from.
///
/// Custom Debug impl masks `api_token` to keep it out of logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// REST API root (e.g. `http://localhost:3001/api`). `None` uses the
    /// built-in catalog.
    pub api_base_url: Option<String>,
    /// Bearer token for the API. `SHELF_API_TOKEN` takes precedence.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    /// Answer from the built-in catalog when the API is unreachable.
    pub fallback_to_mock: bool,
    /// Simulated latency of the built-in catalog, in milliseconds.
    pub mock_latency_ms: u64,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn mock_latency(&self) -> Duration {
        Duration::from_millis(self.mock_latency_ms)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            timeout_secs: 10,
            fallback_to_mock: true,
            mock_latency_ms: 300,
        }
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("fallback_to_mock", &self.fallback_to_mock)
            .field("mock_latency_ms", &self.mock_latency_ms)
            .finish()
    }
}

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("feed", &["page_size", "filter_debounce_ms", "prefetch"]),
    ("scroll", &["threshold", "delay_ms"]),
    (
        "pull",
        &["release_threshold", "damping", "max_offset", "settle_ms"],
    ),
    ("render", &["virtualize_threshold", "item_extent"]),
    (
        "source",
        &[
            "api_base_url",
            "api_token",
            "timeout_secs",
            "fallback_to_mock",
            "mock_latency_ms",
        ],
    ),
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            page_size = config.feed.page_size,
            api = config.source.api_base_url.as_deref().unwrap_or("built-in"),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size must be at least 1".into()));
        }
        if self.render.item_extent == 0 {
            return Err(ConfigError::Invalid(
                "render.item_extent must be at least 1".into(),
            ));
        }
        if !(self.pull.damping > 0.0) {
            return Err(ConfigError::Invalid("pull.damping must be positive".into()));
        }
        if !(self.pull.release_threshold > 0.0) || self.pull.release_threshold > self.pull.max_offset
        {
            return Err(ConfigError::Invalid(format!(
                "pull.release_threshold must be in (0, {}]",
                self.pull.max_offset
            )));
        }
        Ok(())
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (section, value) in raw {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(name, _)| name == section) else {
            tracing::warn!(key = %section, "Unknown section in config file, ignoring");
            continue;
        };
        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !keys.contains(&key.as_str()) {
                    tracing::warn!(section = %section, key = %key, "Unknown key in config file, ignoring");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
