//! Configuration file parser for ~/.config/charlist/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, but logged as a warning since they
//! are usually typos.
use crate::api::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::feed::DEFAULT_PREFETCH_THRESHOLD;
use crate::images::DEFAULT_IMAGE_CACHE_ENTRIES;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Largest `pageSize` the API is asked for.
pub const MAX_PAGE_SIZE: u32 = 500;

const KNOWN_KEYS: [&str; 7] = [
    "api_base_url",
    "page_size",
    "search_debounce_ms",
    "request_timeout_secs",
    "prefetch_threshold",
    "image_cache_entries",
    "list_width",
];

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base endpoint of the character API.
    pub api_base_url: String,

    /// `pageSize` sent with browse requests. Clamped to 1..=500.
    pub page_size: u32,

    /// Quiet interval before a search-box edit turns into a search.
    pub search_debounce_ms: u64,

    /// Per-request timeout for both the collection and image fetches.
    pub request_timeout_secs: u64,

    /// Rows from the end of the list that trigger loading the next page.
    pub prefetch_threshold: usize,

    /// Images kept in the in-memory cache.
    pub image_cache_entries: usize,

    /// Column width used when rendering rows.
    pub list_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: 500,
            request_timeout_secs: 30,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            image_cache_entries: DEFAULT_IMAGE_CACHE_ENTRIES,
            list_width: 80,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Default location: `$HOME/.config/charlist/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("charlist")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
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
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(content)?;
        config.page_size = clamp_page_size(config.page_size);
        tracing::info!(
            path = %path.display(),
            base_url = %config.api_base_url,
            page_size = config.page_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply command-line overrides on top of the file.
    pub fn with_overrides(mut self, base_url: Option<String>, page_size: Option<u32>) -> Self {
        if let Some(url) = base_url {
            self.api_base_url = url;
        }
        if let Some(size) = page_size {
            self.page_size = clamp_page_size(size);
        }
        self
    }
}

fn clamp_page_size(size: u32) -> u32 {
    size.clamp(1, MAX_PAGE_SIZE)
}

// ============================================================================
// Tests
// ============================================================================
