//! Parser configuration.
//!
//! [`ParserConfig`] enumerates every recognized option directly — cache
//! directory, cache lifetime, body encoding, item template — and can be
//! populated from an optional TOML file. A missing file yields
//! `ParserConfig::default()`; unknown keys are accepted with a logged
//! warning so a config written for a newer version still loads.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// All knobs the parser recognizes.
///
/// Every field uses `#[serde(default)]` so any subset of keys can be
/// specified in the config file; missing keys fall back to defaults.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Directory for cached feed contents. `None` disables caching.
    /// The directory must exist; it is never created.
    pub cache_dir: Option<PathBuf>,

    /// Seconds to keep a cached feed before refetching. 0 disables caching.
    pub cache_lifetime_secs: u64,

    /// Character encoding of fetched feed bodies (a WHATWG encoding label,
    /// e.g. "UTF-8" or "ISO-8859-1"). Unknown labels fall back to UTF-8.
    pub encoding: String,

    /// Template used to render each item; `None` selects the built-in
    /// default. Placeholders: `#{tagName}` and `#{tagName.attributeName}`.
    pub item_template: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            cache_lifetime_secs: 0,
            encoding: "UTF-8".to_string(),
            item_template: None,
        }
    }
}

impl ParserConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(ParserConfig::default())`
    /// - Empty file → `Ok(ParserConfig::default())`
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
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect probable typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "cache_dir",
                "cache_lifetime_secs",
                "encoding",
                "item_template",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: ParserConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Enable caching under `dir` with the given lifetime in seconds.
    pub fn with_cache(mut self, dir: impl Into<PathBuf>, lifetime_secs: u64) -> Self {
        self.cache_dir = Some(dir.into());
        self.cache_lifetime_secs = lifetime_secs;
        self
    }

    /// Set the encoding label used to decode fetched bodies.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the item template used by the renderer.
    pub fn with_item_template(mut self, template: impl Into<String>) -> Self {
        self.item_template = Some(template.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
