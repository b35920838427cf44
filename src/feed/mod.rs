//! Feed acquisition and parsing.
//!
//! This module ties the whole pipeline together:
//!
//! - **Fetching**: raw HTTP/1.0 retrieval with redirect following ([`crate::http`])
//! - **Extraction**: locating `<item>` blocks in the fetched document ([`extractor`])
//! - **Parsing**: the character-driven tag state machine ([`tag_parser`])
//!
//! [`RssParser`] is the public entry point: configure it once, then call
//! [`RssParser::parse`] per feed URL. Parsing is a single blocking call
//! chain — no internal concurrency, no partial results. A configured cache
//! short-circuits the fetch entirely when a fresh entry exists.

mod extractor;
mod tag_parser;
mod types;

pub use extractor::extract_feed;
pub use tag_parser::{parse_item, ParseError};
pub use types::{
    Attributes, ChannelMeta, FeedDocument, ItemRecord, TagContent, TagRecord, TagSlot,
};

use encoding_rs::{Encoding, UTF_8};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cache::{CacheError, FeedCache};
use crate::config::ParserConfig;
use crate::http::{self, FetchError};

/// Errors surfaced by a full fetch-and-parse cycle. All are fatal to the
/// current [`RssParser::parse`] call; nothing is downgraded or skipped.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme '{0}' (only http and https)")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A successfully fetched document with zero `<item>` blocks.
    #[error("no <item> elements found in feed content")]
    NoItems,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Fetches and parses RSS feeds according to a [`ParserConfig`].
///
/// ```no_run
/// use pluck::{ParserConfig, RssParser};
///
/// let parser = RssParser::new(ParserConfig::default())?;
/// let document = parser.parse("http://example.com/rss.xml")?;
/// for item in &document.items {
///     if let Some(slot) = item.get("title") {
///         println!("{:?}", slot.records()[0].content.as_text());
///     }
/// }
/// # Ok::<(), pluck::FeedError>(())
/// ```
pub struct RssParser {
    config: ParserConfig,
    cache: Option<FeedCache>,
}

impl RssParser {
    /// Build a parser. The cache is enabled only when the config carries
    /// both a cache directory and a nonzero lifetime; the directory must
    /// already exist.
    pub fn new(config: ParserConfig) -> Result<Self, FeedError> {
        let cache = match (&config.cache_dir, config.cache_lifetime_secs) {
            (Some(dir), secs) if secs > 0 => {
                Some(FeedCache::new(dir, Duration::from_secs(secs))?)
            }
            _ => None,
        };
        Ok(RssParser { config, cache })
    }

    /// Fetch and parse one feed.
    ///
    /// A fresh cache entry (keyed by the originally requested URL, not any
    /// post-redirect URL) bypasses the network entirely; cached results
    /// carry items only, so [`FeedDocument::channel`] is empty on a hit.
    /// Cache write failures are logged and do not fail the parse.
    pub fn parse(&self, url: &str) -> Result<FeedDocument, FeedError> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(FeedError::UnsupportedScheme(scheme.to_owned())),
        }

        if let Some(cache) = &self.cache {
            if let Some(items) = cache.read(&url) {
                tracing::info!(url = %url, items = items.len(), "serving feed from cache");
                return Ok(FeedDocument {
                    channel: ChannelMeta::default(),
                    items,
                });
            }
        }

        let response = http::fetch(&url)?;
        let body = decode_body(&response.body, &self.config.encoding);
        let document = extract_feed(&body)?;
        tracing::info!(url = %url, items = document.items.len(), "feed parsed");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(&url, &document.items) {
                tracing::warn!(url = %url, error = %e, "cache write failed, continuing");
            }
        }

        Ok(document)
    }
}

/// Decode the raw body with the configured encoding, falling back to UTF-8
/// (lossy) when the label is unknown.
fn decode_body(raw: &[u8], encoding_label: &str) -> String {
    let encoding = Encoding::for_label(encoding_label.as_bytes()).unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(raw);
    if had_errors {
        tracing::warn!(encoding = encoding.name(), "body contained undecodable bytes");
    }
    text.into_owned()
}
