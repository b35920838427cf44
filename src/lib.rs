//! pluck — fetch an RSS feed and pull its items apart.
//!
//! The interesting parts are deliberately hand-rolled: feeds are retrieved
//! with a bare HTTP/1.0 GET over a raw socket (plaintext or TLS), and item
//! markup is tokenized by a character-driven state machine rather than an
//! XML library. Around that core sit the usual conveniences: a
//! freshness-windowed file cache, a `#{tag}`-placeholder template renderer,
//! and a TOML-backed configuration struct.
//!
//! ```no_run
//! use pluck::{ParserConfig, RssParser, render_items, DEFAULT_ITEM_TEMPLATE};
//!
//! let config = ParserConfig::default().with_cache("/tmp", 600);
//! let parser = RssParser::new(config)?;
//! let document = parser.parse("http://www.npr.org/rss/rss.php?id=1001")?;
//! print!("{}", render_items(&document.items, DEFAULT_ITEM_TEMPLATE, 0, 0));
//! # Ok::<(), pluck::FeedError>(())
//! ```
//!
//! Everything is synchronous and single-threaded: one `parse` call is one
//! blocking fetch-and-parse chain. Only connection establishment is
//! time-bounded; a caller needing bounded latency should wrap the call in
//! an external timeout.

pub mod cache;
pub mod config;
pub mod feed;
pub mod http;
pub mod render;

pub use cache::{CacheError, FeedCache};
pub use config::{ConfigError, ParserConfig};
pub use feed::{
    Attributes, ChannelMeta, FeedDocument, FeedError, ItemRecord, ParseError, RssParser,
    TagContent, TagRecord, TagSlot,
};
pub use http::{FetchError, HttpResponse};
pub use render::{render_items, DEFAULT_ITEM_TEMPLATE};
