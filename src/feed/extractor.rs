//! Locates `<item>` blocks in a fetched document and delegates their inner
//! markup to the tag parser.

use regex::Regex;
use std::sync::LazyLock;

use super::tag_parser;
use super::types::{ChannelMeta, FeedDocument};
use super::FeedError;

/// Shortest match between an opening `<item ...>` and `</item>`, across
/// line boundaries. Attributes on the opening tag are allowed; the wrapper
/// itself is excluded by the capture group.
static ITEM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item[^>]*>(.*?)</item>").expect("valid regex"));

static CHANNEL_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.*?)</title>").expect("valid regex"));

static CHANNEL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<link>(.*?)</link>").expect("valid regex"));

static CHANNEL_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<description>(.*?)</description>").expect("valid regex"));

/// Parse a full feed body into channel metadata plus one record per item
/// block, in document order.
///
/// A feed without any `<item>` blocks is an error, not an empty result. A
/// parse failure inside any single item aborts the whole feed — there is no
/// skip-and-continue mode.
pub fn extract_feed(body: &str) -> Result<FeedDocument, FeedError> {
    let channel = channel_meta(body);

    let mut items = Vec::new();
    for caps in ITEM_BLOCK.captures_iter(body) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        items.push(tag_parser::parse_item(inner)?);
    }

    if items.is_empty() {
        return Err(FeedError::NoItems);
    }

    tracing::debug!(items = items.len(), "extracted feed items");
    Ok(FeedDocument { channel, items })
}

/// Channel-level `<title>`, `<link>`, `<description>` — first match wins,
/// which in a well-formed feed is the channel element (items come later in
/// the document). Best-effort: absence of any of these is not an error.
fn channel_meta(body: &str) -> ChannelMeta {
    let first = |re: &Regex| {
        re.captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    ChannelMeta {
        title: first(&CHANNEL_TITLE),
        link: first(&CHANNEL_LINK),
        description: first(&CHANNEL_DESCRIPTION),
    }
}
