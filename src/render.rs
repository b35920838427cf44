//! HTML template rendering for parsed feed items.
//!
//! Templates address item data with `#{tagName}` (the tag's text content)
//! and `#{tagName.attributeName}` (an attribute value). Substituted values
//! are HTML-entity decoded here — and only here; the parser hands text
//! through raw. Unknown placeholders render as empty strings rather than
//! failing, so one template can serve feeds with slightly different tag
//! vocabularies.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::feed::{ItemRecord, TagContent};

/// `#{...}` placeholder; the interior may be any non-`}` run, including
/// namespace prefixes and a `.attribute` suffix.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\{([^}]+)\}").expect("valid regex"));

/// Fallback template when none is configured.
pub const DEFAULT_ITEM_TEMPLATE: &str =
    "<a href=\"#{link}\" target=\"_new\">#{title}</a><br>#{description}<br><br>\n";

/// Render a window of items through the template, concatenated in order.
///
/// `limit == 0` means all items; `offset` skips leading items.
pub fn render_items(items: &[ItemRecord], template: &str, limit: usize, offset: usize) -> String {
    let count = if limit == 0 { items.len() } else { limit };

    let mut out = String::new();
    for item in items.iter().skip(offset).take(count) {
        out.push_str(&render_one(item, template));
    }
    out
}

fn render_one(item: &ItemRecord, template: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            let value = lookup(item, key).unwrap_or_else(|| {
                tracing::debug!(placeholder = key, "no value for placeholder, substituting empty");
                String::new()
            });
            html_escape::decode_html_entities(&value).into_owned()
        })
        .into_owned()
}

/// Resolve one placeholder against an item. Only single-occurrence tags with
/// text content are addressable; repeated tags and nested mappings yield
/// nothing. A valueless attribute renders as an empty string.
fn lookup(item: &ItemRecord, key: &str) -> Option<String> {
    match key.split_once('.') {
        Some((tag, attr)) => {
            let record = item.get(tag)?.as_single()?;
            let value = record.attributes.get(attr)?;
            Some(value.unwrap_or_default().to_string())
        }
        None => match &item.get(key)?.as_single()?.content {
            TagContent::Text(text) => Some(text.clone()),
            TagContent::Nested(_) => None,
        },
    }
}
