//! Parsed feed data structures.
//!
//! Everything here follows a build-then-freeze discipline: records are
//! assembled during a single parse call and never mutated once handed to the
//! caller. `ItemRecord` and `Attributes` preserve first-seen key order, which
//! is significant for serialization and for callers iterating in document
//! order; no ordered-map crate is pulled in for what amounts to a handful of
//! entries per item.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The content of one parsed tag.
///
/// A tag holds either text (possibly empty, possibly from CDATA sections) or
/// a nested mapping of child tags — never both. Once the parser encounters a
/// nested child, the tag commits to `Nested` and any plain text is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagContent {
    /// Plain text content. Raw text is whitespace-trimmed at the outer level;
    /// CDATA-bearing content is kept verbatim. Entities are never decoded
    /// here — that is the renderer's job.
    Text(String),
    /// Child tags, when the tag contained markup instead of text.
    Nested(ItemRecord),
}

impl TagContent {
    /// The text content, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagContent::Text(s) => Some(s),
            TagContent::Nested(_) => None,
        }
    }

    /// The nested mapping, if this tag contained child tags.
    pub fn as_nested(&self) -> Option<&ItemRecord> {
        match self {
            TagContent::Text(_) => None,
            TagContent::Nested(rec) => Some(rec),
        }
    }
}

/// Tag attributes in document order.
///
/// Names are case-sensitive, exactly as written in the markup. An attribute
/// written without `="value"` is stored with a `None` value (serialized as
/// JSON null). Duplicate names keep the first position but take the last
/// value, mirroring mapping semantics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    entries: Vec<(String, Option<String>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an attribute. Overwrites keep the original
    /// position in iteration order.
    pub fn insert(&mut self, name: String, value: Option<String>) {
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up an attribute by exact name.
    ///
    /// Returns `None` when the attribute is absent, `Some(None)` when it was
    /// written without a value, and `Some(Some(v))` otherwise.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttrVisitor;

        impl<'de> Visitor<'de> for AttrVisitor {
            type Value = Attributes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of attribute names to string-or-null values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut attrs = Attributes::new();
                while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
                    attrs.insert(name, value);
                }
                Ok(attrs)
            }
        }

        deserializer.deserialize_map(AttrVisitor)
    }
}

/// One parsed tag occurrence: its content plus its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub content: TagContent,
    pub attributes: Attributes,
}

impl TagRecord {
    /// A record with text content and no attributes.
    pub fn text(content: impl Into<String>) -> Self {
        TagRecord {
            content: TagContent::Text(content.into()),
            attributes: Attributes::new(),
        }
    }

    /// A record whose content is a nested tag mapping.
    pub fn nested(children: ItemRecord) -> Self {
        TagRecord {
            content: TagContent::Nested(children),
            attributes: Attributes::new(),
        }
    }
}

/// The value stored under one tag name inside an [`ItemRecord`].
///
/// A tag name that occurred once maps to `Single`; on the second occurrence
/// the existing record is retroactively wrapped into a `Many` list and
/// subsequent occurrences append, preserving document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagSlot {
    Single(TagRecord),
    Many(Vec<TagRecord>),
}

impl TagSlot {
    /// The sole record, when the tag occurred exactly once.
    pub fn as_single(&self) -> Option<&TagRecord> {
        match self {
            TagSlot::Single(rec) => Some(rec),
            TagSlot::Many(_) => None,
        }
    }

    /// All records in document order, regardless of arity.
    pub fn records(&self) -> &[TagRecord] {
        match self {
            TagSlot::Single(rec) => std::slice::from_ref(rec),
            TagSlot::Many(recs) => recs,
        }
    }
}

/// A parsed item: tag name → record(s), in first-seen document order.
///
/// Keys may carry a namespace prefix (`dc:creator`); no namespace resolution
/// is performed — the prefixed name is the key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemRecord {
    entries: Vec<(String, TagSlot)>,
}

impl ItemRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit one parsed tag under `name`, applying the single→list
    /// promotion rule on repeated names.
    pub fn insert(&mut self, name: String, record: TagRecord) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => match slot {
                TagSlot::Single(existing) => {
                    let first = existing.clone();
                    *slot = TagSlot::Many(vec![first, record]);
                }
                TagSlot::Many(records) => records.push(record),
            },
            None => self.entries.push((name, TagSlot::Single(record))),
        }
    }

    /// Insert a pre-built slot verbatim (deserialization path — no
    /// promotion, the slot already has its final arity).
    fn set(&mut self, name: String, slot: TagSlot) {
        self.entries.push((name, slot));
    }

    pub fn get(&self, name: &str) -> Option<&TagSlot> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tag names and slots in first-seen document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagSlot)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }
}

impl Serialize for ItemRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, slot) in &self.entries {
            map.serialize_entry(name, slot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ItemRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ItemVisitor;

        impl<'de> Visitor<'de> for ItemVisitor {
            type Value = ItemRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of tag names to tag records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = ItemRecord::new();
                while let Some((name, slot)) = access.next_entry::<String, TagSlot>()? {
                    record.set(name, slot);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(ItemVisitor)
    }
}

/// Channel-level metadata extracted best-effort from the document head.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelMeta {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

/// The parsed feed: channel metadata plus one [`ItemRecord`] per `<item>`
/// block, in document order.
///
/// Note that a cache hit yields an empty [`ChannelMeta`] — only items are
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    pub channel: ChannelMeta,
    pub items: Vec<ItemRecord>,
}
