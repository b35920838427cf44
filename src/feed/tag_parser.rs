//! Character-driven state machine for parsing the inside of an `<item>`
//! block.
//!
//! This is deliberately not an XML parser: no namespace resolution, no DTD,
//! no entity expansion. It tokenizes a well-formed fragment of feed markup
//! into [`ItemRecord`] mappings, recursing into nested child tags and
//! passing CDATA interiors through verbatim.
//!
//! The machine holds only call-local state (cursor, accumulators, one stack
//! frame per nesting level), so it is reentrant and safe to run over
//! independent fragments concurrently.

use thiserror::Error;

use super::types::{Attributes, ItemRecord, TagContent, TagRecord};

/// The literal CDATA opener, matched character-for-character.
const CDATA_OPEN: [char; 9] = ['<', '!', '[', 'C', 'D', 'A', 'T', 'A', '['];

/// Errors raised while tokenizing item markup.
///
/// Every variant carries the character offset and the machine state it was
/// raised from, which is usually enough to locate the problem in the feed
/// without a debugger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected '<' at offset {pos}, got '{found}'")]
    ExpectedOpenAngle { found: char, pos: usize },

    #[error("unexpected character '{found}' at offset {pos} in {state}")]
    UnexpectedChar {
        found: char,
        state: &'static str,
        pos: usize,
    },

    #[error("mismatched closing tag at offset {pos}: expected </{expected}>, got </{found}>")]
    MismatchedCloseTag {
        expected: String,
        found: String,
        pos: usize,
    },

    #[error("unexpected end of input in {state}")]
    UnexpectedEof { state: &'static str },
}

/// Machine states. One state per decision point in the grammar; transitions
/// are driven one character at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Skipping whitespace, waiting for the `<` of the next sibling tag.
    AwaitTag,
    /// Accumulating the tag name after `<`.
    TagName,
    /// Saw `/` inside an opening tag; only `>` may follow.
    EmptyTagGt,
    /// Between attributes: whitespace, `>`, `/`, or the start of a name.
    AttrNameStart,
    /// Accumulating an attribute name.
    AttrName,
    /// After `name ` — expecting `=`, `/`, or `>`.
    AttrEquals,
    /// After `name=` — expecting the opening quote.
    AttrValueQuote,
    /// Accumulating an attribute value until the matching quote.
    AttrValue { quote: char },
    /// Accumulating text content until `<`.
    Content,
    /// Inside `<![CDATA[ ... ]]>`; interior is opaque.
    Cdata,
    /// Saw `<` in content: either the real closing tag or a nested child.
    CloseOrChild,
    /// Accumulating the closing tag name until `>`.
    CloseTagName,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::AwaitTag => "await_tag",
            State::TagName => "tag_name",
            State::EmptyTagGt => "empty_tag_gt",
            State::AttrNameStart => "attr_name_start",
            State::AttrName => "attr_name",
            State::AttrEquals => "attr_equals",
            State::AttrValueQuote => "attr_value_quote",
            State::AttrValue { .. } => "attr_value",
            State::Content => "content",
            State::Cdata => "cdata",
            State::CloseOrChild => "close_or_child",
            State::CloseTagName => "close_tag_name",
        }
    }
}

/// Parse the inner markup of one `<item>` block into an [`ItemRecord`].
///
/// The fragment must be fully balanced: every opened tag closed, every CDATA
/// section terminated. Whitespace between sibling tags is ignored; anything
/// else outside a tag is an error.
pub fn parse_item(input: &str) -> Result<ItemRecord, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let (record, _consumed) = parse_tags(&chars, 0, false)?;
    Ok(record)
}

/// The machine proper. `start` is the offset to begin scanning at; a nested
/// call parses exactly one tag and returns the offset just past its closing
/// `>`, so the caller can resume scanning for siblings. The cursor is
/// threaded through return values rather than shared state.
fn parse_tags(
    chars: &[char],
    start: usize,
    nested_call: bool,
) -> Result<(ItemRecord, usize), ParseError> {
    let mut tags = ItemRecord::new();
    let mut state = State::AwaitTag;

    // Per-tag accumulators, reset when a new `<` is seen at the top level.
    let mut tag_name = String::new();
    let mut text = String::new();
    let mut cdata_seen = false;
    let mut nested: Option<ItemRecord> = None;
    let mut attrs = Attributes::new();
    let mut attr_name = String::new();
    let mut attr_value = String::new();
    let mut close_name = String::new();

    let mut i = start;
    while i < chars.len() {
        let c = chars[i];

        match state {
            State::AwaitTag => {
                if c == '<' {
                    tag_name.clear();
                    text.clear();
                    cdata_seen = false;
                    nested = None;
                    attrs = Attributes::new();
                    state = State::TagName;
                } else if !c.is_whitespace() {
                    return Err(ParseError::ExpectedOpenAngle { found: c, pos: i });
                }
            }

            State::TagName => match c {
                '/' => state = State::EmptyTagGt,
                '>' => state = State::Content,
                ' ' => state = State::AttrNameStart,
                _ => tag_name.push(c),
            },

            State::EmptyTagGt => {
                if c == '>' {
                    commit_tag(
                        &mut tags,
                        &mut tag_name,
                        &mut text,
                        cdata_seen,
                        &mut nested,
                        &mut attrs,
                    );
                    if nested_call {
                        return Ok((tags, i + 1));
                    }
                    state = State::AwaitTag;
                } else if !c.is_whitespace() {
                    return Err(ParseError::UnexpectedChar {
                        found: c,
                        state: state.name(),
                        pos: i,
                    });
                }
            }

            State::AttrNameStart => {
                if c == '>' {
                    state = State::Content;
                } else if c == '/' {
                    state = State::EmptyTagGt;
                } else if c.is_ascii_alphabetic() || c == '_' {
                    attr_name.clear();
                    attr_value.clear();
                    attr_name.push(c);
                    state = State::AttrName;
                } else if !c.is_whitespace() {
                    return Err(ParseError::UnexpectedChar {
                        found: c,
                        state: state.name(),
                        pos: i,
                    });
                }
            }

            State::AttrName => {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    attr_name.push(c);
                } else if c == ' ' {
                    state = State::AttrEquals;
                } else if c == '=' {
                    state = State::AttrValueQuote;
                } else if c == '/' {
                    attrs.insert(std::mem::take(&mut attr_name), None);
                    state = State::EmptyTagGt;
                } else if c == '>' {
                    attrs.insert(std::mem::take(&mut attr_name), None);
                    state = State::Content;
                } else {
                    return Err(ParseError::UnexpectedChar {
                        found: c,
                        state: state.name(),
                        pos: i,
                    });
                }
            }

            State::AttrEquals => {
                if c == '=' {
                    state = State::AttrValueQuote;
                } else if c == '/' {
                    attrs.insert(std::mem::take(&mut attr_name), None);
                    state = State::EmptyTagGt;
                } else if c == '>' {
                    attrs.insert(std::mem::take(&mut attr_name), None);
                    state = State::Content;
                } else {
                    return Err(ParseError::UnexpectedChar {
                        found: c,
                        state: state.name(),
                        pos: i,
                    });
                }
            }

            State::AttrValueQuote => {
                if c == '"' || c == '\'' {
                    state = State::AttrValue { quote: c };
                } else if !c.is_whitespace() {
                    return Err(ParseError::UnexpectedChar {
                        found: c,
                        state: state.name(),
                        pos: i,
                    });
                }
            }

            State::AttrValue { quote } => {
                if c == quote {
                    attrs.insert(
                        std::mem::take(&mut attr_name),
                        Some(std::mem::take(&mut attr_value)),
                    );
                    state = State::AttrNameStart;
                } else {
                    attr_value.push(c);
                }
            }

            State::Content => {
                if c == '<' {
                    if chars[i..].starts_with(&CDATA_OPEN) {
                        cdata_seen = true;
                        state = State::Cdata;
                        i += CDATA_OPEN.len();
                        continue;
                    }
                    state = State::CloseOrChild;
                } else if nested.is_none() {
                    text.push(c);
                }
            }

            State::Cdata => {
                if c == ']' && i + 3 <= chars.len() && chars[i + 1] == ']' && chars[i + 2] == '>' {
                    i += 3;
                    state = State::Content;
                    continue;
                } else if nested.is_none() {
                    text.push(c);
                }
            }

            State::CloseOrChild => {
                if c == '/' {
                    close_name.clear();
                    state = State::CloseTagName;
                } else {
                    // Nested child tag: re-enter the machine at the `<` that
                    // brought us here. The child's mapping replaces any text
                    // (and any earlier child mapping) accumulated for this
                    // tag; mixed content is not preserved.
                    let (children, end) = parse_tags(chars, i - 1, true)?;
                    nested = Some(children);
                    state = State::Content;
                    i = end;
                    continue;
                }
            }

            State::CloseTagName => {
                if c == '>' {
                    if close_name != tag_name {
                        return Err(ParseError::MismatchedCloseTag {
                            expected: std::mem::take(&mut tag_name),
                            found: std::mem::take(&mut close_name),
                            pos: i,
                        });
                    }
                    commit_tag(
                        &mut tags,
                        &mut tag_name,
                        &mut text,
                        cdata_seen,
                        &mut nested,
                        &mut attrs,
                    );
                    if nested_call {
                        return Ok((tags, i + 1));
                    }
                    state = State::AwaitTag;
                } else {
                    close_name.push(c);
                }
            }
        }

        i += 1;
    }

    if state != State::AwaitTag {
        return Err(ParseError::UnexpectedEof { state: state.name() });
    }

    Ok((tags, i))
}

/// Build the finished [`TagRecord`] and fold it into the mapping. Plain text
/// is trimmed; CDATA-bearing text and nested mappings are committed as-is.
fn commit_tag(
    tags: &mut ItemRecord,
    tag_name: &mut String,
    text: &mut String,
    cdata_seen: bool,
    nested: &mut Option<ItemRecord>,
    attrs: &mut Attributes,
) {
    let content = match nested.take() {
        Some(children) => TagContent::Nested(children),
        None if cdata_seen => TagContent::Text(std::mem::take(text)),
        None => {
            let trimmed = text.trim().to_string();
            text.clear();
            TagContent::Text(trimmed)
        }
    };

    let record = TagRecord {
        content,
        attributes: std::mem::take(attrs),
    };
    tags.insert(std::mem::take(tag_name), record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::TagSlot;
    use pretty_assertions::assert_eq;

    fn text_of<'a>(item: &'a ItemRecord, name: &str) -> &'a str {
        item.get(name)
            .unwrap()
            .as_single()
            .unwrap()
            .content
            .as_text()
            .unwrap()
    }

    #[test]
    fn single_tag_yields_bare_record() {
        let item = parse_item("<title>Hello</title>").unwrap();
        assert_eq!(item.len(), 1);
        assert!(matches!(item.get("title"), Some(TagSlot::Single(_))));
        assert_eq!(text_of(&item, "title"), "Hello");
    }

    #[test]
    fn content_is_trimmed_but_not_entity_decoded() {
        let item = parse_item("<title>  Hello &amp; World\n</title>").unwrap();
        assert_eq!(text_of(&item, "title"), "Hello &amp; World");
    }

    #[test]
    fn repeated_tag_yields_ordered_list() {
        let item =
            parse_item("<category>one</category><category>two</category>").unwrap();
        let slot = item.get("category").unwrap();
        assert!(matches!(slot, TagSlot::Many(_)));
        let texts: Vec<_> = slot
            .records()
            .iter()
            .map(|r| r.content.as_text().unwrap())
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn namespaced_tag_name_is_the_key() {
        let item = parse_item("<dc:creator>Someone</dc:creator>").unwrap();
        assert_eq!(text_of(&item, "dc:creator"), "Someone");
    }

    #[test]
    fn cdata_is_verbatim_and_never_retokenized() {
        let item =
            parse_item("<description><![CDATA[<b>bold</b>]]></description>").unwrap();
        assert_eq!(text_of(&item, "description"), "<b>bold</b>");
    }

    #[test]
    fn cdata_interior_is_not_trimmed() {
        let item = parse_item("<description><![CDATA[  spaced  ]]></description>").unwrap();
        assert_eq!(text_of(&item, "description"), "  spaced  ");
    }

    #[test]
    fn cdata_with_lone_brackets() {
        let item = parse_item("<d><![CDATA[a]]b]]]>]]></d>").unwrap();
        assert_eq!(text_of(&item, "d"), "a]]b]]]>");
    }

    #[test]
    fn unterminated_cdata_is_fatal() {
        let err = parse_item("<d><![CDATA[never closed</d>").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { state: "cdata" });
    }

    #[test]
    fn self_closing_tag_with_attributes() {
        let item =
            parse_item(r#"<media:thumbnail url="http://x/y.jpg" height="50"/>"#).unwrap();
        let rec = item.get("media:thumbnail").unwrap().as_single().unwrap();
        assert_eq!(rec.content.as_text(), Some(""));
        assert_eq!(rec.attributes.get("url"), Some(Some("http://x/y.jpg")));
        assert_eq!(rec.attributes.get("height"), Some(Some("50")));
    }

    #[test]
    fn self_closing_with_space_before_gt() {
        let item = parse_item(r#"<enclosure url="http://x/a.mp3" />"#).unwrap();
        let rec = item.get("enclosure").unwrap().as_single().unwrap();
        assert_eq!(rec.attributes.get("url"), Some(Some("http://x/a.mp3")));
    }

    #[test]
    fn single_quoted_attribute_value() {
        let item = parse_item(r#"<link href='http://a/b'></link>"#).unwrap();
        let rec = item.get("link").unwrap().as_single().unwrap();
        assert_eq!(rec.attributes.get("href"), Some(Some("http://a/b")));
    }

    #[test]
    fn attribute_value_may_contain_other_quote_kind() {
        let item = parse_item(r#"<a title="it's fine"></a>"#).unwrap();
        let rec = item.get("a").unwrap().as_single().unwrap();
        assert_eq!(rec.attributes.get("title"), Some(Some("it's fine")));
    }

    #[test]
    fn bare_attribute_gets_null_value() {
        let item = parse_item("<guid isPermaLink>x</guid>").unwrap();
        let rec = item.get("guid").unwrap().as_single().unwrap();
        assert_eq!(rec.attributes.get("isPermaLink"), Some(None));
        assert_eq!(rec.content.as_text(), Some("x"));
    }

    #[test]
    fn bare_attribute_before_self_close() {
        let item = parse_item("<flag standalone/>").unwrap();
        let rec = item.get("flag").unwrap().as_single().unwrap();
        assert_eq!(rec.attributes.get("standalone"), Some(None));
    }

    #[test]
    fn nested_tags_become_nested_mapping() {
        let item = parse_item("<outer><inner>x</inner></outer>").unwrap();
        let outer = item.get("outer").unwrap().as_single().unwrap();
        let nested = outer.content.as_nested().unwrap();
        assert_eq!(
            nested.get("inner").unwrap().as_single().unwrap().content.as_text(),
            Some("x")
        );
    }

    #[test]
    fn text_before_nested_tag_is_discarded() {
        // Mixed content: the nested mapping wins, accumulated text is lost.
        let item = parse_item("<outer>some text<inner>x</inner></outer>").unwrap();
        let outer = item.get("outer").unwrap().as_single().unwrap();
        assert!(outer.content.as_nested().is_some());
    }

    #[test]
    fn sibling_tags_at_top_level_all_kept() {
        let item = parse_item(
            "<title>t</title>\n  <link>http://a</link>\n  <pubDate>now</pubDate>",
        )
        .unwrap();
        assert_eq!(item.len(), 3);
        let keys: Vec<_> = item.iter().map(|(n, _)| n).collect();
        assert_eq!(keys, vec!["title", "link", "pubDate"]);
    }

    #[test]
    fn whitespace_only_input_is_empty_record() {
        let item = parse_item("  \n\t ").unwrap();
        assert!(item.is_empty());
    }

    #[test]
    fn mismatched_close_tag_names_both_tags() {
        let err = parse_item("<a>text</b>").unwrap_err();
        match err {
            ParseError::MismatchedCloseTag { expected, found, .. } => {
                assert_eq!(expected, "a");
                assert_eq!(found, "b");
            }
            other => panic!("expected MismatchedCloseTag, got {other:?}"),
        }
    }

    #[test]
    fn stray_text_at_top_level_is_fatal() {
        let err = parse_item("hello <a>x</a>").unwrap_err();
        assert_eq!(err, ParseError::ExpectedOpenAngle { found: 'h', pos: 0 });
    }

    #[test]
    fn unclosed_tag_reports_state() {
        let err = parse_item("<a>text").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { state: "content" });
    }

    #[test]
    fn truncated_open_tag_reports_state() {
        let err = parse_item("<a href=\"x").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { state: "attr_value" });
    }

    #[test]
    fn garbage_in_attribute_position_is_fatal() {
        let err = parse_item("<a 1bad=\"x\">y</a>").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedChar { found: '1', state: "attr_name_start", .. }
        ));
    }

    #[test]
    fn empty_tag_pair_yields_empty_text() {
        let item = parse_item("<comments></comments>").unwrap();
        assert_eq!(text_of(&item, "comments"), "");
    }

    #[test]
    fn deeply_nested_structure() {
        let item = parse_item("<a><b><c><d>leaf</d></c></b></a>").unwrap();
        let b = item.get("a").unwrap().as_single().unwrap().content.as_nested().unwrap();
        let c = b.get("b").unwrap().as_single().unwrap().content.as_nested().unwrap();
        let d = c.get("c").unwrap().as_single().unwrap().content.as_nested().unwrap();
        assert_eq!(
            d.get("d").unwrap().as_single().unwrap().content.as_text(),
            Some("leaf")
        );
    }

    #[test]
    fn nested_child_followed_by_close_without_whitespace() {
        let item = parse_item("<a><b>x</b></a>").unwrap();
        let nested = item.get("a").unwrap().as_single().unwrap().content.as_nested().unwrap();
        assert_eq!(
            nested.get("b").unwrap().as_single().unwrap().content.as_text(),
            Some("x")
        );
    }

    #[test]
    fn multibyte_content_and_positions() {
        let item = parse_item("<title>café ☕</title>").unwrap();
        assert_eq!(text_of(&item, "title"), "café ☕");
    }

    mod idempotence {
        use super::*;
        use proptest::prelude::*;

        /// Re-serialize a parsed record as equivalent markup.
        fn to_markup(item: &ItemRecord) -> String {
            let mut out = String::new();
            for (name, slot) in item.iter() {
                for record in slot.records() {
                    out.push('<');
                    out.push_str(name);
                    for (attr, value) in record.attributes.iter() {
                        out.push(' ');
                        out.push_str(attr);
                        if let Some(v) = value {
                            out.push_str("=\"");
                            out.push_str(v);
                            out.push('"');
                        }
                    }
                    out.push('>');
                    match &record.content {
                        TagContent::Text(t) => out.push_str(t),
                        TagContent::Nested(children) => out.push_str(&to_markup(children)),
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            out
        }

        proptest! {
            // Parse, re-serialize, re-parse: the two records must agree.
            #[test]
            fn parse_serialize_parse_is_identity(
                tags in prop::collection::vec(
                    ("[a-z][a-z0-9]{0,7}", "[ -;=?-~]{0,40}"),
                    1..8,
                )
            ) {
                let mut markup = String::new();
                for (name, text) in &tags {
                    markup.push_str(&format!("<{name}>{text}</{name}>"));
                }

                let first = parse_item(&markup).unwrap();
                let second = parse_item(&to_markup(&first)).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn attributed_tags_round_trip(
                name in "[a-z]{1,8}",
                attr in "[a-z][a-z0-9_-]{0,7}",
                value in "[ -!#-;=?-~]{0,20}",
                text in "[ -;=?-~]{0,30}",
            ) {
                let markup = format!("<{name} {attr}=\"{value}\">{text}</{name}>");
                let first = parse_item(&markup).unwrap();
                let second = parse_item(&to_markup(&first)).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
