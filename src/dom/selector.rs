//! Selector subset engine.
//!
//! Parses and evaluates exactly the grammar the fingerprint builder
//! emits: child-combinator chains of segments, where a segment is any
//! combination of `tag`, `#id`, `[attr="value"]` and `:nth-of-type(n)`.
//! Anything else is a parse error; stored selectors from a newer writer
//! degrade to the content strategy at the resolver level.

use thiserror::Error;

use super::node::{Document, NodeId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("selector `{selector}` is invalid: {reason}")]
pub struct SelectorParseError {
    pub selector: String,
    pub reason: String,
}

/// One segment of a child-combinator chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub attr: Option<(String, String)>,
    pub nth_of_type: Option<usize>,
}

impl Segment {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.attr.is_none() && self.nth_of_type.is_none()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if doc.tag_name(node) != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if let Some((name, value)) = &self.attr {
            if doc.attr(node, name) != Some(value.as_str()) {
                return false;
            }
        }
        if let Some(n) = self.nth_of_type {
            if doc.nth_of_type(node) != n {
                return false;
            }
        }
        true
    }
}

/// A parsed selector: segments joined by the child combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    segments: Vec<Segment>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(err(input, "empty selector"));
        }
        let segments = input
            .split(" > ")
            .map(|part| parse_segment(input, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// All attached elements matching this selector, in document order.
    pub fn query_all(&self, doc: &Document) -> Vec<NodeId> {
        let Some((first, rest)) = self.segments.split_first() else {
            return Vec::new();
        };
        let order = doc.traverse();
        let mut current: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|n| first.matches(doc, *n))
            .collect();
        for segment in rest {
            let mut next = Vec::new();
            for node in &current {
                for child in doc.children(*node) {
                    if segment.matches(doc, *child) && !next.contains(child) {
                        next.push(*child);
                    }
                }
            }
            current = next;
        }
        // Child lists of distinct parents never interleave in preorder,
        // but keep the guarantee explicit.
        let position = |n: &NodeId| order.iter().position(|o| o == n).unwrap_or(usize::MAX);
        current.sort_by_key(position);
        current
    }
}

fn err(selector: &str, reason: impl Into<String>) -> SelectorParseError {
    SelectorParseError {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

/// Characters allowed in emitted identifiers (tags, ids, attribute names).
pub(crate) fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

fn parse_segment(whole: &str, part: &str) -> Result<Segment, SelectorParseError> {
    let mut segment = Segment {
        tag: None,
        id: None,
        attr: None,
        nth_of_type: None,
    };
    let mut rest = part;

    // Leading tag name.
    let tag_end = rest
        .find(|c: char| c == '#' || c == '[' || c == ':')
        .unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if !is_ident(tag) {
            return Err(err(whole, format!("invalid tag name `{tag}`")));
        }
        segment.tag = Some(tag.to_ascii_lowercase());
        rest = &rest[tag_end..];
    }

    // `#id`
    if let Some(after) = rest.strip_prefix('#') {
        let end = after
            .find(|c: char| c == '[' || c == ':')
            .unwrap_or(after.len());
        let id = &after[..end];
        if !is_ident(id) {
            return Err(err(whole, format!("invalid id `{id}`")));
        }
        segment.id = Some(id.to_string());
        rest = &after[end..];
    }

    // `[attr="value"]`
    if let Some(after) = rest.strip_prefix('[') {
        let Some(close) = after.find(']') else {
            return Err(err(whole, "unterminated attribute selector"));
        };
        let body = &after[..close];
        let Some((name, quoted)) = body.split_once('=') else {
            return Err(err(whole, "attribute selector requires `=`"));
        };
        if !is_ident(name) {
            return Err(err(whole, format!("invalid attribute name `{name}`")));
        }
        let value = quoted
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| err(whole, "attribute value must be double-quoted"))?;
        if value.contains('"') || value.contains('\\') {
            return Err(err(whole, "attribute value must not contain quotes"));
        }
        segment.attr = Some((name.to_string(), value.to_string()));
        rest = &after[close + 1..];
    }

    // `:nth-of-type(n)`
    if let Some(after) = rest.strip_prefix(":nth-of-type(") {
        let Some(close) = after.find(')') else {
            return Err(err(whole, "unterminated :nth-of-type"));
        };
        let n: usize = after[..close]
            .parse()
            .map_err(|_| err(whole, "nth-of-type index must be a positive integer"))?;
        if n == 0 {
            return Err(err(whole, "nth-of-type index must be a positive integer"));
        }
        segment.nth_of_type = Some(n);
        rest = &after[close + 1..];
    }

    if !rest.is_empty() {
        return Err(err(whole, format!("unsupported trailing syntax `{rest}`")));
    }
    if segment.is_empty() {
        return Err(err(whole, "empty segment"));
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::DocumentBuilder;

    fn doc() -> Document {
        let mut b = DocumentBuilder::new();
        b.open("html");
        b.open("body");
        b.open("div");
        b.attr("id", "app");
        b.open("button");
        b.attr("data-testid", "save");
        b.text("Save");
        b.close();
        b.leaf("button", "Cancel");
        b.close();
        b.close();
        b.close();
        b.build()
    }

    #[test]
    fn id_selector_matches_one() {
        let doc = doc();
        let hits = Selector::parse("#app").unwrap().query_all(&doc);
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.tag_name(hits[0]), "div");
    }

    #[test]
    fn attribute_selector() {
        let doc = doc();
        let hits = Selector::parse("[data-testid=\"save\"]")
            .unwrap()
            .query_all(&doc);
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.text_content(hits[0]), "Save");
    }

    #[test]
    fn structural_chain_with_nth_of_type() {
        let doc = doc();
        let hits = Selector::parse("#app > button:nth-of-type(2)")
            .unwrap()
            .query_all(&doc);
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.text_content(hits[0]), "Cancel");
    }

    #[test]
    fn bare_tag_matches_in_document_order() {
        let doc = doc();
        let hits = Selector::parse("button").unwrap().query_all(&doc);
        assert_eq!(hits.len(), 2);
        assert_eq!(doc.text_content(hits[0]), "Save");
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div .class").is_err());
        assert!(Selector::parse("div:first-child").is_err());
        assert!(Selector::parse("button:nth-of-type(0)").is_err());
        assert!(Selector::parse("[attr='single']").is_err());
    }
}
