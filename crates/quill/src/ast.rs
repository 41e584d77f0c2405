//! The structured document tree.
//!
//! Every format supported by the engine reads into, and writes from, this
//! one value type. Equality is derived, so two documents are equal exactly
//! when their trees are structurally identical (blocks, inlines, and
//! metadata, recursively) regardless of how either was serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document metadata: an ordered mapping from field name to value.
pub type Meta = BTreeMap<String, MetaValue>;

/// Attributes attached to a structural element: an optional identifier,
/// an ordered class list, and key-value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    /// Element identifier (the `#id` part of an attribute block).
    #[serde(default)]
    pub identifier: String,
    /// Ordered class list (the `.class` parts).
    #[serde(default)]
    pub classes: Vec<String>,
    /// Key-value attributes, in source order.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

impl Attr {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an attribute set with only an identifier.
    pub fn with_identifier(id: impl Into<String>) -> Self {
        Self {
            identifier: id.into(),
            ..Self::default()
        }
    }

    /// Looks up a key-value attribute by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no identifier, classes, or attributes are set.
    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    /// A plain string leaf.
    MetaString(String),
    /// A boolean leaf.
    MetaBool(bool),
    /// An ordered list of values.
    MetaList(Vec<MetaValue>),
    /// A nested mapping.
    MetaMap(BTreeMap<String, MetaValue>),
    /// Rich inline content (produced by readers that parse metadata text).
    MetaInlines(Vec<Inline>),
}

impl MetaValue {
    /// Interprets this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::MetaBool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interprets this value as a string, flattening inline content.
    pub fn as_str(&self) -> Option<String> {
        match self {
            MetaValue::MetaString(s) => Some(s.clone()),
            MetaValue::MetaInlines(inlines) => Some(inlines_to_text(inlines)),
            _ => None,
        }
    }
}

/// Inline content within a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    /// Literal text.
    Str(String),
    /// Emphasized content.
    Emph(Vec<Inline>),
    /// Strongly emphasized content.
    Strong(Vec<Inline>),
    /// Inline code span.
    Code(Attr, String),
    /// A soft line break (line wrapping within a paragraph).
    SoftBreak,
    /// A hard line break.
    LineBreak,
    /// A link: attributes, link text, destination URL.
    Link(Attr, Vec<Inline>, String),
    /// An image: attributes, alt text, source URL.
    Image(Attr, Vec<Inline>, String),
    /// Raw content in a named format, passed through verbatim.
    RawInline(String, String),
}

/// A block-level element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// A paragraph.
    Para(Vec<Inline>),
    /// A heading: level (1-6), attributes, content.
    Header(u8, Attr, Vec<Inline>),
    /// A fenced code block: attributes and literal text.
    CodeBlock(Attr, String),
    /// A generic attributed container of blocks.
    Div(Attr, Vec<Block>),
    /// A block quote.
    BlockQuote(Vec<Block>),
    /// An unordered list of items.
    BulletList(Vec<Vec<Block>>),
    /// An ordered list: starting number and items.
    OrderedList(u64, Vec<Vec<Block>>),
    /// Raw content in a named format, passed through verbatim.
    RawBlock(String, String),
    /// A thematic break.
    HorizontalRule,
}

impl Block {
    /// Returns the attributes of this block, for block kinds that carry any.
    pub fn attr(&self) -> Option<&Attr> {
        match self {
            Block::Header(_, attr, _) | Block::CodeBlock(attr, _) | Block::Div(attr, _) => {
                Some(attr)
            }
            _ => None,
        }
    }
}

/// A complete document: metadata plus a sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata.
    #[serde(default)]
    pub meta: Meta,
    /// Document body.
    pub blocks: Vec<Block>,
}

impl Document {
    /// Creates a document with the given blocks and empty metadata.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            meta: Meta::new(),
            blocks,
        }
    }

    /// Sets the metadata, builder style.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// Merges adjacent `Str` inlines into single runs.
///
/// Readers call this so that textual content has a canonical shape: the
/// events a streaming parser emits can split one run of text arbitrarily,
/// and structural equality must not depend on where those splits fell.
pub fn coalesce_strs(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        let inline = match inline {
            Inline::Emph(inner) => Inline::Emph(coalesce_strs(inner)),
            Inline::Strong(inner) => Inline::Strong(coalesce_strs(inner)),
            Inline::Link(attr, inner, url) => Inline::Link(attr, coalesce_strs(inner), url),
            Inline::Image(attr, inner, url) => Inline::Image(attr, coalesce_strs(inner), url),
            other => other,
        };
        match (out.last_mut(), inline) {
            (Some(Inline::Str(prev)), Inline::Str(next)) => prev.push_str(&next),
            (_, inline) => out.push(inline),
        }
    }
    out
}

/// Flattens inline content to plain text (spaces for breaks, code verbatim).
pub fn inlines_to_text(inlines: &[Inline]) -> String {
    let mut text = String::new();
    for inline in inlines {
        match inline {
            Inline::Str(s) => text.push_str(s),
            Inline::Emph(inner) | Inline::Strong(inner) => {
                text.push_str(&inlines_to_text(inner));
            }
            Inline::Code(_, s) => text.push_str(s),
            Inline::SoftBreak | Inline::LineBreak => text.push(' '),
            Inline::Link(_, inner, _) | Inline::Image(_, inner, _) => {
                text.push_str(&inlines_to_text(inner));
            }
            Inline::RawInline(_, s) => text.push_str(s),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_get_finds_key() {
        let attr = Attr {
            identifier: "input".into(),
            classes: vec!["markdown".into()],
            attributes: vec![("extensions".into(), "-smart".into())],
        };
        assert_eq!(attr.get("extensions"), Some("-smart"));
        assert_eq!(attr.get("format"), None);
    }

    #[test]
    fn structural_equality_ignores_nothing() {
        let a = Document::new(vec![Block::Para(vec![Inline::Str("hi".into())])]);
        let b = Document::new(vec![Block::Para(vec![Inline::Str("hi".into())])]);
        assert_eq!(a, b);

        let c = Document::new(vec![Block::Para(vec![Inline::Str("hi ".into())])]);
        assert_ne!(a, c);
    }

    #[test]
    fn coalesce_merges_adjacent_text() {
        let merged = coalesce_strs(vec![
            Inline::Str("foo".into()),
            Inline::Str(" ".into()),
            Inline::Str("bar".into()),
            Inline::Emph(vec![Inline::Str("a".into()), Inline::Str("b".into())]),
        ]);
        assert_eq!(
            merged,
            vec![
                Inline::Str("foo bar".into()),
                Inline::Emph(vec![Inline::Str("ab".into())]),
            ]
        );
    }

    #[test]
    fn inlines_flatten_to_text() {
        let inlines = vec![
            Inline::Str("a".into()),
            Inline::SoftBreak,
            Inline::Emph(vec![Inline::Str("b".into())]),
        ];
        assert_eq!(inlines_to_text(&inlines), "a b");
    }
}
