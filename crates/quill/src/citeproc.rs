//! Citation processing.
//!
//! Resolves the `references` metadata field into a terminal "References"
//! section. Entries are metadata maps with `id`, `author`, `title`, and
//! `year` fields, all optional. Documents without references pass through
//! unchanged, as do documents that already carry a references section, so
//! the pass is idempotent.

use tracing::debug;

use crate::ast::{Attr, Block, Document, Inline, MetaValue};

const SECTION_IDENTIFIER: &str = "references";

/// Appends a references section derived from the `references` metadata.
pub fn process_citations(mut document: Document) -> Document {
    let Some(MetaValue::MetaList(entries)) = document.meta.get("references") else {
        return document;
    };
    let already_resolved = document
        .blocks
        .iter()
        .any(|b| matches!(b.attr(), Some(attr) if attr.identifier == SECTION_IDENTIFIER));
    if already_resolved {
        return document;
    }
    debug!(count = entries.len(), "resolving references");

    let mut blocks = vec![Block::Header(
        1,
        Attr::with_identifier(SECTION_IDENTIFIER),
        vec![Inline::Str("References".into())],
    )];
    for entry in entries {
        if let Some(text) = format_entry(entry) {
            blocks.push(Block::Para(vec![Inline::Str(text)]));
        }
    }
    document.blocks.extend(blocks);
    document
}

fn format_entry(entry: &MetaValue) -> Option<String> {
    let MetaValue::MetaMap(fields) = entry else {
        return entry.as_str();
    };
    let mut parts = Vec::new();
    for field in ["author", "year", "title"] {
        if let Some(text) = fields.get(field).and_then(MetaValue::as_str) {
            parts.push(text);
        }
    }
    if parts.is_empty() {
        fields.get("id").and_then(MetaValue::as_str)
    } else {
        Some(format!("{}.", parts.join(". ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Meta;
    use std::collections::BTreeMap;

    fn doc_with_reference() -> Document {
        let mut fields = BTreeMap::new();
        fields.insert("author".into(), MetaValue::MetaString("Doe, J.".into()));
        fields.insert("title".into(), MetaValue::MetaString("On Tests".into()));
        let mut meta = Meta::new();
        meta.insert(
            "references".into(),
            MetaValue::MetaList(vec![MetaValue::MetaMap(fields)]),
        );
        Document::new(vec![]).with_meta(meta)
    }

    #[test]
    fn appends_references_section() {
        let doc = process_citations(doc_with_reference());
        assert!(matches!(
            &doc.blocks[0],
            Block::Header(1, attr, _) if attr.identifier == "references"
        ));
        assert_eq!(
            doc.blocks[1],
            Block::Para(vec![Inline::Str("Doe, J.. On Tests.".into())])
        );
    }

    #[test]
    fn is_idempotent() {
        let once = process_citations(doc_with_reference());
        let twice = process_citations(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn no_references_is_a_no_op() {
        let doc = Document::new(vec![Block::HorizontalRule]);
        assert_eq!(process_citations(doc.clone()), doc);
    }
}
