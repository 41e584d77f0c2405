//! Minimal HTML writer.
//!
//! Write-only: the engine can target HTML for pipelines and command tests,
//! but never reads it back.

use crate::ast::{Attr, Block, Document, Inline};

/// Serializes a document as HTML.
pub fn write(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        write_block(block, &mut out);
    }
    out
}

fn write_block(block: &Block, out: &mut String) {
    match block {
        Block::Para(inlines) => {
            out.push_str("<p>");
            write_inlines(inlines, out);
            out.push_str("</p>\n");
        }
        Block::Header(level, attr, inlines) => {
            out.push_str(&format!("<h{level}{}>", attr_html(attr)));
            write_inlines(inlines, out);
            out.push_str(&format!("</h{level}>\n"));
        }
        Block::CodeBlock(attr, body) => {
            out.push_str(&format!("<pre{}><code>", attr_html(attr)));
            out.push_str(&escape(body));
            out.push_str("</code></pre>\n");
        }
        Block::Div(attr, blocks) => {
            out.push_str(&format!("<div{}>\n", attr_html(attr)));
            for block in blocks {
                write_block(block, out);
            }
            out.push_str("</div>\n");
        }
        Block::BlockQuote(blocks) => {
            out.push_str("<blockquote>\n");
            for block in blocks {
                write_block(block, out);
            }
            out.push_str("</blockquote>\n");
        }
        Block::BulletList(items) => {
            out.push_str("<ul>\n");
            write_items(items, out);
            out.push_str("</ul>\n");
        }
        Block::OrderedList(start, items) => {
            if *start == 1 {
                out.push_str("<ol>\n");
            } else {
                out.push_str(&format!("<ol start=\"{start}\">\n"));
            }
            write_items(items, out);
            out.push_str("</ol>\n");
        }
        Block::RawBlock(format, text) => {
            if format == "html" {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        Block::HorizontalRule => out.push_str("<hr />\n"),
    }
}

fn write_items(items: &[Vec<Block>], out: &mut String) {
    for item in items {
        out.push_str("<li>");
        for block in item {
            write_block(block, out);
        }
        out.push_str("</li>\n");
    }
}

fn write_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Str(s) => out.push_str(&escape(s)),
            Inline::Emph(inner) => {
                out.push_str("<em>");
                write_inlines(inner, out);
                out.push_str("</em>");
            }
            Inline::Strong(inner) => {
                out.push_str("<strong>");
                write_inlines(inner, out);
                out.push_str("</strong>");
            }
            Inline::Code(_, code) => {
                out.push_str("<code>");
                out.push_str(&escape(code));
                out.push_str("</code>");
            }
            Inline::SoftBreak => out.push('\n'),
            Inline::LineBreak => out.push_str("<br />\n"),
            Inline::Link(_, inner, url) => {
                out.push_str(&format!("<a href=\"{}\">", escape(url)));
                write_inlines(inner, out);
                out.push_str("</a>");
            }
            Inline::Image(_, inner, url) => {
                let mut alt = String::new();
                write_inlines(inner, &mut alt);
                out.push_str(&format!("<img src=\"{}\" alt=\"{alt}\" />", escape(url)));
            }
            Inline::RawInline(format, raw) => {
                if format == "html" {
                    out.push_str(raw);
                }
            }
        }
    }
}

fn attr_html(attr: &Attr) -> String {
    let mut out = String::new();
    if !attr.identifier.is_empty() {
        out.push_str(&format!(" id=\"{}\"", escape(&attr.identifier)));
    }
    if !attr.classes.is_empty() {
        out.push_str(&format!(" class=\"{}\"", escape(&attr.classes.join(" "))));
    }
    for (key, value) in &attr.attributes {
        out.push_str(&format!(" {key}=\"{}\"", escape(value)));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_with_emphasis() {
        let doc = Document::new(vec![Block::Para(vec![
            Inline::Str("Stuff is ".into()),
            Inline::Emph(vec![Inline::Str("important".into())]),
            Inline::Str("!".into()),
        ])]);
        assert_eq!(write(&doc), "<p>Stuff is <em>important</em>!</p>\n");
    }

    #[test]
    fn code_is_escaped() {
        let doc = Document::new(vec![Block::CodeBlock(Attr::new(), "a < b\n".into())]);
        assert_eq!(write(&doc), "<pre><code>a &lt; b\n</code></pre>\n");
    }
}
