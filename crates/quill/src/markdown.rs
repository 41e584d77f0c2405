//! Markdown reader and writer.
//!
//! Reading is pulldown-cmark driven, with two additions the underlying
//! parser does not provide:
//!
//! - a leading YAML metadata block (`---` ... `---`) is split off and parsed
//!   into document metadata;
//! - fenced containers (`::: {#id .class}` ... `:::`) are recognized by a
//!   line-level pre-pass and become [`Block::Div`] elements, with their
//!   content parsed recursively. Container fences inside code blocks are
//!   inert.
//!
//! Writing is a plain tree walk. Soft breaks are written as newlines, so a
//! document that was never re-wrapped serializes with its original line
//! breaks intact. Containers are written back in fenced syntax; callers
//! that need a platform-friendly representation normalize containers before
//! invoking the writer.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_yaml::Value as Yaml;
use std::collections::BTreeMap;

use crate::ast::{coalesce_strs, inlines_to_text, Attr, Block, Document, Inline, Meta, MetaValue};
use crate::engine::EngineError;
use crate::format::Extensions;

/// Whether the `smart` extension is on when no override is given.
const SMART_DEFAULT: bool = true;

// ============================================================================
// Reader
// ============================================================================

/// Parses markdown text into a document.
pub fn read(text: &str, extensions: &Extensions) -> Result<Document, EngineError> {
    let (meta_text, body) = split_metadata(text);
    let meta = match meta_text {
        Some(yaml) => parse_meta(yaml)?,
        None => Meta::new(),
    };
    Ok(Document {
        meta,
        blocks: read_blocks(body, extensions),
    })
}

/// Splits a leading YAML metadata block off the document body.
fn split_metadata(text: &str) -> (Option<&str>, &str) {
    let rest = match text.strip_prefix("---\n").or_else(|| text.strip_prefix("---\r\n")) {
        Some(rest) => rest,
        None => return (None, text),
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    // Unterminated block: treat the whole text as body.
    (None, text)
}

fn parse_meta(yaml: &str) -> Result<Meta, EngineError> {
    let value: Yaml = serde_yaml::from_str(yaml)?;
    match yaml_to_meta(value) {
        MetaValue::MetaMap(map) => Ok(map),
        _ => Ok(Meta::new()),
    }
}

fn yaml_to_meta(value: Yaml) -> MetaValue {
    match value {
        Yaml::Null => MetaValue::MetaString(String::new()),
        Yaml::Bool(b) => MetaValue::MetaBool(b),
        Yaml::Number(n) => MetaValue::MetaString(n.to_string()),
        Yaml::String(s) => MetaValue::MetaString(s),
        Yaml::Sequence(seq) => MetaValue::MetaList(seq.into_iter().map(yaml_to_meta).collect()),
        Yaml::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let key = match k {
                    Yaml::String(s) => s,
                    other => serde_yaml::to_string(&other)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                };
                out.insert(key, yaml_to_meta(v));
            }
            MetaValue::MetaMap(out)
        }
        Yaml::Tagged(tagged) => yaml_to_meta(tagged.value),
    }
}

/// One region of the source: plain markdown, or a fenced container.
enum Segment {
    Markdown(String),
    Container(Attr, String),
}

/// Parses a body (no metadata block) into blocks, handling containers.
fn read_blocks(text: &str, extensions: &Extensions) -> Vec<Block> {
    let mut blocks = Vec::new();
    for segment in segment_containers(text) {
        match segment {
            Segment::Markdown(md) => blocks.extend(parse_markdown_segment(&md, extensions)),
            Segment::Container(attr, inner) => {
                blocks.push(Block::Div(attr, read_blocks(&inner, extensions)));
            }
        }
    }
    blocks
}

/// Splits source text at top-level container fences.
///
/// Tracks code-fence state so `:::` lines inside fenced code are literal,
/// and container depth so nested containers stay inside their parent's
/// segment (the recursive parse picks them up).
fn segment_containers(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain: Vec<&str> = Vec::new();
    let mut container: Option<(Attr, Vec<&str>, usize)> = None;
    let mut code_fence: Option<(char, usize)> = None;

    for line in text.lines() {
        if let Some((fence_char, fence_len)) = code_fence {
            if is_closing_code_fence(line, fence_char, fence_len) {
                code_fence = None;
            }
            push_line(&mut plain, &mut container, line);
            continue;
        }
        if let Some(fence) = opens_code_fence(line) {
            code_fence = Some(fence);
            push_line(&mut plain, &mut container, line);
            continue;
        }

        match container_fence(line) {
            Some(ContainerFence::Open(attr)) => match container.as_mut() {
                Some((_, lines, depth)) => {
                    *depth += 1;
                    lines.push(line);
                }
                None => {
                    if !plain.is_empty() {
                        segments.push(Segment::Markdown(join_lines(&plain)));
                        plain.clear();
                    }
                    container = Some((attr, Vec::new(), 1));
                }
            },
            Some(ContainerFence::Close) => {
                match container.as_mut() {
                    Some((_, lines, depth)) => {
                        *depth -= 1;
                        if *depth > 0 {
                            lines.push(line);
                        }
                    }
                    // A stray close fence outside any container is plain text.
                    None => plain.push(line),
                }
                if matches!(&container, Some((_, _, 0))) {
                    if let Some((attr, lines, _)) = container.take() {
                        segments.push(Segment::Container(attr, join_lines(&lines)));
                    }
                }
            }
            None => push_line(&mut plain, &mut container, line),
        }
    }

    // An unterminated container closes at end of input.
    if let Some((attr, lines, _)) = container {
        segments.push(Segment::Container(attr, join_lines(&lines)));
    }
    if !plain.is_empty() {
        segments.push(Segment::Markdown(join_lines(&plain)));
    }
    segments
}

fn push_line<'a>(
    plain: &mut Vec<&'a str>,
    container: &mut Option<(Attr, Vec<&'a str>, usize)>,
    line: &'a str,
) {
    match container.as_mut() {
        Some((_, lines, _)) => lines.push(line),
        None => plain.push(line),
    }
}

fn join_lines(lines: &[&str]) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn opens_code_fence(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    for fence_char in ['`', '~'] {
        let len = trimmed.chars().take_while(|&c| c == fence_char).count();
        if len >= 3 {
            return Some((fence_char, len));
        }
    }
    None
}

fn is_closing_code_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= fence_len && trimmed.chars().all(|c| c == fence_char)
}

enum ContainerFence {
    Open(Attr),
    Close,
}

/// Recognizes a container fence line: three or more colons, then either
/// nothing (close) or an attribute spec (open).
fn container_fence(line: &str) -> Option<ContainerFence> {
    let trimmed = line.trim();
    let colons = trimmed.chars().take_while(|&c| c == ':').count();
    if colons < 3 {
        return None;
    }
    let rest = trimmed[colons..].trim_end_matches(':').trim();
    if rest.is_empty() {
        return Some(ContainerFence::Close);
    }
    let attr = if rest.starts_with('{') {
        parse_attr_block(rest.trim_start_matches('{').trim_end_matches('}'))
    } else {
        Attr {
            classes: vec![rest.to_string()],
            ..Attr::default()
        }
    };
    Some(ContainerFence::Open(attr))
}

/// Parses the inside of an attribute block: `#id .class key="value"`.
pub fn parse_attr_block(spec: &str) -> Attr {
    let mut attr = Attr::new();
    let mut chars = spec.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        let mut value: Option<String> = None;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '=' && value.is_none() {
                value = Some(read_attr_value(&mut chars));
                break;
            }
            token.push(c);
        }
        if let Some(value) = value {
            attr.attributes.push((token, value));
        } else if let Some(id) = token.strip_prefix('#') {
            attr.identifier = id.to_string();
        } else if let Some(class) = token.strip_prefix('.') {
            attr.classes.push(class.to_string());
        } else if !token.is_empty() {
            // A bare word is shorthand for a class.
            attr.classes.push(token);
        }
    }
    attr
}

fn read_attr_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut value = String::new();
    match chars.peek() {
        Some(&quote @ ('"' | '\'')) => {
            chars.next();
            for c in chars.by_ref() {
                if c == quote {
                    break;
                }
                value.push(c);
            }
        }
        _ => {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
    }
    value
}

/// Parses a code fence info string into attributes.
///
/// Accepts both the bare-language form (` ```rust `) and the full attribute
/// block form (` ``` {#input .markdown extensions="-smart"} `).
fn parse_code_fence_info(info: &str) -> Attr {
    let info = info.trim();
    if info.is_empty() {
        return Attr::new();
    }
    if let Some(brace) = info.find('{') {
        let mut attr =
            parse_attr_block(info[brace..].trim_start_matches('{').trim_end_matches('}'));
        let mut leading: Vec<String> = info[..brace]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        leading.extend(std::mem::take(&mut attr.classes));
        attr.classes = leading;
        attr
    } else {
        Attr {
            classes: info.split_whitespace().map(str::to_string).collect(),
            ..Attr::default()
        }
    }
}

/// Inline container being built.
enum InlineFrame {
    Emph,
    Strong,
    Link(String),
    Image(String),
}

/// Block container being built.
enum Frame {
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Item(Vec<Block>),
}

/// Builds AST blocks from a pulldown-cmark event stream.
struct Builder {
    blocks: Vec<Block>,
    stack: Vec<Frame>,
    inline_stack: Vec<(InlineFrame, Vec<Inline>)>,
    inlines: Vec<Inline>,
    code: Option<(Attr, String)>,
    heading: Option<(u8, Attr)>,
}

impl Builder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            stack: Vec::new(),
            inline_stack: Vec::new(),
            inlines: Vec::new(),
            code: None,
            heading: None,
        }
    }

    fn push_block(&mut self, block: Block) {
        let target = match self.stack.last_mut() {
            Some(Frame::Quote(blocks) | Frame::Item(blocks)) => blocks,
            Some(Frame::List { .. }) | None => &mut self.blocks,
        };
        // Consecutive raw HTML events collapse into one raw block.
        if let (Some(Block::RawBlock(fmt, text)), Block::RawBlock(new_fmt, new_text)) =
            (target.last_mut(), &block)
        {
            if fmt == new_fmt {
                text.push_str(new_text);
                return;
            }
        }
        target.push(block);
    }

    fn take_inlines(&mut self) -> Vec<Inline> {
        coalesce_strs(std::mem::take(&mut self.inlines))
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                let inlines = self.take_inlines();
                self.push_block(Block::Para(inlines));
            }

            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let attr = Attr {
                    identifier: id.map(|s| s.to_string()).unwrap_or_default(),
                    classes: classes.iter().map(|s| s.to_string()).collect(),
                    attributes: attrs
                        .iter()
                        .map(|(k, v)| {
                            (
                                k.to_string(),
                                v.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                            )
                        })
                        .collect(),
                };
                self.heading = Some((heading_level(level), attr));
            }
            Event::End(TagEnd::Heading(_)) => {
                let inlines = self.take_inlines();
                if let Some((level, attr)) = self.heading.take() {
                    self.push_block(Block::Header(level, attr, inlines));
                }
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let attr = match kind {
                    CodeBlockKind::Fenced(info) => parse_code_fence_info(&info),
                    CodeBlockKind::Indented => Attr::new(),
                };
                self.code = Some((attr, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((attr, text)) = self.code.take() {
                    self.push_block(Block::CodeBlock(attr, text));
                }
            }

            Event::Start(Tag::BlockQuote(_kind)) => {
                self.stack.push(Frame::Quote(Vec::new()));
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                if let Some(Frame::Quote(blocks)) = self.stack.pop() {
                    self.push_block(Block::BlockQuote(blocks));
                }
            }

            Event::Start(Tag::List(start)) => {
                self.stack.push(Frame::List {
                    start,
                    items: Vec::new(),
                });
            }
            Event::End(TagEnd::List(_)) => {
                if let Some(Frame::List { start, items }) = self.stack.pop() {
                    let list = match start {
                        Some(n) => Block::OrderedList(n, items),
                        None => Block::BulletList(items),
                    };
                    self.push_block(list);
                }
            }
            Event::Start(Tag::Item) => {
                self.stack.push(Frame::Item(Vec::new()));
            }
            Event::End(TagEnd::Item) => {
                // Tight list items carry bare inlines with no paragraph event.
                if !self.inlines.is_empty() {
                    let inlines = self.take_inlines();
                    self.push_block(Block::Para(inlines));
                }
                if let Some(Frame::Item(blocks)) = self.stack.pop() {
                    if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                        items.push(blocks);
                    }
                }
            }

            Event::Start(Tag::Emphasis) => self.open_inline(InlineFrame::Emph),
            Event::End(TagEnd::Emphasis) => self.close_inline(),
            Event::Start(Tag::Strong) => self.open_inline(InlineFrame::Strong),
            Event::End(TagEnd::Strong) => self.close_inline(),
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.open_inline(InlineFrame::Link(dest_url.to_string()));
            }
            Event::End(TagEnd::Link) => self.close_inline(),
            Event::Start(Tag::Image { dest_url, .. }) => {
                self.open_inline(InlineFrame::Image(dest_url.to_string()));
            }
            Event::End(TagEnd::Image) => self.close_inline(),

            Event::Text(text) => match self.code.as_mut() {
                Some((_, buffer)) => buffer.push_str(&text),
                None => self.inlines.push(Inline::Str(text.to_string())),
            },
            Event::Code(text) => {
                self.inlines.push(Inline::Code(Attr::new(), text.to_string()));
            }
            Event::SoftBreak => self.inlines.push(Inline::SoftBreak),
            Event::HardBreak => self.inlines.push(Inline::LineBreak),
            Event::Html(text) => {
                self.push_block(Block::RawBlock("html".into(), text.to_string()));
            }
            Event::InlineHtml(text) => {
                self.inlines.push(Inline::RawInline("html".into(), text.to_string()));
            }
            Event::Rule => self.push_block(Block::HorizontalRule),
            _ => {}
        }
    }

    fn open_inline(&mut self, frame: InlineFrame) {
        let saved = std::mem::take(&mut self.inlines);
        self.inline_stack.push((frame, saved));
    }

    fn close_inline(&mut self) {
        let inner = self.take_inlines();
        if let Some((frame, saved)) = self.inline_stack.pop() {
            self.inlines = saved;
            let inline = match frame {
                InlineFrame::Emph => Inline::Emph(inner),
                InlineFrame::Strong => Inline::Strong(inner),
                InlineFrame::Link(url) => Inline::Link(Attr::new(), inner, url),
                InlineFrame::Image(url) => Inline::Image(Attr::new(), inner, url),
            };
            self.inlines.push(inline);
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn parse_markdown_segment(text: &str, extensions: &Extensions) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    if extensions.is_enabled("smart", SMART_DEFAULT) {
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
    }

    let mut builder = Builder::new();
    for event in Parser::new_ext(text, options) {
        builder.handle(event);
    }
    builder.blocks
}

// ============================================================================
// Writer
// ============================================================================

/// Serializes a document as markdown.
///
/// Non-empty metadata is written as a leading YAML block, so a standalone
/// document round-trips its header.
pub fn write(document: &Document) -> String {
    let mut out = String::new();
    if !document.meta.is_empty() {
        out.push_str("---\n");
        out.push_str(&meta_to_yaml(&document.meta));
        out.push_str("---\n\n");
    }
    out.push_str(&write_blocks(&document.blocks));
    out
}

fn meta_to_yaml(meta: &Meta) -> String {
    let value = Yaml::Mapping(
        meta.iter()
            .map(|(k, v)| (Yaml::String(k.clone()), meta_to_yaml_value(v)))
            .collect(),
    );
    serde_yaml::to_string(&value).unwrap_or_default()
}

fn meta_to_yaml_value(value: &MetaValue) -> Yaml {
    match value {
        MetaValue::MetaString(s) => Yaml::String(s.clone()),
        MetaValue::MetaBool(b) => Yaml::Bool(*b),
        MetaValue::MetaList(list) => Yaml::Sequence(list.iter().map(meta_to_yaml_value).collect()),
        MetaValue::MetaMap(map) => Yaml::Mapping(
            map.iter()
                .map(|(k, v)| (Yaml::String(k.clone()), meta_to_yaml_value(v)))
                .collect(),
        ),
        MetaValue::MetaInlines(inlines) => Yaml::String(inlines_to_text(inlines)),
    }
}

/// Serializes blocks, blank-line separated.
pub fn write_blocks(blocks: &[Block]) -> String {
    let rendered: Vec<String> = blocks.iter().map(write_block).collect();
    let mut out = rendered.join("\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn write_block(block: &Block) -> String {
    match block {
        Block::Para(inlines) => {
            let mut text = escape_block_starts(&write_inlines(inlines));
            text.push('\n');
            text
        }
        Block::Header(level, attr, inlines) => {
            let mut text = "#".repeat(usize::from(*level));
            text.push(' ');
            text.push_str(&write_inlines(inlines));
            if !attr.is_empty() {
                text.push(' ');
                text.push_str(&render_attr(attr));
            }
            text.push('\n');
            text
        }
        Block::CodeBlock(attr, body) => write_code_block(attr, body),
        Block::Div(attr, blocks) => {
            let mut text = String::from(":::");
            if !attr.is_empty() {
                text.push(' ');
                text.push_str(&render_attr(attr));
            }
            text.push('\n');
            text.push_str(&write_blocks(blocks));
            text.push_str(":::\n");
            text
        }
        Block::BlockQuote(blocks) => {
            let inner = write_blocks(blocks);
            let mut text = String::new();
            for line in inner.lines() {
                if line.is_empty() {
                    text.push_str(">\n");
                } else {
                    text.push_str("> ");
                    text.push_str(line);
                    text.push('\n');
                }
            }
            text
        }
        Block::BulletList(items) => {
            let mut text = String::new();
            for item in items {
                text.push_str(&write_list_item("- ", item));
            }
            text
        }
        Block::OrderedList(start, items) => {
            let mut text = String::new();
            for (offset, item) in items.iter().enumerate() {
                let marker = format!("{}. ", start + offset as u64);
                text.push_str(&write_list_item(&marker, item));
            }
            text
        }
        Block::RawBlock(_, text) => {
            let mut text = text.clone();
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        Block::HorizontalRule => "---\n".to_string(),
    }
}

fn write_list_item(marker: &str, blocks: &[Block]) -> String {
    let inner = write_blocks(blocks);
    let indent = " ".repeat(marker.len());
    let mut text = String::new();
    for (i, line) in inner.lines().enumerate() {
        if i == 0 {
            text.push_str(marker);
        } else if !line.is_empty() {
            text.push_str(&indent);
        }
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn write_code_block(attr: &Attr, body: &str) -> String {
    let longest_run = body
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            trimmed.chars().take_while(|&c| c == '`').count()
        })
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(3));

    let mut text = fence.clone();
    if attr.identifier.is_empty() && attr.attributes.is_empty() && attr.classes.len() == 1 {
        text.push_str(&attr.classes[0]);
    } else if !attr.is_empty() {
        text.push(' ');
        text.push_str(&render_attr(attr));
    }
    text.push('\n');
    text.push_str(body);
    if !body.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&fence);
    text.push('\n');
    text
}

/// Renders an attribute set in `{#id .class key="value"}` form.
pub fn render_attr(attr: &Attr) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !attr.identifier.is_empty() {
        parts.push(format!("#{}", attr.identifier));
    }
    for class in &attr.classes {
        parts.push(format!(".{class}"));
    }
    for (key, value) in &attr.attributes {
        parts.push(format!("{key}=\"{value}\""));
    }
    format!("{{{}}}", parts.join(" "))
}

fn write_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Str(s) => out.push_str(&escape_text(s)),
            Inline::Emph(inner) => {
                out.push('*');
                out.push_str(&write_inlines(inner));
                out.push('*');
            }
            Inline::Strong(inner) => {
                out.push_str("**");
                out.push_str(&write_inlines(inner));
                out.push_str("**");
            }
            Inline::Code(_, code) => {
                let longest_run = code.split(|c| c != '`').map(str::len).max().unwrap_or(0);
                let ticks = "`".repeat(longest_run + 1);
                out.push_str(&ticks);
                out.push_str(code);
                out.push_str(&ticks);
            }
            Inline::SoftBreak => out.push('\n'),
            Inline::LineBreak => out.push_str("\\\n"),
            Inline::Link(_, inner, url) => {
                out.push('[');
                out.push_str(&write_inlines(inner));
                out.push_str("](");
                out.push_str(url);
                out.push(')');
            }
            Inline::Image(_, inner, url) => {
                out.push_str("![");
                out.push_str(&write_inlines(inner));
                out.push_str("](");
                out.push_str(url);
                out.push(')');
            }
            Inline::RawInline(_, raw) => out.push_str(raw),
        }
    }
    out
}

/// Escapes characters that would turn a paragraph line into a different
/// block on re-parse: headings, quotes, list markers, thematic breaks,
/// setext underlines.
///
/// Only text can put these at a line start — inline syntax the writer
/// itself emits (`*`, `[`, backticks) is never affected.
fn escape_block_starts(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&escape_line_start(line));
    }
    out
}

fn escape_line_start(line: &str) -> String {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let second = chars.next();
    match first {
        '#' | '>' => format!("\\{line}"),
        '-' | '+' if second.is_none() || second == Some(' ') => format!("\\{line}"),
        '-' | '=' if line.chars().all(|c| c == first) => format!("\\{line}"),
        c if c.is_ascii_digit() => {
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            let (number, rest) = line.split_at(digits);
            let marker = rest.starts_with('.') || rest.starts_with(')');
            if marker && rest[1..].chars().next().is_none_or(|c| c == ' ') {
                format!("{number}\\{rest}")
            } else {
                line.to_string()
            }
        }
        _ => line.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_md(text: &str) -> Document {
        read(text, &Extensions::default()).unwrap()
    }

    #[test]
    fn emphasis_splits_text_runs() {
        let doc = read_md("Stuff is *important*!\n");
        assert_eq!(
            doc.blocks,
            vec![Block::Para(vec![
                Inline::Str("Stuff is ".into()),
                Inline::Emph(vec![Inline::Str("important".into())]),
                Inline::Str("!".into()),
            ])]
        );
    }

    #[test]
    fn soft_breaks_are_preserved() {
        let doc = read_md("one\ntwo\n");
        assert_eq!(
            doc.blocks,
            vec![Block::Para(vec![
                Inline::Str("one".into()),
                Inline::SoftBreak,
                Inline::Str("two".into()),
            ])]
        );
    }

    #[test]
    fn code_fence_attributes_are_parsed() {
        let doc = read_md("``` {#input .markdown extensions=\"-smart\"}\nhello\n```\n");
        let Block::CodeBlock(attr, body) = &doc.blocks[0] else {
            panic!("expected code block, got {:?}", doc.blocks);
        };
        assert_eq!(attr.identifier, "input");
        assert_eq!(attr.classes, vec!["markdown"]);
        assert_eq!(attr.get("extensions"), Some("-smart"));
        assert_eq!(body, "hello\n");
    }

    #[test]
    fn bare_language_becomes_a_class() {
        let doc = read_md("```rust\nlet x = 1;\n```\n");
        let Block::CodeBlock(attr, _) = &doc.blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(attr.identifier, "");
        assert_eq!(attr.classes, vec!["rust"]);
    }

    #[test]
    fn block_quotes_nest_their_content() {
        let doc = read_md("> quoted *text*\n");
        assert_eq!(
            doc.blocks,
            vec![Block::BlockQuote(vec![Block::Para(vec![
                Inline::Str("quoted ".into()),
                Inline::Emph(vec![Inline::Str("text".into())]),
            ])])]
        );
    }

    #[test]
    fn fenced_containers_become_divs() {
        let doc = read_md("::: {#output}\nSome *text*.\n:::\n");
        let Block::Div(attr, blocks) = &doc.blocks[0] else {
            panic!("expected div, got {:?}", doc.blocks);
        };
        assert_eq!(attr.identifier, "output");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn container_fences_inside_code_are_literal() {
        let doc = read_md("```\n:::\n```\n");
        assert_eq!(
            doc.blocks,
            vec![Block::CodeBlock(Attr::new(), ":::\n".into())]
        );
    }

    #[test]
    fn nested_containers_stay_nested() {
        let doc = read_md("::: outer\n::: inner\nx\n:::\n:::\n");
        let Block::Div(attr, blocks) = &doc.blocks[0] else {
            panic!("expected div");
        };
        assert_eq!(attr.classes, vec!["outer"]);
        assert!(matches!(&blocks[0], Block::Div(inner, _) if inner.classes == vec!["inner"]));
    }

    #[test]
    fn metadata_block_is_split_off() {
        let doc = read_md("---\ntitle: demo\nattest:\n  disable: true\n---\n\nBody.\n");
        assert_eq!(
            doc.meta.get("title"),
            Some(&MetaValue::MetaString("demo".into()))
        );
        let Some(MetaValue::MetaMap(options)) = doc.meta.get("attest") else {
            panic!("expected nested map");
        };
        assert_eq!(options.get("disable"), Some(&MetaValue::MetaBool(true)));
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn heading_attributes_are_read() {
        let doc = read_md("## Expected {#expected}\n");
        let Block::Header(level, attr, _) = &doc.blocks[0] else {
            panic!("expected heading");
        };
        assert_eq!(*level, 2);
        assert_eq!(attr.identifier, "expected");
    }

    #[test]
    fn writer_preserves_soft_breaks() {
        let doc = read_md("one\ntwo\n");
        assert_eq!(write(&doc), "one\ntwo\n");
    }

    #[test]
    fn writer_emits_metadata_header() {
        let doc = read_md("---\ntitle: demo\n---\n\nBody.\n");
        let text = write(&doc);
        assert!(text.starts_with("---\ntitle: demo\n---\n\n"), "got: {text}");
        assert!(text.ends_with("Body.\n"));
    }

    #[test]
    fn writer_round_trips_structure() {
        let source = "# Title {#t}\n\nA *fine* [link](https://example.com).\n\n``` {#input .markdown}\nhello\n```\n\n- one\n- two\n";
        let doc = read_md(source);
        let doc2 = read_md(&write(&doc));
        assert_eq!(doc, doc2);
    }

    #[test]
    fn block_markers_in_prose_round_trip() {
        for text in [
            "# not a heading",
            "> not a quote",
            "- not a list",
            "+ not a list",
            "1. not a list",
            "12) also not",
        ] {
            let doc = Document::new(vec![Block::Para(vec![Inline::Str(text.into())])]);
            assert_eq!(read_md(&write(&doc)), doc, "case: {text}");
        }
    }

    #[test]
    fn setext_underline_in_prose_stays_prose() {
        let doc = Document::new(vec![Block::Para(vec![
            Inline::Str("totals".into()),
            Inline::SoftBreak,
            Inline::Str("====".into()),
        ])]);
        assert_eq!(read_md(&write(&doc)), doc);
    }

    #[test]
    fn attr_block_parses_quoted_values() {
        let attr = parse_attr_block("#id .a .b key=\"v w\" other=plain");
        assert_eq!(attr.identifier, "id");
        assert_eq!(attr.classes, vec!["a", "b"]);
        assert_eq!(attr.get("key"), Some("v w"));
        assert_eq!(attr.get("other"), Some("plain"));
    }
}
