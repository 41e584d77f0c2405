//! Test definition extraction.
//!
//! A test file is an ordinary document whose structural elements are tagged
//! by identifier: one input, at most one expected output, at most one
//! command. Elements can be code fragments or attributed containers, and a
//! heading carrying a role identifier hosts its whole section as that
//! element.

use std::path::PathBuf;

use quill::{Attr, Block, Document, Extensions, Format};
use tracing::debug;

use crate::classify::{classify, Role};
use crate::error::AttestError;
use crate::options::TestOptions;

/// A structural element claimed for a role: either a code fragment with
/// literal text, or a container with nested content.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A fenced code block: attributes plus literal text.
    Fragment {
        /// The block's attributes.
        attr: Attr,
        /// The block's literal text.
        text: String,
    },
    /// An attributed container: attributes plus nested blocks (with any
    /// leading section heading already stripped).
    Container {
        /// The container's attributes.
        attr: Attr,
        /// The nested content.
        blocks: Vec<Block>,
    },
}

impl Element {
    /// The element's attributes.
    pub fn attr(&self) -> &Attr {
        match self {
            Element::Fragment { attr, .. } | Element::Container { attr, .. } => attr,
        }
    }
}

/// One fully parsed test definition.
#[derive(Debug)]
pub struct TestCase {
    /// Path of the source test file; empty for in-memory tests.
    pub filepath: PathBuf,
    /// The full parsed document backing this test file. Owned exclusively;
    /// only acceptance mutates it.
    pub document: Document,
    /// Resolved per-test options.
    pub options: TestOptions,
    /// The input element. Required unless the test is disabled.
    pub input: Option<Element>,
    /// The expected-output element, if present.
    pub output: Option<Element>,
    /// The literal command line of a command test, if present.
    pub command: Option<String>,
    /// Format used to read the expected output and to serialize the actual
    /// result during acceptance.
    pub target_format: Format,
}

impl TestCase {
    /// Parses a raw test file.
    ///
    /// Fails with [`AttestError::AmbiguousBlock`] when two elements claim
    /// the same role. A missing input is not caught here; evaluation
    /// raises it, after group-level options had a chance to disable the
    /// test.
    pub fn parse(
        raw: &str,
        format_hint: &Format,
        filepath: PathBuf,
    ) -> Result<Self, AttestError> {
        let document = quill::read(raw, format_hint)?;
        let options = TestOptions::from_meta(&document.meta)?;

        // Headings partition the document into sections, so a heading
        // tagged `{#input}` hosts its whole section as the input element.
        let has_headings = document
            .blocks
            .iter()
            .any(|b| matches!(b, Block::Header(..)));
        let sectioned;
        let blocks: &[Block] = if has_headings {
            sectioned = make_sections(document.blocks.clone());
            &sectioned
        } else {
            &document.blocks
        };

        let mut claims = Claims::default();
        claims.walk(blocks)?;

        let command = claims.command.as_ref().map(command_text);
        let target_format = claims
            .output
            .as_ref()
            .map_or_else(Format::native, |el| derive_format(el.attr(), Format::native()));
        debug!(
            path = %filepath.display(),
            target = %target_format,
            command = command.is_some(),
            "parsed test definition"
        );

        Ok(Self {
            filepath,
            document,
            options,
            input: claims.input,
            output: claims.output,
            command,
            target_format,
        })
    }
}

/// Resolves an element's format: explicit `format` attribute, else its
/// first class, else the given default; extension overrides come from the
/// `extensions` attribute.
pub(crate) fn derive_format(attr: &Attr, default: Format) -> Format {
    let mut format = attr
        .get("format")
        .map(Format::parse)
        .or_else(|| attr.classes.first().map(Format::new))
        .unwrap_or(default);
    if let Some(spec) = attr.get("extensions") {
        format = format.with_extensions(Extensions::parse(spec));
    }
    format
}

/// At most one element per role; a second candidate is a hard error.
#[derive(Debug, Default)]
struct Claims {
    input: Option<Element>,
    output: Option<Element>,
    command: Option<Element>,
}

impl Claims {
    fn walk(&mut self, blocks: &[Block]) -> Result<(), AttestError> {
        for block in blocks {
            match block {
                Block::CodeBlock(attr, text) => {
                    if let Some(role) = classify(attr) {
                        self.claim(
                            role,
                            Element::Fragment {
                                attr: attr.clone(),
                                text: text.clone(),
                            },
                        )?;
                    }
                }
                Block::Div(attr, inner) => match classify(attr) {
                    Some(role) => {
                        self.claim(
                            role,
                            Element::Container {
                                attr: attr.clone(),
                                blocks: strip_section_heading(inner),
                            },
                        )?;
                        // A claimed container is consumed whole; anything
                        // inside it no longer classifies on its own.
                    }
                    None => self.walk(inner)?,
                },
                Block::BlockQuote(inner) => self.walk(inner)?,
                Block::BulletList(items) | Block::OrderedList(_, items) => {
                    for item in items {
                        self.walk(item)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn claim(&mut self, role: Role, element: Element) -> Result<(), AttestError> {
        let slot = match role {
            Role::Input => &mut self.input,
            Role::Output => &mut self.output,
            Role::Command => &mut self.command,
        };
        if slot.is_some() {
            return Err(AttestError::AmbiguousBlock { role });
        }
        *slot = Some(element);
        Ok(())
    }
}

/// Drops a leading heading from section content.
fn strip_section_heading(blocks: &[Block]) -> Vec<Block> {
    match blocks.first() {
        Some(Block::Header(..)) => blocks[1..].to_vec(),
        _ => blocks.to_vec(),
    }
}

/// Wraps each heading and its following content into a container carrying
/// the heading's attributes, nested by heading level.
pub(crate) fn make_sections(blocks: Vec<Block>) -> Vec<Block> {
    let mut iter = blocks.into_iter().peekable();
    build_sections(&mut iter, 1)
}

fn build_sections(
    blocks: &mut std::iter::Peekable<std::vec::IntoIter<Block>>,
    min_level: u8,
) -> Vec<Block> {
    let mut out = Vec::new();
    loop {
        match blocks.peek() {
            None => break,
            Some(Block::Header(level, ..)) if *level < min_level => break,
            Some(Block::Header(..)) => {
                let Some(Block::Header(level, attr, inlines)) = blocks.next() else {
                    break;
                };
                let mut children = vec![Block::Header(level, attr.clone(), inlines)];
                children.extend(build_sections(blocks, level + 1));
                out.push(Block::Div(attr, children));
            }
            Some(_) => {
                if let Some(block) = blocks.next() {
                    out.push(block);
                }
            }
        }
    }
    out
}

/// Extracts the literal command line from a command element.
fn command_text(element: &Element) -> String {
    match element {
        Element::Fragment { text, .. } => text.trim().to_string(),
        Element::Container { blocks, .. } => quill::markdown::write_blocks(blocks)
            .trim()
            .to_string(),
    }
}
