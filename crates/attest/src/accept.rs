//! Rewriting a test file so the actual result becomes the expected one.
//!
//! Acceptance edits the parsed document, not the raw text: the output
//! element is located the same way extraction found it, its content is
//! replaced with the actual result, and the whole file is re-serialized.
//! Surrounding prose survives; incidental formatting is normalized by the
//! writer.

use std::fs;
use std::iter::Peekable;
use std::vec::IntoIter;

use quill::{Attr, Block, Document, Format};
use tracing::info;

use crate::classify::{classify, Role};
use crate::compare::Actual;
use crate::error::AttestError;
use crate::testcase::TestCase;

/// Writes the actual result into the test file as its expected output.
///
/// `file_format` is the format the test file itself was read with, and is
/// what the rewritten file is serialized back to.
pub fn accept(
    test: &TestCase,
    actual: &Actual,
    file_format: &Format,
) -> Result<(), AttestError> {
    let serialized = match actual {
        Actual::Text(text) => ensure_trailing_newline(text),
        Actual::Document(document) => quill::write(document, &test.target_format)?,
    };
    let structured = match actual {
        Actual::Document(document) => Some(document.blocks.as_slice()),
        Actual::Text(_) => None,
    };

    let mut rewriter = Rewriter {
        serialized: &serialized,
        structured,
        replaced: false,
    };
    let mut blocks = rewriter.rewrite(test.document.blocks.clone());
    if !rewriter.replaced {
        blocks.push(Block::CodeBlock(
            expected_attr(&test.target_format),
            serialized.clone(),
        ));
    }

    let document = Document {
        meta: test.document.meta.clone(),
        blocks,
    };
    let text = quill::write(&document, file_format)?;
    fs::write(&test.filepath, text)?;
    info!(path = %test.filepath.display(), "accepted actual output");
    Ok(())
}

/// Attribute set for a freshly created expected-output block.
fn expected_attr(target: &Format) -> Attr {
    let mut attr = Attr::with_identifier("expected");
    attr.classes.push(target.name.clone());
    if !target.extensions.is_empty() {
        attr.attributes
            .push(("extensions".into(), target.extensions.to_string()));
    }
    attr
}

fn ensure_trailing_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

struct Rewriter<'a> {
    serialized: &'a str,
    structured: Option<&'a [Block]>,
    replaced: bool,
}

impl Rewriter<'_> {
    fn rewrite(&mut self, blocks: Vec<Block>) -> Vec<Block> {
        let mut out = Vec::with_capacity(blocks.len());
        let mut iter = blocks.into_iter().peekable();
        while let Some(block) = iter.next() {
            match block {
                Block::CodeBlock(attr, _)
                    if matches!(classify(&attr), Some(Role::Output)) =>
                {
                    out.push(Block::CodeBlock(attr, self.serialized.to_string()));
                    self.replaced = true;
                }
                Block::Div(attr, inner) => match classify(&attr) {
                    // Container outputs are normalized to code fragments;
                    // literal text is the stable form for stored results.
                    Some(Role::Output) => {
                        out.push(Block::CodeBlock(attr, self.serialized.to_string()));
                        self.replaced = true;
                    }
                    // Other claimed containers are left untouched whole.
                    Some(_) => out.push(Block::Div(attr, inner)),
                    None => {
                        let inner = self.rewrite(inner);
                        out.push(Block::Div(attr, inner));
                    }
                },
                Block::Header(level, attr, inlines) if classify(&attr).is_some() => {
                    let hosts_output = matches!(classify(&attr), Some(Role::Output));
                    out.push(Block::Header(level, attr, inlines));
                    let body = take_section_body(&mut iter, level);
                    if hosts_output {
                        out.extend(self.replacement_blocks());
                        self.replaced = true;
                    } else {
                        // Input and command sections keep their content
                        // verbatim; nothing inside them classifies.
                        out.extend(body);
                    }
                }
                Block::BlockQuote(inner) => {
                    out.push(Block::BlockQuote(self.rewrite(inner)));
                }
                Block::BulletList(items) => {
                    out.push(Block::BulletList(self.rewrite_items(items)));
                }
                Block::OrderedList(start, items) => {
                    out.push(Block::OrderedList(start, self.rewrite_items(items)));
                }
                other => out.push(other),
            }
        }
        out
    }

    fn rewrite_items(&mut self, items: Vec<Vec<Block>>) -> Vec<Vec<Block>> {
        items.into_iter().map(|item| self.rewrite(item)).collect()
    }

    /// The blocks that stand in for a section-hosted output: the actual
    /// document's own blocks where available, a code fragment otherwise.
    fn replacement_blocks(&self) -> Vec<Block> {
        match self.structured {
            Some(blocks) => blocks.to_vec(),
            None => vec![Block::CodeBlock(Attr::new(), self.serialized.to_string())],
        }
    }
}

/// Consumes blocks up to the next heading at or above `level`.
fn take_section_body(
    iter: &mut Peekable<IntoIter<Block>>,
    level: u8,
) -> Vec<Block> {
    let mut body = Vec::new();
    while let Some(next) = iter.peek() {
        if matches!(next, Block::Header(l, ..) if *l <= level) {
            break;
        }
        if let Some(block) = iter.next() {
            body.push(block);
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{evaluate, Outcome};
    use std::path::PathBuf;

    fn roundtrip(raw: &str) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.md");
        fs::write(&path, raw).unwrap();

        let format = Format::markdown();
        let test = TestCase::parse(raw, &format, path.clone()).unwrap();
        let eval = evaluate(&test, true).unwrap();
        accept(&test, eval.actual.as_ref().unwrap(), &format).unwrap();
        fs::read_to_string(&path).unwrap()
    }

    fn parse(raw: &str) -> TestCase {
        TestCase::parse(raw, &Format::markdown(), PathBuf::new()).unwrap()
    }

    #[test]
    fn replaces_stale_fragment_text() {
        let rewritten = roundtrip(
            "---\nattest:\n  compare: strings\n---\n\n\
             Prose stays.\n\n\
             ``` {#input .markdown}\nStuff is *important*!\n```\n\n\
             ``` {#expected .html}\nstale\n```\n",
        );
        assert!(rewritten.contains("Prose stays."));
        assert!(rewritten.contains("<p>Stuff is <em>important</em>!</p>"));
        assert!(!rewritten.contains("stale"));

        // The rewritten file passes on the next run.
        let test = parse(&rewritten);
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn appends_expected_block_when_absent() {
        let rewritten = roundtrip("``` {#input .markdown}\nhello\n```\n");
        assert!(rewritten.contains("{#expected .native}"));

        let test = parse(&rewritten);
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn container_output_becomes_a_fragment() {
        let rewritten = roundtrip(
            "``` {#input .markdown}\nNew *content*.\n```\n\n\
             ::: {#output}\nOld content.\n:::\n",
        );
        // The container is gone; a code fragment with the same attributes
        // holds the serialized result.
        assert!(!rewritten.contains(":::"));
        assert!(rewritten.contains("{#output}"));

        let test = parse(&rewritten);
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn heading_section_gets_structured_content() {
        let rewritten = roundtrip(
            "## Input {#input}\n\nFresh *stuff*.\n\n\
             ## Expected {#expected}\n\nOld stuff.\n",
        );
        assert!(rewritten.contains("Fresh *stuff*."));
        assert!(!rewritten.contains("Old stuff."));

        let test = parse(&rewritten);
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn acceptance_is_idempotent() {
        let first = roundtrip(
            "``` {#input .markdown}\nStuff is *important*!\n```\n\n\
             ``` {#expected}\nstale\n```\n",
        );
        let second = roundtrip(&first);
        assert_eq!(first, second);
    }
}
