//! Deciding whether a test passed.
//!
//! Comparison is structural by default: both the actual and the expected
//! result are document trees, optionally normalized by modifier filters,
//! and compared for exact structural equality. Command tests and tests
//! configured with `compare: strings` fall back to literal string equality.

use std::io::Write;
use std::process::{Command, Stdio};

use quill::ast::coalesce_strs;
use quill::{Block, Document, Format, Inline, MetaValue};
use similar::TextDiff;
use tracing::debug;

use crate::error::AttestError;
use crate::options::CompareMode;
use crate::testcase::{Element, TestCase};

/// The program name a command test's command line must start with.
pub const CONVERTER_PROGRAM: &str = "quill";

/// Result of evaluating one test.
#[derive(Debug)]
pub enum Outcome {
    /// Actual matches expected.
    Pass,
    /// Mismatch, with a human-readable report (unified diff or message).
    Fail(String),
    /// The test is disabled and was not evaluated.
    Disabled,
}

/// The produced result, kept around so accept mode can write it back.
#[derive(Debug)]
pub enum Actual {
    /// A structured document (the normal pipeline result).
    Document(Document),
    /// A literal string (command tests).
    Text(String),
}

/// Outcome plus the actual result that produced it.
#[derive(Debug)]
pub struct Evaluation {
    /// The classification of this test run.
    pub outcome: Outcome,
    /// The actual result, absent for disabled tests.
    pub actual: Option<Actual>,
}

impl Evaluation {
    fn disabled() -> Self {
        Self {
            outcome: Outcome::Disabled,
            actual: None,
        }
    }
}

/// Evaluates a test: runs its pipeline (or command) and compares against
/// the expected output.
///
/// In accept mode a missing expected output is not an error; the test
/// comes back as a failure carrying the actual result, and the caller
/// rewrites the file.
pub fn evaluate(test: &TestCase, accept: bool) -> Result<Evaluation, AttestError> {
    if test.options.disable() {
        debug!(path = %test.filepath.display(), "test disabled");
        return Ok(Evaluation::disabled());
    }

    // A command element takes precedence over document comparison.
    if test.command.is_some() {
        return evaluate_command(test, accept);
    }

    let actual = crate::pipeline::execute(test)?;

    match test.options.compare() {
        CompareMode::Strings => {
            let rendered = quill::write(&actual, &test.target_format)?;
            let expected = expected_text(test, accept)?;
            let outcome = match expected {
                Some(expected) => compare_strings(&expected, &rendered),
                None => Outcome::Fail("no expected output recorded".into()),
            };
            Ok(Evaluation {
                outcome,
                actual: Some(Actual::Document(actual)),
            })
        }
        CompareMode::Documents => {
            // In accept mode an unreadable expectation is just one more
            // thing to rewrite, not an error.
            let expected = match expected_document(test, accept) {
                Ok(expected) => expected,
                Err(err @ AttestError::UnparsableExpected { .. }) if accept => {
                    return Ok(Evaluation {
                        outcome: Outcome::Fail(err.to_string()),
                        actual: Some(Actual::Document(actual)),
                    });
                }
                Err(err) => return Err(err),
            };
            let outcome = match expected {
                Some(expected) => compare_documents(test, &expected, &actual),
                None => Outcome::Fail("no expected output recorded".into()),
            };
            Ok(Evaluation {
                outcome,
                actual: Some(Actual::Document(actual)),
            })
        }
    }
}

fn evaluate_command(test: &TestCase, accept: bool) -> Result<Evaluation, AttestError> {
    let actual = run_command(test)?;
    let expected = expected_text(test, accept)?;
    let outcome = match expected {
        Some(expected) => compare_strings(&expected, &actual),
        None => Outcome::Fail("no expected output recorded".into()),
    };
    Ok(Evaluation {
        outcome,
        actual: Some(Actual::Text(actual)),
    })
}

/// Runs a command test's command line, piping the input text through it.
fn run_command(test: &TestCase) -> Result<String, AttestError> {
    let command = test
        .command
        .as_deref()
        .ok_or_else(|| AttestError::BadCommand("no command line".into()))?;
    let mut tokens = command.split_whitespace();
    let program = tokens
        .next()
        .ok_or_else(|| AttestError::BadCommand("empty command line".into()))?;
    if program != CONVERTER_PROGRAM {
        return Err(AttestError::BadCommand(format!(
            "command must invoke `{CONVERTER_PROGRAM}`, got `{program}`"
        )));
    }

    let input = test.input.as_ref().ok_or(AttestError::MissingInput)?;
    let input_text = match input {
        Element::Fragment { text, .. } => text.clone(),
        Element::Container { blocks, .. } => quill::markdown::write_blocks(blocks),
    };

    debug!(command = %command, "running command test");
    let mut child = Command::new(program)
        .args(tokens)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AttestError::BadCommand(format!("cannot launch `{program}`: {e}")))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(input_text.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(AttestError::BadCommand(format!(
            "`{command}` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The expected output as literal text, for string and command comparison.
fn expected_text(test: &TestCase, accept: bool) -> Result<Option<String>, AttestError> {
    match &test.output {
        Some(Element::Fragment { text, .. }) => Ok(Some(text.clone())),
        Some(Element::Container { blocks, .. }) => {
            Ok(Some(quill::markdown::write_blocks(blocks)))
        }
        None if accept => Ok(None),
        None => Err(AttestError::MissingOutput),
    }
}

/// The expected output as a document tree.
///
/// Fragments are parsed under the resolved target format; containers are
/// literal nested content and are never re-parsed.
fn expected_document(test: &TestCase, accept: bool) -> Result<Option<Document>, AttestError> {
    match &test.output {
        Some(Element::Fragment { text, .. }) => {
            let document = quill::read(text, &test.target_format).map_err(|source| {
                AttestError::UnparsableExpected {
                    format: test.target_format.to_string(),
                    source,
                }
            })?;
            Ok(Some(document))
        }
        Some(Element::Container { blocks, .. }) => Ok(Some(Document::new(blocks.clone()))),
        None if accept => Ok(None),
        None => Err(AttestError::MissingOutput),
    }
}

fn compare_strings(expected: &str, actual: &str) -> Outcome {
    if expected == actual {
        Outcome::Pass
    } else {
        Outcome::Fail(unified_diff(expected, actual))
    }
}

fn compare_documents(test: &TestCase, expected: &Document, actual: &Document) -> Outcome {
    let expected = apply_modifiers(test, expected.clone());
    let actual = apply_modifiers(test, actual.clone());
    if expected == actual {
        return Outcome::Pass;
    }
    // Diff the native serializations; structural mismatches read best there.
    let native = Format::native();
    let expected_text = quill::write(&expected, &native).unwrap_or_default();
    let actual_text = quill::write(&actual, &native).unwrap_or_default();
    Outcome::Fail(unified_diff(&expected_text, &actual_text))
}

fn unified_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut out = String::from("--- expected\n+++ actual\n");
    for hunk in diff.unified_diff().iter_hunks() {
        out.push_str(&hunk.to_string());
    }
    out
}

// ============================================================================
// Modifier filters
// ============================================================================

/// Applies the modifier filters implied by boolean options. Both trees get
/// the same treatment, so semantically irrelevant differences cancel out.
fn apply_modifiers(test: &TestCase, mut document: Document) -> Document {
    if test.options.ignore_softbreaks() {
        document.blocks = document.blocks.into_iter().map(soften_block).collect();
    }
    if test.options.metastrings_to_inlines() {
        document.meta = document
            .meta
            .into_iter()
            .map(|(k, v)| (k, lift_metastrings(v)))
            .collect();
    }
    document
}

/// Replaces every soft line break with a single space and re-merges the
/// surrounding text runs.
fn soften_block(block: Block) -> Block {
    match block {
        Block::Para(inlines) => Block::Para(soften_inlines(inlines)),
        Block::Header(level, attr, inlines) => {
            Block::Header(level, attr, soften_inlines(inlines))
        }
        Block::Div(attr, blocks) => {
            Block::Div(attr, blocks.into_iter().map(soften_block).collect())
        }
        Block::BlockQuote(blocks) => {
            Block::BlockQuote(blocks.into_iter().map(soften_block).collect())
        }
        Block::BulletList(items) => Block::BulletList(soften_items(items)),
        Block::OrderedList(start, items) => Block::OrderedList(start, soften_items(items)),
        other => other,
    }
}

fn soften_items(items: Vec<Vec<Block>>) -> Vec<Vec<Block>> {
    items
        .into_iter()
        .map(|item| item.into_iter().map(soften_block).collect())
        .collect()
}

fn soften_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let replaced = inlines
        .into_iter()
        .map(|inline| match inline {
            Inline::SoftBreak => Inline::Str(" ".into()),
            Inline::Emph(inner) => Inline::Emph(soften_inlines(inner)),
            Inline::Strong(inner) => Inline::Strong(soften_inlines(inner)),
            Inline::Link(attr, inner, url) => Inline::Link(attr, soften_inlines(inner), url),
            Inline::Image(attr, inner, url) => Inline::Image(attr, soften_inlines(inner), url),
            other => other,
        })
        .collect();
    coalesce_strs(replaced)
}

/// Recursively lifts plain-string metadata leaves to inline content, so
/// metadata produced by different readers compares equal.
fn lift_metastrings(value: MetaValue) -> MetaValue {
    match value {
        MetaValue::MetaString(s) => MetaValue::MetaInlines(vec![Inline::Str(s)]),
        MetaValue::MetaList(items) => {
            MetaValue::MetaList(items.into_iter().map(lift_metastrings).collect())
        }
        MetaValue::MetaMap(map) => MetaValue::MetaMap(
            map.into_iter()
                .map(|(k, v)| (k, lift_metastrings(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(raw: &str) -> TestCase {
        TestCase::parse(raw, &Format::markdown(), PathBuf::new()).unwrap()
    }

    #[test]
    fn matching_documents_pass() {
        let test = parse(
            "``` {#input .markdown}\nStuff is *important*!\n```\n\n\
             ``` {#expected .markdown}\nStuff is *important*!\n```\n",
        );
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass));
    }

    #[test]
    fn mismatch_fails_with_a_diff() {
        let test = parse(
            "``` {#input .markdown}\nStuff is *important*!\n```\n\n\
             ``` {#expected .markdown}\nStuff is *unimportant*!\n```\n",
        );
        let eval = evaluate(&test, false).unwrap();
        let Outcome::Fail(report) = eval.outcome else {
            panic!("expected failure");
        };
        assert!(report.contains("--- expected"));
        assert!(report.contains("important"));
    }

    #[test]
    fn disabled_tests_are_never_evaluated() {
        // No input, no output: still just Disabled.
        let test = parse("---\nattest:\n  disable: true\n---\n\nProse only.\n");
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Disabled));
        assert!(eval.actual.is_none());
    }

    #[test]
    fn softbreak_wrapping_is_ignored_when_asked() {
        let raw = "---\nattest:\n  ignore-softbreaks: true\n---\n\n\
             ``` {#input .markdown}\none tiny\nline\n```\n\n\
             ``` {#expected .markdown}\none tiny line\n```\n";
        let test = parse(raw);
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);

        // Without the option the same test fails.
        let strict = parse(&raw.replace("ignore-softbreaks: true", "ignore-softbreaks: false"));
        let eval = evaluate(&strict, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Fail(_)));
    }

    #[test]
    fn strings_mode_compares_serializations() {
        let test = parse(
            "---\nattest:\n  compare: strings\n---\n\n\
             ``` {#input .markdown}\nStuff is *important*!\n```\n\n\
             ``` {#expected .html}\n<p>Stuff is <em>important</em>!</p>\n```\n",
        );
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn container_output_is_compared_literally() {
        let test = parse(
            "``` {#input .markdown}\nLiteral *content*.\n```\n\n\
             ::: {#output}\nLiteral *content*.\n:::\n",
        );
        let eval = evaluate(&test, false).unwrap();
        assert!(matches!(eval.outcome, Outcome::Pass), "{:?}", eval.outcome);
    }

    #[test]
    fn unparsable_expected_is_distinct() {
        let test = parse(
            "``` {#input .markdown}\nx\n```\n\n\
             ``` {#expected .native}\nnot valid json\n```\n",
        );
        let err = evaluate(&test, false).unwrap_err();
        assert!(matches!(err, AttestError::UnparsableExpected { .. }));

        // Accept mode rewrites over garbage instead of erroring.
        let eval = evaluate(&test, true).unwrap();
        assert!(matches!(eval.outcome, Outcome::Fail(_)));
        assert!(eval.actual.is_some());
    }

    #[test]
    fn missing_output_errors_outside_accept_mode() {
        let test = parse("``` {#input .markdown}\nx\n```\n");
        let err = evaluate(&test, false).unwrap_err();
        assert!(matches!(err, AttestError::MissingOutput));

        let eval = evaluate(&test, true).unwrap();
        assert!(matches!(eval.outcome, Outcome::Fail(_)));
        assert!(eval.actual.is_some());
    }

    #[test]
    fn command_must_name_the_converter() {
        let test = parse(
            "``` {#input}\nx\n```\n\n``` {#command}\nrm -rf /\n```\n\n``` {#expected}\nx\n```\n",
        );
        let err = evaluate(&test, false).unwrap_err();
        assert!(matches!(err, AttestError::BadCommand(_)));
    }

    #[test]
    fn metastrings_lift_recursively() {
        let lifted = lift_metastrings(MetaValue::MetaList(vec![MetaValue::MetaString(
            "x".into(),
        )]));
        assert_eq!(
            lifted,
            MetaValue::MetaList(vec![MetaValue::MetaInlines(vec![Inline::Str("x".into())])])
        );
    }
}
