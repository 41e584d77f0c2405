//! Running a group of tests and reporting results.
//!
//! Tests run sequentially in path order. Any error local to one test is
//! reported and counted; the run continues. Only failure to resolve the
//! target path at all aborts the run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use quill::Format;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::debug;

use crate::compare::{evaluate, Outcome};
use crate::error::AttestError;
use crate::options::TestGroup;
use crate::testcase::TestCase;

/// Aggregate counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tests whose actual output matched the expected one.
    pub passed: usize,
    /// Tests with a mismatch.
    pub failed: usize,
    /// Tests skipped because they are disabled.
    pub disabled: usize,
    /// Tests whose expected output was rewritten in accept mode.
    pub accepted: usize,
    /// Tests that could not be parsed or executed.
    pub errored: usize,
}

impl RunSummary {
    /// Whether the run as a whole succeeded.
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Number of test files considered.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.disabled + self.accepted + self.errored
    }
}

enum Status {
    Passed,
    Failed(String),
    Disabled,
    Accepted,
    Errored(AttestError),
}

/// Lifecycle of one test file. Entries start out as a bare path and are
/// advanced explicitly, in sequence, by the run loop.
enum TestEntry {
    Unparsed(PathBuf),
    Parsed(Box<TestCase>),
    ParseFailed(PathBuf, AttestError),
}

impl TestEntry {
    /// Reads and parses an unparsed entry; other states pass through.
    fn parsed(self, group: &TestGroup, file_format: &Format) -> Self {
        let TestEntry::Unparsed(path) = self else {
            return self;
        };
        match load(&path, group, file_format) {
            Ok(test) => TestEntry::Parsed(Box::new(test)),
            Err(err) => TestEntry::ParseFailed(path, err),
        }
    }

    /// Drives the entry to a final status.
    fn run(self, group: &TestGroup, file_format: &Format, accept: bool) -> (PathBuf, Status) {
        match self {
            TestEntry::Unparsed(_) => self.parsed(group, file_format).run(group, file_format, accept),
            TestEntry::Parsed(test) => {
                let status = match evaluate_parsed(&test, file_format, accept) {
                    Ok(status) => status,
                    Err(err) => Status::Errored(err),
                };
                (test.filepath, status)
            }
            TestEntry::ParseFailed(path, err) => (path, Status::Errored(err)),
        }
    }
}

fn load(path: &Path, group: &TestGroup, file_format: &Format) -> Result<TestCase, AttestError> {
    let raw = fs::read_to_string(path)?;
    let mut test = TestCase::parse(&raw, file_format, path.to_path_buf())?;
    test.options.merge_defaults(&group.options);
    Ok(test)
}

/// Runs every test under `path` and prints per-test status lines.
///
/// `file_format` is the format test files are written in. With `accept`
/// set, failing tests get their expected output rewritten instead of
/// counting as failures.
pub fn run(path: &Path, file_format: &Format, accept: bool) -> Result<RunSummary, AttestError> {
    let group = TestGroup::resolve(path)?;
    debug!(tests = group.entries.len(), "resolved test group");

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut summary = RunSummary::default();

    for path in group.entries.clone() {
        let (path, status) = TestEntry::Unparsed(path).run(&group, file_format, accept);
        report(&mut stdout, &path, &status).ok();
        match status {
            Status::Passed => summary.passed += 1,
            Status::Failed(_) => summary.failed += 1,
            Status::Disabled => summary.disabled += 1,
            Status::Accepted => summary.accepted += 1,
            Status::Errored(_) => summary.errored += 1,
        }
    }

    writeln!(
        &mut stdout,
        "\n{} tests: {} passed, {} failed, {} errored, {} disabled, {} accepted",
        summary.total(),
        summary.passed,
        summary.failed,
        summary.errored,
        summary.disabled,
        summary.accepted,
    )
    .ok();

    Ok(summary)
}

fn evaluate_parsed(
    test: &TestCase,
    file_format: &Format,
    accept: bool,
) -> Result<Status, AttestError> {
    let evaluation = evaluate(test, accept)?;
    match evaluation.outcome {
        Outcome::Pass => Ok(Status::Passed),
        Outcome::Disabled => Ok(Status::Disabled),
        Outcome::Fail(report) => {
            if accept {
                let actual = evaluation
                    .actual
                    .as_ref()
                    .ok_or(AttestError::MissingOutput)?;
                crate::accept::accept(test, actual, file_format)?;
                Ok(Status::Accepted)
            } else {
                Ok(Status::Failed(report))
            }
        }
    }
}

fn report(out: &mut StandardStream, entry: &Path, status: &Status) -> io::Result<()> {
    let (color, label) = match status {
        Status::Passed => (Color::Green, "ok      "),
        Status::Failed(_) => (Color::Red, "FAIL    "),
        Status::Disabled => (Color::Yellow, "disabled"),
        Status::Accepted => (Color::Cyan, "accepted"),
        Status::Errored(_) => (Color::Red, "ERROR   "),
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()?;
    writeln!(out, "  {}", entry.display())?;

    // Details go to stderr so status lines stay scannable.
    match status {
        Status::Failed(diff) => eprint!("{diff}"),
        Status::Errored(err) => eprintln!("{}: {err}", entry.display()),
        _ => {}
    }
    Ok(())
}
