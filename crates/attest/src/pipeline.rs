//! Producing the actual result: parse the input, thread it through filters.
//!
//! External filters follow the JSON-pipe convention: the document tree goes
//! in on stdin as native JSON, the transformed tree comes back on stdout.
//! Filters that care about the eventual output format get it twice: as
//! their first argument and in the environment, so wrapper scripts can use
//! whichever is convenient.

use std::io::Write;
use std::process::{Command, Stdio};

use quill::{Document, Format};
use tracing::debug;

use crate::error::AttestError;
use crate::testcase::{derive_format, Element, TestCase};

/// Reserved filter name invoking the engine's citation processing.
pub const CITEPROC_FILTER: &str = "citeproc";

/// Environment variable carrying the target format to external filters.
pub const TARGET_FORMAT_ENV: &str = "QUILL_TARGET_FORMAT";

/// Immutable per-invocation context passed to external filters.
///
/// Deliberately narrow: filters see the target-format signal and nothing
/// else of the runner's state.
#[derive(Debug, Clone)]
pub struct FilterEnv {
    /// The format the result will eventually be rendered in.
    pub target_format: Format,
}

/// Runs the test's input through its configured pipeline.
pub fn execute(test: &TestCase) -> Result<Document, AttestError> {
    let input = test.input.as_ref().ok_or(AttestError::MissingInput)?;

    let mut document = match input {
        Element::Fragment { attr, text } => {
            let format = derive_format(attr, Format::markdown());
            debug!(format = %format, "parsing input fragment");
            quill::read(text, &format)?
        }
        // Container inputs are already structured content.
        Element::Container { blocks, .. } => Document::new(blocks.clone()),
    };

    let env = FilterEnv {
        target_format: test.target_format.clone(),
    };
    for name in test.options.filters() {
        document = if name == CITEPROC_FILTER {
            debug!("running citation processing");
            quill::process_citations(document)
        } else {
            debug!(filter = %name, "running external filter");
            run_external_filter(name, &document, &env)?
        };
    }
    Ok(document)
}

fn run_external_filter(
    name: &str,
    document: &Document,
    env: &FilterEnv,
) -> Result<Document, AttestError> {
    let filter_error = |reason: String| AttestError::Filter {
        name: name.to_string(),
        reason,
    };

    let input = serde_json::to_string(document).map_err(|e| filter_error(e.to_string()))?;

    let mut child = Command::new(name)
        .arg(env.target_format.to_string())
        .env(TARGET_FORMAT_ENV, env.target_format.to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| filter_error(format!("cannot launch: {e}")))?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| filter_error(format!("cannot write to filter: {e}")))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| filter_error(format!("cannot collect filter output: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(filter_error(format!(
            "exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| filter_error(format!("produced malformed document tree: {e}")))
}
