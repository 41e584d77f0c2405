//! Error taxonomy for the test runner.
//!
//! Every variant here is local to a single test: the group runner reports
//! it, folds it into the aggregate success flag, and moves on. Only
//! failures to access the target path at all abort a run, and those are
//! raised as plain I/O errors at the top level.

use thiserror::Error;

use crate::classify::Role;

/// An error that fails one test.
#[derive(Debug, Error)]
pub enum AttestError {
    /// Two elements classify as the same role in one document.
    #[error("ambiguous test: found a second {role} element")]
    AmbiguousBlock {
        /// The role that matched twice.
        role: Role,
    },

    /// No input element was found and the test is not disabled.
    #[error("no input element found")]
    MissingInput,

    /// No output element was found outside accept mode.
    #[error("no output element found (run with --accept to create one)")]
    MissingOutput,

    /// The expected output text does not parse under the resolved target
    /// format. Reported distinctly from a content mismatch.
    #[error("expected output does not parse as `{format}`: {source}")]
    UnparsableExpected {
        /// The resolved target format name.
        format: String,
        /// The underlying engine error.
        source: quill::EngineError,
    },

    /// A named filter is absent or failed during execution.
    #[error("filter `{name}` failed: {reason}")]
    Filter {
        /// The filter identifier as listed in the test options.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// A command test's command line is unusable.
    #[error("bad command line: {0}")]
    BadCommand(String),

    /// The `compare` option holds an unsupported value.
    #[error("unknown compare mode `{0}` (expected `documents` or `strings`)")]
    UnknownCompareMode(String),

    /// The document engine rejected part of the test file.
    #[error(transparent)]
    Engine(#[from] quill::EngineError),

    /// Reading or writing the test file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
