#![forbid(unsafe_code)]

//! # Attest
//!
//! A test runner for document transformations. Test files are ordinary
//! documents whose tagged elements declare an input, an expected output,
//! and optionally a command line; the runner pushes the input through the
//! conversion pipeline and compares document trees structurally.
//!
//! The pieces compose left to right: [`options::TestGroup`] resolves a
//! path into test files, [`TestCase::parse`] extracts the tagged elements,
//! [`evaluate`] produces and compares the actual result, and [`accept`]
//! writes that result back as the new expectation.
//!
//! ```no_run
//! use quill::Format;
//! use std::path::Path;
//!
//! let summary = attest::run(Path::new("tests/cases"), &Format::markdown(), false)?;
//! assert!(summary.success());
//! # Ok::<(), attest::AttestError>(())
//! ```

pub mod accept;
pub mod classify;
pub mod compare;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod runner;
pub mod testcase;

pub use accept::accept;
pub use classify::Role;
pub use compare::{evaluate, Actual, Evaluation, Outcome};
pub use error::AttestError;
pub use options::{CompareMode, TestGroup, TestOptions};
pub use runner::{run, RunSummary};
pub use testcase::{Element, TestCase};
