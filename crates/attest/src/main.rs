#![forbid(unsafe_code)]

//! # Attest CLI
//!
//! Runs document-transformation tests from a file or directory.
//!
//! ## Usage
//!
//! ```bash
//! attest tests/cases            # run a directory of tests
//! attest tests/cases/links.md   # run one test file
//! attest --accept tests/cases   # rewrite expected outputs in place
//! ```
//!
//! Exits 0 when every test passes, 1 when any test fails or errors, and 2
//! when the run itself cannot start. Diagnostics go to stderr, controlled
//! by the `ATTEST_LOG` environment variable.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quill::Format;

/// Run document-transformation tests.
#[derive(Debug, Parser)]
#[command(name = "attest", version, about)]
struct Args {
    /// Test file, or directory of test files (searched non-recursively).
    path: PathBuf,

    /// Rewrite each failing test's expected output with the actual result.
    #[arg(short, long)]
    accept: bool,

    /// Format the test files themselves are written in.
    #[arg(short, long, default_value = "markdown")]
    format: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ATTEST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match try_main(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("attest: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main(args: &Args) -> anyhow::Result<bool> {
    let summary = attest::run(&args.path, &Format::parse(&args.format), args.accept)
        .with_context(|| format!("cannot run tests under `{}`", args.path.display()))?;
    Ok(summary.success())
}
