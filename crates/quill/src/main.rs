#![forbid(unsafe_code)]

//! # Quill CLI
//!
//! Document converter over stdin/stdout.
//!
//! ## Usage
//!
//! ```bash
//! quill --from=markdown --to=native < doc.md
//! echo '*hi*' | quill --to=html
//! ```

use std::io::Read;

use anyhow::Context;
use clap::Parser;

use quill::Format;

/// Convert a document between formats.
#[derive(Debug, Parser)]
#[command(name = "quill", version, about)]
struct Args {
    /// Input format, with optional extension flags (e.g. markdown-smart).
    #[arg(short, long, default_value = "markdown")]
    from: String,

    /// Output format, with optional extension flags.
    #[arg(short, long, default_value = "native")]
    to: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("read input from stdin")?;

    let document = quill::read(&input, &Format::parse(&args.from))
        .with_context(|| format!("parse input as `{}`", args.from))?;
    let output = quill::write(&document, &Format::parse(&args.to))
        .with_context(|| format!("render output as `{}`", args.to))?;

    print!("{output}");
    Ok(())
}
