#![forbid(unsafe_code)]

//! # Quill
//!
//! A structured document engine: raw text in, a document tree out, and back.
//!
//! Quill parses text into a [`Document`] tree (blocks, inlines, metadata)
//! under a named [`Format`], serializes trees back to text, and offers a
//! citation-processing pass. Supported formats:
//!
//! - `markdown` — read and write (the default prose markup format)
//! - `native` — read and write (the tree itself, as JSON)
//! - `html` — write only
//!
//! Format names take additive/subtractive extension flags, e.g.
//! `markdown-smart`. The historical name `haskell` is accepted as an alias
//! for `native`.
//!
//! ## Example
//!
//! ```rust
//! use quill::{read, write, Format};
//!
//! let doc = read("Stuff is *important*!\n", &Format::markdown()).unwrap();
//! let native = write(&doc, &Format::native()).unwrap();
//! let back = read(&native, &Format::native()).unwrap();
//! assert_eq!(doc, back);
//! ```

pub mod ast;
mod citeproc;
mod engine;
pub mod format;
mod html;
pub mod markdown;
mod native;

pub use ast::{Attr, Block, Document, Inline, Meta, MetaValue};
pub use citeproc::process_citations;
pub use engine::{read, write, EngineError};
pub use format::{Extensions, Format};
