//! Format dispatch: one entry point each for reading and writing.

use thiserror::Error;
use tracing::debug;

use crate::ast::Document;
use crate::format::{Format, MARKDOWN, NATIVE};
use crate::{html, markdown, native};

/// Error raised by the document engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The format name is not known to the engine at all.
    #[error("unknown format `{0}`")]
    UnknownFormat(String),
    /// The format exists but cannot be read.
    #[error("format `{0}` has no reader")]
    NoReader(String),
    /// The format exists but cannot be written.
    #[error("format `{0}` has no writer")]
    NoWriter(String),
    /// The native tree serialization failed to parse or encode.
    #[error("malformed native document: {0}")]
    Native(#[from] serde_json::Error),
    /// A metadata block failed to parse.
    #[error("malformed metadata block: {0}")]
    Metadata(#[from] serde_yaml::Error),
}

/// Formats the engine knows about, readable or not.
const KNOWN_FORMATS: &[&str] = &[MARKDOWN, NATIVE, "html"];

fn check_known(format: &Format) -> Result<(), EngineError> {
    if KNOWN_FORMATS.contains(&format.name.as_str()) {
        Ok(())
    } else {
        Err(EngineError::UnknownFormat(format.name.clone()))
    }
}

/// Parses raw text into a document under the given format.
pub fn read(text: &str, format: &Format) -> Result<Document, EngineError> {
    check_known(format)?;
    debug!(format = %format, bytes = text.len(), "reading document");
    match format.name.as_str() {
        MARKDOWN => markdown::read(text, &format.extensions),
        NATIVE => native::read(text),
        name => Err(EngineError::NoReader(name.to_string())),
    }
}

/// Serializes a document under the given format.
pub fn write(document: &Document, format: &Format) -> Result<String, EngineError> {
    check_known(format)?;
    debug!(format = %format, "writing document");
    match format.name.as_str() {
        MARKDOWN => Ok(markdown::write(document)),
        NATIVE => native::write(document),
        "html" => Ok(html::write(document)),
        name => Err(EngineError::NoWriter(name.to_string())),
    }
}
