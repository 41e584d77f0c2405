//! The native tree serialization: the document AST as JSON.

use crate::ast::Document;
use crate::engine::EngineError;

/// Parses a native JSON tree into a document.
pub fn read(text: &str) -> Result<Document, EngineError> {
    Ok(serde_json::from_str(text)?)
}

/// Serializes a document as a native JSON tree.
pub fn write(document: &Document) -> Result<String, EngineError> {
    let mut text = serde_json::to_string_pretty(document)?;
    text.push('\n');
    Ok(text)
}
