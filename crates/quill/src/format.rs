//! Format names and extension flags.
//!
//! A format is addressed by a name such as `markdown` or `native`, plus an
//! additive/subtractive extension string (`markdown-smart+raw_html`). The
//! extension universe is open: unknown flags parse fine and are carried
//! along, they just have no effect on readers or writers that do not know
//! them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the engine's native tree serialization.
pub const NATIVE: &str = "native";

/// Name of the default prose markup format.
pub const MARKDOWN: &str = "markdown";

/// Historical alias for [`NATIVE`], accepted wherever a format name is read.
const NATIVE_ALIAS: &str = "haskell";

/// An ordered set of extension flag overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    flags: Vec<(String, bool)>,
}

impl Extensions {
    /// Parses an extension string of the form `+foo-bar+baz`.
    ///
    /// A leading bare word (no sign) is treated as enabled, so attribute
    /// values like `extensions="smart"` behave as expected.
    pub fn parse(spec: &str) -> Self {
        let mut flags = Vec::new();
        let mut enabled = true;
        let mut name = String::new();
        for ch in spec.chars() {
            match ch {
                '+' | '-' => {
                    if !name.is_empty() {
                        flags.push((std::mem::take(&mut name), enabled));
                    }
                    enabled = ch == '+';
                }
                _ if ch.is_whitespace() => {}
                _ => name.push(ch),
            }
        }
        if !name.is_empty() {
            flags.push((name, enabled));
        }
        Self { flags }
    }

    /// Returns the override for a flag, if one was given.
    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, on)| *on)
    }

    /// Returns whether a flag is enabled, falling back to a default.
    pub fn is_enabled(&self, name: &str, default: bool) -> bool {
        self.get(name).unwrap_or(default)
    }

    /// Returns true if no overrides are present.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl fmt::Display for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, on) in &self.flags {
            write!(f, "{}{name}", if *on { '+' } else { '-' })?;
        }
        Ok(())
    }
}

/// A fully resolved format: base name plus extension overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Base format name, alias-normalized.
    pub name: String,
    /// Extension flag overrides.
    pub extensions: Extensions,
}

impl Format {
    /// Creates a format with no extension overrides.
    ///
    /// The `haskell` alias normalizes to [`NATIVE`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: normalize_name(&name.into()),
            extensions: Extensions::default(),
        }
    }

    /// Parses a combined spec such as `markdown-smart`.
    pub fn parse(spec: &str) -> Self {
        let split = spec.find(['+', '-']).unwrap_or(spec.len());
        Self {
            name: normalize_name(spec[..split].trim()),
            extensions: Extensions::parse(&spec[split..]),
        }
    }

    /// Replaces the extension overrides, builder style.
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// The default prose markup format.
    pub fn markdown() -> Self {
        Self::new(MARKDOWN)
    }

    /// The native tree serialization.
    pub fn native() -> Self {
        Self::new(NATIVE)
    }

    /// Returns true if this is the native tree serialization.
    pub fn is_native(&self) -> bool {
        self.name == NATIVE
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.extensions)
    }
}

fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        NATIVE.to_string()
    } else if name == NATIVE_ALIAS {
        NATIVE.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_and_flags() {
        let fmt = Format::parse("markdown-smart+raw_html");
        assert_eq!(fmt.name, "markdown");
        assert_eq!(fmt.extensions.get("smart"), Some(false));
        assert_eq!(fmt.extensions.get("raw_html"), Some(true));
        assert_eq!(fmt.extensions.get("tables"), None);
    }

    #[test]
    fn haskell_is_an_alias_for_native() {
        assert_eq!(Format::new("haskell"), Format::native());
        assert_eq!(Format::parse("haskell").name, "native");
    }

    #[test]
    fn empty_name_means_native() {
        assert!(Format::new("").is_native());
    }

    #[test]
    fn bare_extension_word_is_enabled() {
        let exts = Extensions::parse("smart");
        assert!(exts.is_enabled("smart", false));
    }

    #[test]
    fn display_round_trips() {
        let fmt = Format::parse("markdown-smart");
        assert_eq!(fmt.to_string(), "markdown-smart");
    }
}
