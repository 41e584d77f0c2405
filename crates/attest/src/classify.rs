//! Role classification for structural elements.
//!
//! A test file marks its pieces by identifier: the element holding the
//! fragment to transform, the element holding the expected result, and
//! optionally a command line to run. Classification looks only at the
//! identifier; classes and key-value attributes never affect the role.

use quill::Attr;

/// The role a structural element plays within a test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The fragment or content to be transformed.
    Input,
    /// The expected transformation result.
    Output,
    /// A literal converter command line to execute.
    Command,
}

impl Role {
    /// Human-readable role name, as used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Output => "output",
            Role::Command => "command",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if the element holds test input: identifier `input` or `in`,
/// exact match.
pub fn is_input(attr: &Attr) -> bool {
    attr.identifier == "input" || attr.identifier == "in"
}

/// True if the element holds expected output: any identifier starting with
/// `out`, or exactly `expected`.
///
/// The prefix match is intentional: it admits `out`, `output`, `out1`, and
/// also unrelated identifiers like `outline`. Test authors own their
/// identifier namespace, so the looser match is kept for compatibility.
pub fn is_output(attr: &Attr) -> bool {
    attr.identifier.starts_with("out") || attr.identifier == "expected"
}

/// True if the element holds a command line: identifier `command`.
pub fn is_command(attr: &Attr) -> bool {
    attr.identifier == "command"
}

/// Classifies an element, if it plays any role.
pub fn classify(attr: &Attr) -> Option<Role> {
    if is_input(attr) {
        Some(Role::Input)
    } else if is_output(attr) {
        Some(Role::Output)
    } else if is_command(attr) {
        Some(Role::Command)
    } else {
        None
    }
}
