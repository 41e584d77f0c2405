//! Test configuration and group resolution.
//!
//! Options live in two places: a test file's own metadata (under the
//! `attest` key) and a directory-wide options file sitting next to the
//! tests. Both populate the same fixed [`TestOptions`] struct; the merge
//! copies a group value only where the test did not set one, so test-local
//! settings always win.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quill::{Format, Meta, MetaValue};
use tracing::debug;

use crate::error::AttestError;

/// Metadata key holding a test file's own options.
pub const OPTIONS_META_KEY: &str = "attest";

/// Fixed name of the directory-level options file.
pub const OPTIONS_FILE: &str = "_options.md";

/// How actual and expected results are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Structural comparison of document trees (the default).
    #[default]
    Documents,
    /// Byte-for-byte comparison of serialized strings.
    Strings,
}

impl CompareMode {
    fn parse(value: &str) -> Result<Self, AttestError> {
        match value {
            "documents" => Ok(CompareMode::Documents),
            "strings" => Ok(CompareMode::Strings),
            other => Err(AttestError::UnknownCompareMode(other.to_string())),
        }
    }
}

/// Per-test configuration.
///
/// Fields are tri-state internally (unset / set) so the group-level merge
/// can tell an explicit `false` apart from an absent key; accessors apply
/// the documented defaults.
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    filters: Option<Vec<String>>,
    ignore_softbreaks: Option<bool>,
    metastrings_to_inlines: Option<bool>,
    compare: Option<CompareMode>,
    disable: Option<bool>,
}

impl TestOptions {
    /// Reads options from a test file's metadata (the `attest` key).
    ///
    /// An absent key means an empty option set.
    pub fn from_meta(meta: &Meta) -> Result<Self, AttestError> {
        match meta.get(OPTIONS_META_KEY) {
            Some(MetaValue::MetaMap(map)) => Self::from_map(map),
            _ => Ok(Self::default()),
        }
    }

    /// Reads options from a mapping of known keys; unknown keys are ignored.
    pub fn from_map(map: &BTreeMap<String, MetaValue>) -> Result<Self, AttestError> {
        let mut options = Self::default();
        if let Some(value) = map.get("filters") {
            options.filters = Some(string_list(value));
        }
        if let Some(value) = map.get("ignore-softbreaks") {
            options.ignore_softbreaks = value.as_bool();
        }
        if let Some(value) = map.get("metastrings-to-inlines") {
            options.metastrings_to_inlines = value.as_bool();
        }
        if let Some(value) = map.get("compare").and_then(MetaValue::as_str) {
            options.compare = Some(CompareMode::parse(&value)?);
        }
        if let Some(value) = map.get("disable") {
            options.disable = value.as_bool();
        }
        Ok(options)
    }

    /// Copies each group-level value into this option set where no
    /// test-local value exists. Never overwrites.
    pub fn merge_defaults(&mut self, group: &TestOptions) {
        if self.filters.is_none() {
            self.filters = group.filters.clone();
        }
        if self.ignore_softbreaks.is_none() {
            self.ignore_softbreaks = group.ignore_softbreaks;
        }
        if self.metastrings_to_inlines.is_none() {
            self.metastrings_to_inlines = group.metastrings_to_inlines;
        }
        if self.compare.is_none() {
            self.compare = group.compare;
        }
        if self.disable.is_none() {
            self.disable = group.disable;
        }
    }

    /// Ordered filter identifiers to run the input through.
    pub fn filters(&self) -> &[String] {
        self.filters.as_deref().unwrap_or(&[])
    }

    /// Whether soft line breaks are normalized away before comparison.
    pub fn ignore_softbreaks(&self) -> bool {
        self.ignore_softbreaks.unwrap_or(false)
    }

    /// Whether plain-string metadata leaves are lifted to inline content
    /// before comparison.
    pub fn metastrings_to_inlines(&self) -> bool {
        self.metastrings_to_inlines.unwrap_or(false)
    }

    /// The comparison mode.
    pub fn compare(&self) -> CompareMode {
        self.compare.unwrap_or_default()
    }

    /// Whether the test is disabled.
    pub fn disable(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}

fn string_list(value: &MetaValue) -> Vec<String> {
    match value {
        MetaValue::MetaList(items) => items.iter().filter_map(MetaValue::as_str).collect(),
        other => other.as_str().into_iter().collect(),
    }
}

/// A group of test files resolved from one path argument, plus the
/// directory-level default options.
#[derive(Debug, Default)]
pub struct TestGroup {
    /// Candidate test files, in deterministic order.
    pub entries: Vec<PathBuf>,
    /// Directory-level default options.
    pub options: TestOptions,
}

impl TestGroup {
    /// Resolves a file or directory into a test group.
    ///
    /// Directories are listed non-recursively; every entry except the
    /// fixed-name options file becomes a candidate test. Failure to read
    /// the path at all is fatal to the run and surfaces here.
    pub fn resolve(path: &Path) -> Result<Self, AttestError> {
        let (entries, options_path) = if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .filter(|p| p.file_name().is_none_or(|n| n != OPTIONS_FILE))
                .collect();
            entries.sort();
            (entries, path.join(OPTIONS_FILE))
        } else {
            // A target that cannot be read at all is fatal to the run.
            fs::metadata(path)?;
            let options_path = path
                .parent()
                .map_or_else(|| PathBuf::from(OPTIONS_FILE), |dir| dir.join(OPTIONS_FILE));
            (vec![path.to_path_buf()], options_path)
        };

        let options = if options_path.is_file() {
            debug!(path = %options_path.display(), "reading group options");
            read_options_file(&options_path)?
        } else {
            TestOptions::default()
        };

        Ok(Self { entries, options })
    }
}

/// Parses the directory options file: a metadata-only document, wrapped in
/// `---` markers if the file does not already carry them.
fn read_options_file(path: &Path) -> Result<TestOptions, AttestError> {
    let content = fs::read_to_string(path)?;
    let wrapped = if content.trim_start().starts_with("---") {
        content
    } else {
        format!("---\n{}\n---\n", content.trim_end())
    };
    let document = quill::read(&wrapped, &Format::markdown())?;
    TestOptions::from_map(&document.meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_from_yaml(yaml: &str) -> Result<TestOptions, AttestError> {
        let text = format!("---\nattest:\n{yaml}\n---\n");
        let doc = quill::read(&text, &Format::markdown()).unwrap();
        TestOptions::from_meta(&doc.meta)
    }

    #[test]
    fn defaults_are_documented_ones() {
        let options = TestOptions::default();
        assert!(options.filters().is_empty());
        assert!(!options.ignore_softbreaks());
        assert!(!options.metastrings_to_inlines());
        assert_eq!(options.compare(), CompareMode::Documents);
        assert!(!options.disable());
    }

    #[test]
    fn known_keys_are_read() {
        let options = options_from_yaml(
            "  filters:\n    - citeproc\n    - my-filter\n  ignore-softbreaks: true\n  compare: strings\n",
        )
        .unwrap();
        assert_eq!(options.filters(), ["citeproc", "my-filter"]);
        assert!(options.ignore_softbreaks());
        assert_eq!(options.compare(), CompareMode::Strings);
    }

    #[test]
    fn unknown_compare_mode_is_an_error() {
        let err = options_from_yaml("  compare: trees\n").unwrap_err();
        assert!(matches!(err, AttestError::UnknownCompareMode(mode) if mode == "trees"));
    }

    #[test]
    fn merge_never_overwrites_local_values() {
        let mut local = options_from_yaml("  ignore-softbreaks: false\n").unwrap();
        let group =
            options_from_yaml("  ignore-softbreaks: true\n  disable: true\n").unwrap();
        local.merge_defaults(&group);
        // Explicit local `false` survives a group-level `true`.
        assert!(!local.ignore_softbreaks());
        // Absent local key picks up the group value.
        assert!(local.disable());
    }

    #[test]
    fn resolve_skips_the_options_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "x\n").unwrap();
        fs::write(dir.path().join("b.md"), "x\n").unwrap();
        fs::write(dir.path().join(OPTIONS_FILE), "disable: true\n").unwrap();

        let group = TestGroup::resolve(dir.path()).unwrap();
        let names: Vec<_> = group
            .entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.md", "b.md"]);
        assert!(group.options.disable());
    }

    #[test]
    fn nonexistent_path_fails_resolution() {
        let err = TestGroup::resolve(Path::new("/no/such/file.md")).unwrap_err();
        assert!(matches!(err, AttestError::Io(_)));
    }

    #[test]
    fn single_file_reads_sibling_options() {
        let dir = tempfile::tempdir().unwrap();
        let test = dir.path().join("t.md");
        fs::write(&test, "x\n").unwrap();
        fs::write(
            dir.path().join(OPTIONS_FILE),
            "---\nignore-softbreaks: true\n---\n",
        )
        .unwrap();

        let group = TestGroup::resolve(&test).unwrap();
        assert_eq!(group.entries, vec![test]);
        assert!(group.options.ignore_softbreaks());
    }
}
