//! Structural merging of an incoming file into one that already exists.

pub mod lines;
pub mod structured;

use std::path::Path;

use crate::error::{Result, StampError};

/// How two versions of a file are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFormat {
    /// Ignore-style files: union of lines.
    LineSet,
    Json,
    /// First document only.
    Yaml,
}

impl MergeFormat {
    pub fn name(self) -> &'static str {
        match self {
            MergeFormat::LineSet => "ignore file",
            MergeFormat::Json => "JSON",
            MergeFormat::Yaml => "YAML",
        }
    }
}

const LINE_SET_FILES: &[&str] = &[".gitignore", ".dockerignore", ".npmignore"];

/// Pick a merge strategy from the destination file name.
pub fn detect_format(path: impl AsRef<Path>) -> Option<MergeFormat> {
    let path = path.as_ref();
    let file_name = path.file_name()?.to_str()?;
    if LINE_SET_FILES.contains(&file_name) {
        return Some(MergeFormat::LineSet);
    }
    match path.extension()?.to_str()? {
        "json" => Some(MergeFormat::Json),
        "yaml" | "yml" => Some(MergeFormat::Yaml),
        _ => None,
    }
}

pub fn is_mergeable(path: impl AsRef<Path>) -> bool {
    detect_format(path).is_some()
}

/// Merge `incoming` into `existing` using the given format.
///
/// `path` is only used in error messages.
pub fn merge(path: &str, existing: &[u8], incoming: &[u8], format: MergeFormat) -> Result<Vec<u8>> {
    tracing::debug!(path, format = format.name(), "merging");
    match format {
        MergeFormat::LineSet => lines::merge_lines(path, existing, incoming),
        MergeFormat::Json => structured::merge_json(path, existing, incoming),
        MergeFormat::Yaml => structured::merge_yaml(path, existing, incoming),
    }
}

/// Merge using the strategy implied by `path`.
pub fn merge_for_path(path: &str, existing: &[u8], incoming: &[u8]) -> Result<Vec<u8>> {
    let format = detect_format(path).ok_or_else(|| StampError::UnsupportedMergeFormat {
        path: path.to_string(),
    })?;
    merge(path, existing, incoming, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(".gitignore", Some(MergeFormat::LineSet))]
    #[case("web/.dockerignore", Some(MergeFormat::LineSet))]
    #[case(".npmignore", Some(MergeFormat::LineSet))]
    #[case(".prettierignore", None)]
    #[case("package.json", Some(MergeFormat::Json))]
    #[case(".github/workflows/ci.yml", Some(MergeFormat::Yaml))]
    #[case("docker-compose.yaml", Some(MergeFormat::Yaml))]
    #[case("Cargo.toml", None)]
    #[case("Makefile", None)]
    fn test_detect_format(#[case] path: &str, #[case] expected: Option<MergeFormat>) {
        assert_eq!(detect_format(path), expected);
    }

    #[test]
    fn test_merge_for_unsupported_path() {
        let result = merge_for_path("README.md", b"a", b"b");
        assert!(matches!(
            result,
            Err(StampError::UnsupportedMergeFormat { .. })
        ));
    }
}
