use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, StampError};
use crate::glob::{normalize_path, PatternSet};

/// A file found under the partial's content directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Forward-slash path relative to the source root.
    pub relative_path: String,
    pub source_path: PathBuf,
}

impl SourceFile {
    pub fn new(source_root: &Path, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        Self {
            source_path: source_root.join(&relative_path),
            relative_path,
        }
    }
}

/// Walk `source_root` and return every file the pattern set selects.
///
/// Directories are never yielded. Results come back in walk order; callers that
/// need a stable order sort them.
pub fn scan_files(source_root: &Path, patterns: &PatternSet) -> Result<Vec<SourceFile>> {
    if !source_root.is_dir() {
        return Err(StampError::Io {
            context: format!("reading partial content directory {}", source_root.display()),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(source_root).min_depth(1) {
        let entry = entry.map_err(|e| StampError::Walk {
            path: source_root.to_path_buf(),
            source: e,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(source_root)
            .map_err(|_| StampError::Io {
                context: format!("scanning {}", entry.path().display()),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "entry is outside the partial content directory",
                ),
            })?;
        let rel_str = normalize_path(&rel_path.to_string_lossy());

        if !patterns.is_match(&rel_str) {
            tracing::trace!(path = %rel_str, "not selected");
            continue;
        }

        files.push(SourceFile {
            relative_path: rel_str,
            source_path: entry.path().to_path_buf(),
        });
    }

    Ok(files)
}
