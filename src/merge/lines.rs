use std::collections::HashSet;

use super::MergeFormat;
use crate::error::{Result, StampError};

/// Union of two ignore files.
///
/// Every line of `existing` stays where it is. Non-blank `incoming` lines are
/// appended in order, trimmed, unless the same text is already present.
pub fn merge_lines(path: &str, existing: &[u8], incoming: &[u8]) -> Result<Vec<u8>> {
    let existing = decode(path, existing)?;
    let incoming = decode(path, incoming)?;

    let mut output: Vec<String> = split_lines(&existing).map(str::to_string).collect();
    let mut seen: HashSet<String> = output.iter().map(|l| l.trim().to_string()).collect();

    for line in split_lines(&incoming) {
        let trimmed = line.trim();
        if trimmed.is_empty() || seen.contains(trimmed) {
            continue;
        }
        seen.insert(trimmed.to_string());
        output.push(trimmed.to_string());
    }

    if output.is_empty() {
        return Ok(Vec::new());
    }

    let mut merged = output.join("\n");
    merged.push('\n');
    Ok(merged.into_bytes())
}

fn decode(path: &str, bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| StampError::MergeParse {
        path: path.to_string(),
        format: MergeFormat::LineSet.name().to_string(),
        message: e.to_string(),
    })
}

/// Lines with CRLF normalized, minus one trailing empty line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines.into_iter()
}
