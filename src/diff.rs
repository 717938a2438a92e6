use similar::TextDiff;

/// Unified diff of the current destination content against what would be written.
pub fn unified_diff(current: &str, incoming: &str, path: &str) -> String {
    let diff = TextDiff::from_lines(current, incoming);
    let mut output = String::new();

    output.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&format!("{hunk}"));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_marks_changes() {
        let diff = unified_diff("a\nb\nc\n", "a\nB\nc\n", "x.txt");
        assert!(diff.starts_with("--- a/x.txt\n+++ b/x.txt\n"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+B\n"));
    }

    #[test]
    fn test_identical_content_has_no_hunks() {
        let diff = unified_diff("same\n", "same\n", "x.txt");
        assert_eq!(diff, "--- a/x.txt\n+++ b/x.txt\n");
    }
}
