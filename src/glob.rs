//! Glob matching for relative paths.
//!
//! `*` and `?` never cross a `/`. `**` spans whole path segments, including none
//! at all, so `**/foo` matches `foo` and `a/**/b` matches `a/b`. A pattern has
//! to account for the entire path.

use serde::{Deserialize, Serialize};

/// Include/exclude selection rules for source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternSet {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl PatternSet {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Exclude wins over include. An empty include list selects everything not excluded.
    pub fn is_match(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if matches_any(&self.exclude, &path) {
            return false;
        }
        self.include.is_empty() || matches_any(&self.include, &path)
    }
}

/// Convert a platform path string to forward-slash form.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

pub fn matches_any(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, path))
}

/// Match a whole path against a single glob pattern.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let path: Vec<char> = path.chars().collect();
    let mut matcher = Matcher {
        memo: vec![None; (pattern.len() + 1) * (path.len() + 1)],
        pattern: &pattern,
        path: &path,
    };
    matcher.matches(0, 0)
}

struct Matcher<'a> {
    pattern: &'a [char],
    path: &'a [char],
    /// Indexed by `(pattern position, path position)`.
    memo: Vec<Option<bool>>,
}

impl Matcher<'_> {
    fn matches(&mut self, pi: usize, si: usize) -> bool {
        let key = pi * (self.path.len() + 1) + si;
        if let Some(hit) = self.memo[key] {
            return hit;
        }
        let result = self.step(pi, si);
        self.memo[key] = Some(result);
        result
    }

    fn step(&mut self, pi: usize, si: usize) -> bool {
        let Some(&pc) = self.pattern.get(pi) else {
            return si == self.path.len();
        };

        match pc {
            '*' if self.pattern.get(pi + 1) == Some(&'*') => self.double_star(pi, si),
            '*' => {
                // Zero or more characters up to the next separator.
                let mut end = si;
                loop {
                    if self.matches(pi + 1, end) {
                        return true;
                    }
                    match self.path.get(end) {
                        Some(&c) if c != '/' => end += 1,
                        _ => return false,
                    }
                }
            }
            '?' => match self.path.get(si) {
                Some(&c) if c != '/' => self.matches(pi + 1, si + 1),
                _ => false,
            },
            literal => match self.path.get(si) {
                Some(&c) if c == literal => self.matches(pi + 1, si + 1),
                _ => false,
            },
        }
    }

    fn double_star(&mut self, pi: usize, si: usize) -> bool {
        let after = pi + 2;

        if self.pattern.get(after) == Some(&'/') {
            // `**/` consumes zero or more complete segments, each with its trailing slash.
            if self.matches(after + 1, si) {
                return true;
            }
            for end in si + 1..=self.path.len() {
                if self.path[end - 1] == '/' && self.matches(after + 1, end) {
                    return true;
                }
            }
            return false;
        }

        // Trailing `**` or `**` glued to other characters: anything, separators included.
        (si..=self.path.len()).any(|end| self.matches(after, end))
    }
}
