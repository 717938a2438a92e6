//! Values supplied by the environment rather than declared in a manifest.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};

/// Every name [`collect`] may produce.
pub const BUILTIN_NAMES: &[&str] = &[
    "DATE",
    "DIR_NAME",
    "GIT_BRANCH",
    "GIT_USER_EMAIL",
    "GIT_USER_NAME",
    "TIME",
    "TIMESTAMP",
    "YEAR",
];

/// All builtins for a render into `dest_dir`, using the current time and git state.
pub fn collect(dest_dir: &Path) -> BTreeMap<String, String> {
    let mut values = time_values(&Local::now());
    values.extend(directory_values(dest_dir));
    values.extend(git_values(dest_dir));
    values
}

pub fn time_values(now: &DateTime<Local>) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("DATE".to_string(), now.format("%Y-%m-%d").to_string()),
        ("YEAR".to_string(), now.format("%Y").to_string()),
        ("TIME".to_string(), now.format("%H:%M:%S").to_string()),
        ("TIMESTAMP".to_string(), now.to_rfc3339()),
    ])
}

/// `DIR_NAME` is the destination's final component, resolved against the
/// working directory when the path is relative or `.`.
pub fn directory_values(dest_dir: &Path) -> BTreeMap<String, String> {
    let absolute = if dest_dir.is_absolute() {
        dest_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(dest_dir))
            .unwrap_or_else(|_| dest_dir.to_path_buf())
    };
    let normalized = absolute.canonicalize().unwrap_or(absolute);

    normalized
        .file_name()
        .map(|name| {
            BTreeMap::from([(
                "DIR_NAME".to_string(),
                name.to_string_lossy().into_owned(),
            )])
        })
        .unwrap_or_default()
}

/// Branch and author details of the repository containing `dest_dir`, if any.
///
/// Missing repositories and unset config keys are left out rather than reported.
pub fn git_values(dest_dir: &Path) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();

    let start = if dest_dir.exists() {
        dest_dir.to_path_buf()
    } else {
        match dest_dir.ancestors().find(|p| p.exists()) {
            Some(existing) if !existing.as_os_str().is_empty() => existing.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        }
    };

    let repo = match gix::discover(&start) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::debug!(path = %start.display(), error = %e, "no git repository");
            return values;
        }
    };

    match repo.head_name() {
        Ok(Some(name)) => {
            values.insert("GIT_BRANCH".to_string(), name.shorten().to_string());
        }
        Ok(None) => tracing::debug!("git HEAD is detached"),
        Err(e) => tracing::debug!(error = %e, "could not read git HEAD"),
    }

    let config = repo.config_snapshot();
    for (key, builtin) in [("user.name", "GIT_USER_NAME"), ("user.email", "GIT_USER_EMAIL")] {
        if let Some(value) = config.string(key) {
            values.insert(builtin.to_string(), value.to_string());
        }
    }

    values
}
