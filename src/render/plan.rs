use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PartialConfig;
use crate::error::{Result, StampError};
use crate::glob::{matches_any, PatternSet};
use crate::merge::is_mergeable;
use crate::render::content::substitute;
use crate::render::walker::{scan_files, SourceFile};

/// What to do when a rendered file's destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Prompt,
    Skip,
    Overwrite,
    Backup,
    Merge,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prompt" => Ok(ConflictPolicy::Prompt),
            "skip" => Ok(ConflictPolicy::Skip),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "backup" => Ok(ConflictPolicy::Backup),
            "merge" => Ok(ConflictPolicy::Merge),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected prompt, skip, overwrite, backup or merge)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Skip,
    Overwrite,
    Backup,
    Merge,
    Prompt,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Skip => "skip",
            Action::Overwrite => "overwrite",
            Action::Backup => "backup",
            Action::Merge => "merge",
            Action::Prompt => "prompt",
        }
    }
}

/// One file's place in a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Path relative to the source root, as scanned.
    pub relative_path: String,
    /// Path relative to the destination root, marker stripped and placeholders filled.
    pub output_path: String,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub is_template: bool,
    pub exists_in_target: bool,
    pub is_preserved: bool,
    pub action: Action,
}

/// Everything the planner needs besides the two directory roots.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub patterns: PatternSet,
    pub template_markers: Vec<String>,
    pub conflict_policy: ConflictPolicy,
    pub preserve: Vec<String>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            patterns: PatternSet::default(),
            template_markers: vec![".tmpl".to_string()],
            conflict_policy: ConflictPolicy::default(),
            preserve: Vec::new(),
        }
    }
}

impl PlanOptions {
    pub fn from_config(config: &PartialConfig) -> Self {
        Self {
            patterns: config.files.patterns.clone(),
            template_markers: config.template.template_markers.clone(),
            conflict_policy: config.template.conflict,
            preserve: config.files.preserve.clone(),
        }
    }
}

/// Scan `source_root` and plan every selected file, sorted by relative path.
pub fn plan(
    source_root: &Path,
    dest_root: &Path,
    options: &PlanOptions,
    vars: &BTreeMap<String, String>,
) -> Result<Vec<PlanEntry>> {
    let mut candidates = scan_files(source_root, &options.patterns)?;
    candidates.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    plan_entries(candidates, dest_root, options, vars)
}

/// Plan an explicit candidate list, in the order given.
///
/// Fails with `PathTraversal` before anything is touched if any destination
/// would land outside `dest_root`.
pub fn plan_entries(
    candidates: Vec<SourceFile>,
    dest_root: &Path,
    options: &PlanOptions,
    vars: &BTreeMap<String, String>,
) -> Result<Vec<PlanEntry>> {
    let mut entries = Vec::with_capacity(candidates.len());
    let real_root = dest_root.canonicalize().ok();

    for candidate in candidates {
        if !options.patterns.is_match(&candidate.relative_path) {
            continue;
        }

        let (stripped, is_template) =
            strip_template_marker(&candidate.relative_path, &options.template_markers);
        let output_path = substitute(&stripped, vars);

        let dest_path = contained_join(dest_root, &output_path)
            .filter(|dest| match &real_root {
                Some(real_root) => !escapes_through_link(dest_root, real_root, dest),
                None => true,
            })
            .ok_or_else(|| StampError::PathTraversal {
                path: candidate.relative_path.clone(),
            })?;

        let exists_in_target = dest_path.symlink_metadata().is_ok();
        let is_preserved = matches_any(&options.preserve, &output_path);
        let action = decide_action(
            &output_path,
            exists_in_target,
            is_preserved,
            options.conflict_policy,
        );

        tracing::debug!(
            path = %output_path,
            template = is_template,
            exists = exists_in_target,
            preserved = is_preserved,
            action = action.label(),
            "planned"
        );

        entries.push(PlanEntry {
            relative_path: candidate.relative_path,
            output_path,
            source_path: candidate.source_path,
            dest_path,
            is_template,
            exists_in_target,
            is_preserved,
            action,
        });
    }

    Ok(entries)
}

/// Preserve beats every policy; a missing destination is always created.
pub fn decide_action(
    output_path: &str,
    exists_in_target: bool,
    is_preserved: bool,
    policy: ConflictPolicy,
) -> Action {
    if is_preserved && exists_in_target {
        return Action::Skip;
    }
    if !exists_in_target {
        return Action::Create;
    }
    match policy {
        ConflictPolicy::Skip => Action::Skip,
        ConflictPolicy::Overwrite => Action::Overwrite,
        ConflictPolicy::Backup => Action::Backup,
        ConflictPolicy::Merge if is_mergeable(output_path) => Action::Merge,
        ConflictPolicy::Merge | ConflictPolicy::Prompt => Action::Prompt,
    }
}

/// Strip the first matching marker suffix. A bare marker file name is left alone.
fn strip_template_marker(relative_path: &str, markers: &[String]) -> (String, bool) {
    for marker in markers {
        if let Some(stripped) = relative_path.strip_suffix(marker.as_str()) {
            if !stripped.is_empty() && !stripped.ends_with('/') {
                return (stripped.to_string(), true);
            }
        }
    }
    (relative_path.to_string(), false)
}

/// Join `relative` onto `root` lexically, refusing anything that climbs out of
/// `root`, is absolute, or names `root` itself.
fn contained_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    let mut joined = root.to_path_buf();
    joined.extend(parts);
    Some(joined)
}

/// True when the deepest existing part of `dest` resolves outside `real_root`,
/// e.g. through a symlinked directory already present in the project.
fn escapes_through_link(root: &Path, real_root: &Path, dest: &Path) -> bool {
    let mut current = Some(dest);
    while let Some(path) = current {
        if path == root || !path.starts_with(root) {
            return false;
        }
        if path.symlink_metadata().is_ok() {
            return match path.canonicalize() {
                Ok(real) => !real.starts_with(real_root),
                // Dangling link.
                Err(_) => true,
            };
        }
        current = path.parent();
    }
    false
}
