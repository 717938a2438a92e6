use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, StampError};
use crate::merge::merge_for_path;
use crate::render::content::{render_content, unresolved_placeholders};
use crate::render::plan::{Action, PlanEntry};

/// Highest numbered `.bak.N` tried before giving up.
const MAX_BACKUP_ATTEMPTS: usize = 100;

/// Output paths grouped by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub overwritten: Vec<String>,
    pub merged: Vec<String>,
    pub backed_up: Vec<String>,
    /// Backup files written, one per `backed_up` entry.
    pub backups: Vec<PathBuf>,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.created.len()
            + self.skipped.len()
            + self.overwritten.len()
            + self.merged.len()
            + self.backed_up.len()
    }
}

/// Carry out every planned entry in order.
///
/// All entries must already be resolved (no `Prompt` left). The first failing
/// file stops the pass; the returned `ApplyAborted` error holds the report for
/// everything done before it. Completed writes are not rolled back.
pub fn execute_plan(entries: &[PlanEntry], vars: &BTreeMap<String, String>) -> Result<ApplyReport> {
    if let Some(pending) = entries.iter().find(|e| e.action == Action::Prompt) {
        return Err(StampError::UnresolvedConflict {
            path: pending.output_path.clone(),
        });
    }

    let mut report = ApplyReport::default();

    for entry in entries {
        if let Err(e) = execute_entry(entry, vars, &mut report) {
            return Err(StampError::ApplyAborted {
                path: entry.output_path.clone(),
                report: Box::new(report),
                source: Box::new(e),
            });
        }
    }

    Ok(report)
}

fn execute_entry(
    entry: &PlanEntry,
    vars: &BTreeMap<String, String>,
    report: &mut ApplyReport,
) -> Result<()> {
    match entry.action {
        Action::Skip => {
            tracing::info!(path = %entry.output_path, "skipped");
            report.skipped.push(entry.output_path.clone());
        }
        Action::Create => {
            write_output(entry, vars)?;
            tracing::info!(path = %entry.output_path, "created");
            report.created.push(entry.output_path.clone());
        }
        Action::Overwrite => {
            write_output(entry, vars)?;
            tracing::info!(path = %entry.output_path, "overwritten");
            report.overwritten.push(entry.output_path.clone());
        }
        Action::Backup => {
            let backup = backup_file(&entry.dest_path)?;
            write_output(entry, vars)?;
            tracing::info!(path = %entry.output_path, backup = %backup.display(), "backed up");
            report.backed_up.push(entry.output_path.clone());
            report.backups.push(backup);
        }
        Action::Merge => {
            let existing = read(&entry.dest_path)?;
            let incoming = produce_content(entry, vars)?;
            let merged = merge_for_path(&entry.output_path, &existing, &incoming)?;
            write(&entry.dest_path, &merged)?;
            tracing::info!(path = %entry.output_path, "merged");
            report.merged.push(entry.output_path.clone());
        }
        Action::Prompt => {
            return Err(StampError::UnresolvedConflict {
                path: entry.output_path.clone(),
            });
        }
    }
    Ok(())
}

/// The bytes that belong at the destination: rendered for text template files,
/// the source bytes otherwise.
pub fn produce_content(entry: &PlanEntry, vars: &BTreeMap<String, String>) -> Result<Vec<u8>> {
    let bytes = read(&entry.source_path)?;
    if !entry.is_template {
        return Ok(bytes);
    }
    if !content_inspector::inspect(&bytes).is_text() {
        tracing::warn!(path = %entry.relative_path, "binary template file copied verbatim");
        return Ok(bytes);
    }
    match String::from_utf8(bytes) {
        Ok(text) => {
            let rendered = render_content(&text, vars);
            let unresolved = unresolved_placeholders(&rendered, vars);
            if !unresolved.is_empty() {
                tracing::warn!(path = %entry.output_path, ?unresolved, "placeholders left unresolved");
            }
            Ok(rendered.into_bytes())
        }
        Err(e) => {
            tracing::warn!(path = %entry.relative_path, "template is not UTF-8, copied verbatim");
            Ok(e.into_bytes())
        }
    }
}

fn write_output(entry: &PlanEntry, vars: &BTreeMap<String, String>) -> Result<()> {
    let content = produce_content(entry, vars)?;
    write(&entry.dest_path, &content)?;

    let permissions = std::fs::metadata(&entry.source_path)
        .map_err(|e| StampError::Io {
            context: format!("reading permissions of {}", entry.source_path.display()),
            source: e,
        })?
        .permissions();
    std::fs::set_permissions(&entry.dest_path, permissions).map_err(|e| StampError::Io {
        context: format!("setting permissions on {}", entry.dest_path.display()),
        source: e,
    })
}

/// Copy `dest` to `<dest>.bak`, or the first free `<dest>.bak.N`.
pub fn backup_file(dest: &Path) -> Result<PathBuf> {
    let candidates = std::iter::once(backup_name(dest, None))
        .chain((1..=MAX_BACKUP_ATTEMPTS).map(|n| backup_name(dest, Some(n))));

    for candidate in candidates {
        if candidate.symlink_metadata().is_ok() {
            continue;
        }
        std::fs::copy(dest, &candidate).map_err(|e| StampError::Io {
            context: format!("backing up {} to {}", dest.display(), candidate.display()),
            source: e,
        })?;
        return Ok(candidate);
    }

    Err(StampError::BackupUnavailable {
        path: dest.to_path_buf(),
    })
}

fn backup_name(dest: &Path, n: Option<usize>) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    match n {
        None => name.push(".bak"),
        Some(n) => name.push(format!(".bak.{n}")),
    }
    PathBuf::from(name)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| StampError::Io {
        context: format!("reading {}", path.display()),
        source: e,
    })
}

fn write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StampError::Io {
            context: format!("creating directory {}", parent.display()),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| StampError::Io {
        context: format!("writing {}", path.display()),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn entry(source: &Path, dest: &Path, rel: &str, out: &str, action: Action) -> PlanEntry {
        PlanEntry {
            relative_path: rel.to_string(),
            output_path: out.to_string(),
            source_path: source.join(rel),
            dest_path: dest.join(out),
            is_template: rel != out,
            exists_in_target: dest.join(out).exists(),
            is_preserved: false,
            action,
        }
    }

    fn vars() -> BTreeMap<String, String> {
        [("NAME".to_string(), "demo".to_string())].into()
    }

    #[test]
    fn test_create_renders_templates_and_copies_others() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("README.md.tmpl"), "# {{NAME}}\n").unwrap();
        fs::write(src.path().join("raw.txt"), "{{NAME}}").unwrap();

        let entries = vec![
            entry(src.path(), dst.path(), "README.md.tmpl", "README.md", Action::Create),
            entry(src.path(), dst.path(), "raw.txt", "raw.txt", Action::Create),
        ];
        let report = execute_plan(&entries, &vars()).unwrap();

        assert_eq!(report.created, vec!["README.md", "raw.txt"]);
        assert_eq!(
            fs::read_to_string(dst.path().join("README.md")).unwrap(),
            "# demo\n"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("raw.txt")).unwrap(),
            "{{NAME}}"
        );
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join(".github/workflows")).unwrap();
        fs::write(src.path().join(".github/workflows/ci.yml"), "on: push\n").unwrap();

        let entries = vec![entry(
            src.path(),
            dst.path(),
            ".github/workflows/ci.yml",
            ".github/workflows/ci.yml",
            Action::Create,
        )];
        execute_plan(&entries, &vars()).unwrap();
        assert!(dst.path().join(".github/workflows/ci.yml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let script = src.path().join("setup.sh.tmpl");
        fs::write(&script, "#!/bin/sh\necho {{NAME}}\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let entries = vec![entry(
            src.path(),
            dst.path(),
            "setup.sh.tmpl",
            "setup.sh",
            Action::Create,
        )];
        execute_plan(&entries, &vars()).unwrap();

        let mode = fs::metadata(dst.path().join("setup.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_backup_keeps_previous_content() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("Makefile"), "new\n").unwrap();
        fs::write(dst.path().join("Makefile"), "old\n").unwrap();
        fs::write(dst.path().join("Makefile.bak"), "older\n").unwrap();

        let entries = vec![entry(src.path(), dst.path(), "Makefile", "Makefile", Action::Backup)];
        let report = execute_plan(&entries, &vars()).unwrap();

        assert_eq!(report.backed_up, vec!["Makefile"]);
        assert_eq!(report.backups, vec![dst.path().join("Makefile.bak.1")]);
        assert_eq!(
            fs::read_to_string(dst.path().join("Makefile")).unwrap(),
            "new\n"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("Makefile.bak")).unwrap(),
            "older\n"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("Makefile.bak.1")).unwrap(),
            "old\n"
        );
    }

    #[test]
    fn test_merge_combines_with_existing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join(".gitignore.tmpl"), "target\n{{NAME}}.log\n").unwrap();
        fs::write(dst.path().join(".gitignore"), "node_modules\ntarget\n").unwrap();

        let entries = vec![entry(
            src.path(),
            dst.path(),
            ".gitignore.tmpl",
            ".gitignore",
            Action::Merge,
        )];
        let report = execute_plan(&entries, &vars()).unwrap();

        assert_eq!(report.merged, vec![".gitignore"]);
        assert_eq!(
            fs::read_to_string(dst.path().join(".gitignore")).unwrap(),
            "node_modules\ntarget\ndemo.log\n"
        );
    }

    #[test]
    fn test_skip_leaves_file_alone() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "new").unwrap();
        fs::write(dst.path().join("a.txt"), "old").unwrap();

        let entries = vec![entry(src.path(), dst.path(), "a.txt", "a.txt", Action::Skip)];
        let report = execute_plan(&entries, &vars()).unwrap();
        assert_eq!(report.skipped, vec!["a.txt"]);
        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "old");
    }

    #[test]
    fn test_unresolved_prompt_is_refused_before_writing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::write(src.path().join("b.txt"), "b").unwrap();

        let entries = vec![
            entry(src.path(), dst.path(), "a.txt", "a.txt", Action::Create),
            entry(src.path(), dst.path(), "b.txt", "b.txt", Action::Prompt),
        ];
        let result = execute_plan(&entries, &vars());
        assert!(matches!(result, Err(StampError::UnresolvedConflict { .. })));
        assert!(!dst.path().join("a.txt").exists());
    }

    #[test]
    fn test_failure_reports_partial_progress() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::write(src.path().join("settings.json"), "{\"x\":1}").unwrap();
        fs::write(dst.path().join("settings.json"), "not json").unwrap();
        fs::write(src.path().join("z.txt"), "z").unwrap();

        let entries = vec![
            entry(src.path(), dst.path(), "a.txt", "a.txt", Action::Create),
            entry(src.path(), dst.path(), "settings.json", "settings.json", Action::Merge),
            entry(src.path(), dst.path(), "z.txt", "z.txt", Action::Create),
        ];

        match execute_plan(&entries, &vars()) {
            Err(StampError::ApplyAborted {
                path,
                report,
                source,
            }) => {
                assert_eq!(path, "settings.json");
                assert_eq!(report.created, vec!["a.txt"]);
                assert!(matches!(*source, StampError::MergeParse { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(dst.path().join("a.txt").exists());
        assert!(!dst.path().join("z.txt").exists());
    }

    #[test]
    fn test_backup_name_format() {
        assert_eq!(
            backup_name(Path::new("/d/x.yml"), None),
            PathBuf::from("/d/x.yml.bak")
        );
        assert_eq!(
            backup_name(Path::new("/d/x.yml"), Some(3)),
            PathBuf::from("/d/x.yml.bak.3")
        );
    }
}
