use std::collections::BTreeSet;
use std::path::Path;

use crate::builtins::BUILTIN_NAMES;
use crate::config::read_config;
use crate::error::Result;
use crate::render::content::{condition_names, placeholder_names};
use crate::render::walker::{scan_files, SourceFile};
use crate::variables::{compile_validator, resolution_order};
use crate::CONTENT_DIR;

/// Result of validating a partial.
pub struct CheckResult {
    pub partial_name: String,
    pub variable_count: usize,
    pub file_count: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Validate a partial directory without rendering anything.
///
/// Only an unreadable or unparsable manifest is returned as `Err`; everything
/// else is collected so one run reports every problem.
pub fn check_partial(partial_dir: &Path) -> Result<CheckResult> {
    let config = read_config(partial_dir)?;

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    if let Err(e) = config.validate() {
        errors.push(format!("Manifest validation: {e}"));
    }

    for spec in &config.variables {
        if let Err(e) = compile_validator(spec) {
            errors.push(e.to_string());
        }
    }

    if let Err(e) = resolution_order(&config.variables) {
        errors.push(e.to_string());
    }

    let known: BTreeSet<&str> = config
        .variables
        .iter()
        .map(|s| s.name.as_str())
        .chain(BUILTIN_NAMES.iter().copied())
        .collect();

    for spec in &config.variables {
        let Some(default) = &spec.default else {
            continue;
        };
        for name in placeholder_names(default) {
            if !known.contains(name.as_str()) {
                warnings.push(format!(
                    "Default of '{}' references undeclared variable '{name}'",
                    spec.name
                ));
            }
        }
    }

    let stages = [
        ("Pre-apply", &config.hooks.pre_apply),
        ("Post-apply", &config.hooks.post_apply),
    ];
    for (stage, scripts) in stages {
        for script in scripts {
            if !partial_dir.join(script).is_file() {
                errors.push(format!("{stage} hook not found: {script}"));
            }
        }
    }

    let content_dir = partial_dir.join(CONTENT_DIR);
    let mut file_count = 0;
    if content_dir.is_dir() {
        let files = scan_files(&content_dir, &config.files.patterns)?;
        file_count = files.len();
        for file in &files {
            check_file(file, &config.template.template_markers, &known, &mut warnings);
        }
    } else {
        errors.push(format!(
            "Content directory not found: {}",
            content_dir.display()
        ));
    }

    Ok(CheckResult {
        partial_name: config.template.name,
        variable_count: config.variables.len(),
        file_count,
        warnings,
        errors,
    })
}

/// Warn about names in a file's path, and in a template file's body, that
/// nothing will fill in unless the caller passes them explicitly.
fn check_file(
    file: &SourceFile,
    markers: &[String],
    known: &BTreeSet<&str>,
    warnings: &mut Vec<String>,
) {
    let mut unknown: Vec<String> = placeholder_names(&file.relative_path)
        .into_iter()
        .filter(|name| !known.contains(name.as_str()))
        .collect();

    let is_template = markers
        .iter()
        .any(|m| file.relative_path.ends_with(m.as_str()));

    if is_template {
        match std::fs::read(&file.source_path) {
            Ok(bytes) if content_inspector::inspect(&bytes).is_text() => {
                let text = String::from_utf8_lossy(&bytes);
                let names = condition_names(&text)
                    .into_iter()
                    .chain(placeholder_names(&text));
                for name in names {
                    if !known.contains(name.as_str()) && !unknown.contains(&name) {
                        unknown.push(name);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warnings.push(format!("Could not read {}: {e}", file.relative_path)),
        }
    }

    for name in unknown {
        warnings.push(format!(
            "Unresolved placeholder {{{{{name}}}}} in {}",
            file.relative_path
        ));
    }
}
