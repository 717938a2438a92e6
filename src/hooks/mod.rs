use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::schema::{HooksConfig, SkipPolicy};
use crate::error::{Result, StampError};
use crate::render::ApplyReport;

pub const PRE_APPLY: &str = "pre_apply";
pub const POST_APPLY: &str = "post_apply";

/// One script to run, with everything it should see.
#[derive(Debug, Clone)]
pub struct HookInvocation {
    /// `pre_apply` or `post_apply`.
    pub stage: &'static str,
    pub script: PathBuf,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    pub exit_code: i32,
    pub output: String,
}

/// Runs a hook script and reports how it went.
pub trait HookRunner {
    fn run(&self, invocation: &HookInvocation) -> Result<HookOutput>;
}

/// Runs each script with `sh` from the destination directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellHookRunner;

impl HookRunner for ShellHookRunner {
    fn run(&self, invocation: &HookInvocation) -> Result<HookOutput> {
        let output = Command::new("sh")
            .arg(&invocation.script)
            .current_dir(&invocation.working_dir)
            .envs(&invocation.env)
            .output()
            .map_err(|e| StampError::Io {
                context: format!("running hook {}", invocation.script.display()),
                source: e,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(HookOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}

/// Environment handed to hooks: every variable as `STAMP_VAR_<NAME>`, the two
/// roots, and for post hooks the outcome lists (newline separated).
pub fn hook_env(
    vars: &BTreeMap<String, String>,
    partial_dir: &Path,
    dest_dir: &Path,
    report: Option<&ApplyReport>,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = vars
        .iter()
        .map(|(k, v)| (format!("STAMP_VAR_{k}"), v.clone()))
        .collect();
    env.insert(
        "STAMP_SOURCE".to_string(),
        partial_dir.to_string_lossy().into_owned(),
    );
    env.insert(
        "STAMP_DEST".to_string(),
        dest_dir.to_string_lossy().into_owned(),
    );

    if let Some(report) = report {
        let lists = [
            ("STAMP_CREATED", &report.created),
            ("STAMP_SKIPPED", &report.skipped),
            ("STAMP_OVERWRITTEN", &report.overwritten),
            ("STAMP_MERGED", &report.merged),
            ("STAMP_BACKED_UP", &report.backed_up),
        ];
        for (key, paths) in lists {
            env.insert(key.to_string(), paths.join("\n"));
        }
    }

    env
}

/// Run the scripts for `stage` in order. A non-zero exit stops everything.
pub fn run_stage(
    runner: &dyn HookRunner,
    hooks: &HooksConfig,
    stage: &'static str,
    skip: &SkipPolicy,
    partial_dir: &Path,
    dest_dir: &Path,
    env: &BTreeMap<String, String>,
) -> Result<()> {
    let scripts = match stage {
        PRE_APPLY => &hooks.pre_apply,
        _ => &hooks.post_apply,
    };

    if skip.skips(stage) {
        if !scripts.is_empty() {
            tracing::info!(stage, "hooks skipped");
        }
        return Ok(());
    }

    for script in scripts {
        if skip.skips(script) {
            tracing::info!(stage, script, "hook skipped");
            continue;
        }

        let invocation = HookInvocation {
            stage,
            script: partial_dir.join(script),
            working_dir: dest_dir.to_path_buf(),
            env: env.clone(),
        };
        tracing::info!(stage, script, "running hook");
        let result = runner.run(&invocation)?;
        tracing::debug!(stage, script, exit_code = result.exit_code, "hook finished");

        if result.exit_code != 0 {
            return Err(StampError::HookFailed {
                hook: script.clone(),
                exit_code: result.exit_code,
                output: result.output,
            });
        }
    }

    Ok(())
}
