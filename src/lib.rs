pub mod builtins;
pub mod check;
pub mod config;
pub mod diff;
pub mod error;
pub mod glob;
pub mod hooks;
pub mod merge;
pub mod prompt;
pub mod render;
pub mod variables;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::{load_config, load_user_config, PartialConfig, SkipPolicy, UserConfig};
use crate::error::{Result, StampError};
use crate::hooks::{hook_env, run_stage, HookRunner, POST_APPLY, PRE_APPLY};
use crate::prompt::{resolve_batch, resolve_prompts, ConflictResolver, PromptOutcome};
use crate::render::{execute_plan, plan, Action, ApplyReport, ConflictPolicy, PlanEntry, PlanOptions};
use crate::variables::{resolve, ResolvedVariables};

/// Directory inside a partial that holds the files to render.
pub const CONTENT_DIR: &str = "template";

pub struct ApplyOptions {
    /// Partial root (the directory holding `stamp.toml`).
    pub partial: PathBuf,
    /// Destination root. Defaults to the current directory.
    pub output: Option<PathBuf>,
    pub data: Vec<(String, String)>,
    pub conflict: Option<ConflictPolicy>,
    pub no_hooks: bool,
}

impl ApplyOptions {
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output {
            Some(out) => Ok(out.clone()),
            None => std::env::current_dir().map_err(|e| StampError::Io {
                context: "getting current directory".into(),
                source: e,
            }),
        }
    }
}

/// Everything needed to execute an apply that has been planned but not yet written.
pub struct FullApplyPlan {
    pub entries: Vec<PlanEntry>,
    pub variables: ResolvedVariables,
    pub config: PartialConfig,
    pub partial_dir: PathBuf,
    pub output_dir: PathBuf,
    pub conflict_policy: ConflictPolicy,
    pub no_hooks: bool,
}

impl FullApplyPlan {
    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Completed,
    /// Conflict resolution was abandoned. Nothing was written.
    Cancelled { resolved: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub report: ApplyReport,
    pub status: ApplyStatus,
}

/// Plan an apply using the user's `~/.config/stamp/config.toml`, if any.
///
/// Loads the manifest, resolves variables and decides an action for every
/// selected file, but does **not** touch the destination.
pub fn plan_apply(
    options: ApplyOptions,
    builtins: &BTreeMap<String, String>,
) -> Result<FullApplyPlan> {
    let user = load_user_config()?;
    plan_apply_with(options, user.as_ref(), builtins)
}

/// [`plan_apply`] with the user configuration passed in.
pub fn plan_apply_with(
    options: ApplyOptions,
    user: Option<&UserConfig>,
    builtins: &BTreeMap<String, String>,
) -> Result<FullApplyPlan> {
    let config = load_config(&options.partial)?;
    let output_dir = options.output_dir()?;

    // Hooks run from the destination, so scripts need an absolute root.
    let partial_dir = options.partial.canonicalize().map_err(|e| StampError::Io {
        context: format!("resolving partial directory {}", options.partial.display()),
        source: e,
    })?;

    let conflict_policy = options
        .conflict
        .or_else(|| user.and_then(|u| u.conflict))
        .unwrap_or(config.template.conflict);

    let provided = provided_values(&config, user, options.data);
    let variables = resolve(&config.variables, &provided, builtins)?;

    let plan_options = PlanOptions {
        conflict_policy,
        ..PlanOptions::from_config(&config)
    };
    let content_dir = partial_dir.join(CONTENT_DIR);
    let entries = plan(&content_dir, &output_dir, &plan_options, &variables)?;

    tracing::info!(
        partial = %config.template.name,
        files = entries.len(),
        policy = ?conflict_policy,
        "planned apply"
    );

    Ok(FullApplyPlan {
        entries,
        variables,
        config,
        partial_dir,
        output_dir,
        conflict_policy,
        no_hooks: options.no_hooks,
    })
}

/// User answers for declared variables first, then command-line values on top.
fn provided_values(
    config: &PartialConfig,
    user: Option<&UserConfig>,
    data: Vec<(String, String)>,
) -> BTreeMap<String, String> {
    let mut provided = BTreeMap::new();
    if let Some(user) = user {
        for spec in &config.variables {
            if let Some(value) = user.variables.get(&spec.name) {
                provided.insert(spec.name.clone(), value.clone());
            }
        }
    }
    provided.extend(data);
    provided
}

/// Execute a planned apply: settle conflicts, run hooks around the file pass.
///
/// With no `resolver` the run is non-interactive and remaining conflicts are
/// settled by the batch rules before anything is written.
pub fn execute_apply(
    plan: FullApplyPlan,
    resolver: Option<&mut dyn ConflictResolver>,
    hooks: &dyn HookRunner,
) -> Result<ApplyOutcome> {
    let FullApplyPlan {
        mut entries,
        variables,
        config,
        partial_dir,
        output_dir,
        conflict_policy,
        no_hooks,
    } = plan;

    match resolver {
        Some(resolver) => {
            if let PromptOutcome::Cancelled { resolved } = resolve_prompts(&mut entries, resolver)? {
                return Ok(ApplyOutcome {
                    report: ApplyReport::default(),
                    status: ApplyStatus::Cancelled { resolved },
                });
            }
        }
        None => resolve_batch(&mut entries, conflict_policy)?,
    }

    std::fs::create_dir_all(&output_dir).map_err(|e| StampError::Io {
        context: format!("creating output directory {}", output_dir.display()),
        source: e,
    })?;

    let skip = if no_hooks {
        SkipPolicy::All
    } else {
        config.hooks.skip.clone()
    };

    let pre_env = hook_env(&variables, &partial_dir, &output_dir, None);
    run_stage(hooks, &config.hooks, PRE_APPLY, &skip, &partial_dir, &output_dir, &pre_env)?;

    let report = execute_plan(&entries, &variables)?;

    let post_env = hook_env(&variables, &partial_dir, &output_dir, Some(&report));
    if let Err(e) =
        run_stage(hooks, &config.hooks, POST_APPLY, &skip, &partial_dir, &output_dir, &post_env)
    {
        // Files are already written; hand back what happened to them.
        return Err(StampError::ApplyAborted {
            path: POST_APPLY.to_string(),
            report: Box::new(report),
            source: Box::new(e),
        });
    }

    tracing::info!(
        created = report.created.len(),
        skipped = report.skipped.len(),
        overwritten = report.overwritten.len(),
        merged = report.merged.len(),
        backed_up = report.backed_up.len(),
        "apply finished"
    );

    Ok(ApplyOutcome {
        report,
        status: ApplyStatus::Completed,
    })
}

