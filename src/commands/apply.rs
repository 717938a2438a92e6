use std::path::PathBuf;

use console::style;
use miette::{miette, Result};

use stamp::diff::unified_diff;
use stamp::error::StampError;
use stamp::hooks::ShellHookRunner;
use stamp::merge::merge_for_path;
use stamp::prompt::InquireResolver;
use stamp::render::execute::produce_content;
use stamp::render::{Action, ApplyReport, ConflictPolicy, PlanEntry};
use stamp::{ApplyOptions, ApplyStatus, FullApplyPlan};

pub struct ApplyArgs {
    pub partial: PathBuf,
    pub output: Option<PathBuf>,
    pub data: Vec<String>,
    pub conflict: Option<ConflictPolicy>,
    pub yes: bool,
    pub no_hooks: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let data = parse_data(args.data)?;

    let options = ApplyOptions {
        partial: args.partial,
        output: args.output,
        data,
        conflict: args.conflict,
        no_hooks: args.no_hooks,
    };

    let builtins = stamp::builtins::collect(&options.output_dir()?);
    let plan = stamp::plan_apply(options, &builtins)?;

    if args.dry_run {
        print_dry_run(&plan, args.verbose)?;
        return Ok(());
    }

    if !args.no_hooks && plan.config.hooks.has_hooks() {
        eprintln!(
            "{} This partial contains hooks that will execute code on your machine",
            style("warning:").yellow().bold()
        );
        eprintln!("  use --no-hooks to skip hook execution");
    }

    let name = plan.config.template.name.clone();
    let output_dir = plan.output_dir.clone();
    let vars = plan.variables.clone().into_inner();

    let result = if !args.yes && console::user_attended() {
        let mut resolver = InquireResolver::new(&vars);
        stamp::execute_apply(plan, Some(&mut resolver), &ShellHookRunner)
    } else {
        stamp::execute_apply(plan, None, &ShellHookRunner)
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let StampError::ApplyAborted { report, .. } = &e {
                println!("\n{} Stopped before finishing", style("✗").red().bold());
                print_summary(report);
            }
            return Err(e.into());
        }
    };

    match outcome.status {
        ApplyStatus::Cancelled { resolved } => {
            println!(
                "\n{} Cancelled after resolving {} conflict(s); no files written.",
                style("ℹ").blue().bold(),
                resolved.len()
            );
        }
        ApplyStatus::Completed => {
            println!(
                "\n{} Applied {} to {}",
                style("✓").green().bold(),
                style(name).bold(),
                style(output_dir.display()).cyan()
            );
            print_summary(&outcome.report);
        }
    }

    Ok(())
}

fn parse_data(data: Vec<String>) -> Result<Vec<(String, String)>> {
    data.into_iter()
        .map(|kv| match kv.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(miette!("invalid --data value '{kv}', expected KEY=VALUE")),
        })
        .collect()
}

fn print_summary(report: &ApplyReport) {
    println!(
        "  {} created, {} overwritten, {} merged, {} backed up, {} skipped",
        report.created.len(),
        report.overwritten.len(),
        report.merged.len(),
        report.backed_up.len(),
        report.skipped.len()
    );
    for backup in &report.backups {
        println!("  {} {}", style("backup").dim(), backup.display());
    }
}

fn print_dry_run(plan: &FullApplyPlan, verbose: bool) -> Result<()> {
    println!(
        "\n{} Dry run: planned actions for {}",
        style("==>").cyan().bold(),
        style(plan.output_dir.display()).cyan()
    );

    for entry in &plan.entries {
        let label = format!("{:<9}", entry.action.label());
        let label = match entry.action {
            Action::Create => style(label).green(),
            Action::Skip => style(label).dim(),
            Action::Merge => style(label).cyan(),
            Action::Prompt => style(label).magenta(),
            Action::Overwrite | Action::Backup => style(label).yellow(),
        };
        let note = if entry.is_preserved && entry.exists_in_target {
            style(" (preserved)").dim().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{}", label, entry.output_path, note);

        if verbose {
            print_entry_diff(entry, &plan.variables)?;
        }
    }

    println!(
        "\nSummary: {} create, {} overwrite, {} backup, {} merge, {} prompt, {} skip",
        plan.count(Action::Create),
        plan.count(Action::Overwrite),
        plan.count(Action::Backup),
        plan.count(Action::Merge),
        plan.count(Action::Prompt),
        plan.count(Action::Skip)
    );

    println!(
        "\n{} Dry run: no files written.",
        style("ℹ").blue().bold()
    );
    Ok(())
}

/// Diff of what an overwriting or merging entry would change.
fn print_entry_diff(
    entry: &PlanEntry,
    vars: &std::collections::BTreeMap<String, String>,
) -> Result<()> {
    if !matches!(
        entry.action,
        Action::Overwrite | Action::Backup | Action::Merge | Action::Prompt
    ) {
        return Ok(());
    }

    let current = std::fs::read(&entry.dest_path).map_err(|e| StampError::Io {
        context: format!("reading {}", entry.dest_path.display()),
        source: e,
    })?;
    let mut incoming = produce_content(entry, vars)?;
    if entry.action == Action::Merge {
        incoming = merge_for_path(&entry.output_path, &current, &incoming)?;
    }

    if current == incoming {
        println!("    {}", style("(no changes)").dim());
        return Ok(());
    }

    let diff = unified_diff(
        &String::from_utf8_lossy(&current),
        &String::from_utf8_lossy(&incoming),
        &entry.output_path,
    );
    for line in diff.lines() {
        let styled = if line.starts_with('+') && !line.starts_with("+++") {
            style(line).green()
        } else if line.starts_with('-') && !line.starts_with("---") {
            style(line).red()
        } else {
            style(line).dim()
        };
        println!("    {styled}");
    }
    Ok(())
}
