//! Turning `Prompt` plan entries into concrete actions.

pub mod engine;

use crate::error::{Result, StampError};
use crate::merge::is_mergeable;
use crate::render::{Action, ConflictPolicy, PlanEntry};

pub use engine::InquireResolver;

/// An operator's answer for one conflicting file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Choose { action: Action, apply_to_all: bool },
    Cancel,
}

/// Asks about one conflicting file at a time.
pub trait ConflictResolver {
    fn resolve(&mut self, entry: &PlanEntry) -> Result<PromptAnswer>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Completed,
    /// The operator stopped. `resolved` lists output paths answered before that.
    Cancelled { resolved: Vec<String> },
}

/// Ask `resolver` about every `Prompt` entry, in order.
///
/// An "apply to all" answer is reused silently for the remaining entries, except
/// that a sticky merge is not forced onto a file that cannot be merged.
pub fn resolve_prompts(
    entries: &mut [PlanEntry],
    resolver: &mut dyn ConflictResolver,
) -> Result<PromptOutcome> {
    let mut sticky: Option<Action> = None;
    let mut resolved = Vec::new();

    for entry in entries.iter_mut().filter(|e| e.action == Action::Prompt) {
        let reusable = sticky.filter(|a| *a != Action::Merge || is_mergeable(&entry.output_path));
        let action = match reusable {
            Some(action) => action,
            None => match resolver.resolve(entry)? {
                PromptAnswer::Cancel => {
                    tracing::info!(resolved = resolved.len(), "conflict resolution cancelled");
                    return Ok(PromptOutcome::Cancelled { resolved });
                }
                PromptAnswer::Choose {
                    action,
                    apply_to_all,
                } => {
                    if apply_to_all {
                        sticky = Some(action);
                    }
                    action
                }
            },
        };

        let unmergeable = action == Action::Merge && !is_mergeable(&entry.output_path);
        if unmergeable || matches!(action, Action::Prompt | Action::Create) {
            return Err(StampError::PromptFailed {
                message: format!(
                    "'{}' is not a valid answer for {}",
                    action.label(),
                    entry.output_path
                ),
            });
        }

        tracing::debug!(path = %entry.output_path, action = action.label(), "resolved conflict");
        entry.action = action;
        resolved.push(entry.output_path.clone());
    }

    Ok(PromptOutcome::Completed)
}

/// Resolve `Prompt` entries without asking anyone.
///
/// Under the merge policy a leftover `Prompt` means the file has no merge
/// strategy, which is an error. Otherwise conflicts are skipped.
pub fn resolve_batch(entries: &mut [PlanEntry], policy: ConflictPolicy) -> Result<()> {
    for entry in entries.iter_mut().filter(|e| e.action == Action::Prompt) {
        if policy == ConflictPolicy::Merge {
            return Err(StampError::UnsupportedMergeFormat {
                path: entry.output_path.clone(),
            });
        }
        tracing::debug!(path = %entry.output_path, "conflict skipped in batch mode");
        entry.action = Action::Skip;
    }
    Ok(())
}
