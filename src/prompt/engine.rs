use std::collections::BTreeMap;
use std::fmt;

use console::style;
use inquire::InquireError;

use super::{ConflictResolver, PromptAnswer};
use crate::diff::unified_diff;
use crate::error::{Result, StampError};
use crate::merge::is_mergeable;
use crate::render::execute::produce_content;
use crate::render::{Action, PlanEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Apply { action: Action, all: bool },
    ShowDiff,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Choice::ShowDiff => "Show diff",
            Choice::Apply { action, all } => match (action, all) {
                (Action::Skip, false) => "Skip (keep existing file)",
                (Action::Overwrite, false) => "Overwrite",
                (Action::Backup, false) => "Back up existing file, then overwrite",
                (Action::Merge, false) => "Merge into existing file",
                (Action::Skip, true) => "Skip all remaining conflicts",
                (Action::Overwrite, true) => "Overwrite all remaining conflicts",
                (Action::Backup, true) => "Back up and overwrite all remaining conflicts",
                (Action::Merge, true) => "Merge all remaining conflicts",
                (other, _) => other.label(),
            },
        };
        f.write_str(text)
    }
}

fn choices_for(entry: &PlanEntry) -> Vec<Choice> {
    let mergeable = is_mergeable(&entry.output_path);
    let mut choices = Vec::new();
    for all in [false, true] {
        for action in [Action::Skip, Action::Overwrite, Action::Backup, Action::Merge] {
            if action == Action::Merge && !mergeable {
                continue;
            }
            choices.push(Choice::Apply { action, all });
        }
        if !all {
            choices.push(Choice::ShowDiff);
        }
    }
    choices
}

/// Interactive conflict resolution on the terminal.
pub struct InquireResolver<'a> {
    vars: &'a BTreeMap<String, String>,
}

impl<'a> InquireResolver<'a> {
    /// `vars` renders the incoming side when the operator asks for a diff.
    pub fn new(vars: &'a BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    fn print_diff(&self, entry: &PlanEntry) -> Result<()> {
        let current = std::fs::read(&entry.dest_path).map_err(|e| StampError::Io {
            context: format!("reading {}", entry.dest_path.display()),
            source: e,
        })?;
        let incoming = produce_content(entry, self.vars)?;
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
            eprintln!("  {styled}");
        }
        Ok(())
    }
}

impl ConflictResolver for InquireResolver<'_> {
    fn resolve(&mut self, entry: &PlanEntry) -> Result<PromptAnswer> {
        let message = format!("{} already exists", entry.output_path);
        loop {
            let answer = inquire::Select::new(&message, choices_for(entry))
                .with_page_size(10)
                .prompt();

            match answer {
                Ok(Choice::ShowDiff) => self.print_diff(entry)?,
                Ok(Choice::Apply { action, all }) => {
                    return Ok(PromptAnswer::Choose {
                        action,
                        apply_to_all: all,
                    })
                }
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    return Ok(PromptAnswer::Cancel)
                }
                Err(e) => {
                    return Err(StampError::PromptFailed {
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}
