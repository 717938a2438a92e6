use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stamp::render::ConflictPolicy;

#[derive(Parser)]
#[command(
    name = "stamp",
    about = "Apply project partials to existing directories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a partial into a directory
    Apply {
        /// Partial directory (the one holding stamp.toml)
        partial: PathBuf,

        /// Destination directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Set variable values (can be repeated: -d key=value)
        #[arg(short, long = "data", value_name = "KEY=VALUE")]
        data: Vec<String>,

        /// What to do with files that already exist: prompt, skip, overwrite, backup or merge
        #[arg(long, value_name = "POLICY")]
        conflict: Option<ConflictPolicy>,

        /// Never prompt; unresolved conflicts follow the batch rules
        #[arg(short, long)]
        yes: bool,

        /// Skip running hooks
        #[arg(long)]
        no_hooks: bool,

        /// Show planned actions without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Show diffs in dry runs and debug logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a partial directory
    Check {
        /// Path to the partial to check (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

impl Commands {
    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Apply { verbose: true, .. })
    }
}
