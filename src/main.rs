mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("STAMP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.verbose());

    match cli.command {
        Commands::Apply {
            partial,
            output,
            data,
            conflict,
            yes,
            no_hooks,
            dry_run,
            verbose,
        } => commands::apply::run(commands::apply::ApplyArgs {
            partial,
            output,
            data,
            conflict,
            yes,
            no_hooks,
            dry_run,
            verbose,
        }),
        Commands::Check { path } => commands::check::run(path),
    }
}
