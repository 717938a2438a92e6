use std::path::PathBuf;

use console::style;
use miette::Result;

use stamp::check::check_partial;

pub fn run(path: PathBuf) -> Result<()> {
    println!(
        "{} {}",
        style("Checking partial at").bold(),
        style(path.display()).cyan()
    );

    let result = check_partial(&path)?;

    println!("  Name: {}", result.partial_name);
    println!("  Variables: {}", result.variable_count);
    println!("  Files: {}", result.file_count);

    if !result.warnings.is_empty() {
        println!("\n{}", style("Warnings:").yellow().bold());
        for w in &result.warnings {
            println!("  {} {}", style("⚠").yellow(), w);
        }
    }

    if !result.errors.is_empty() {
        println!("\n{}", style("Errors:").red().bold());
        for e in &result.errors {
            println!("  {} {}", style("✗").red(), e);
        }
        println!(
            "\n{} Partial has {} error(s)",
            style("✗").red().bold(),
            result.errors.len()
        );
        std::process::exit(1);
    } else {
        println!("\n{} Partial is valid!", style("✓").green().bold());
    }

    Ok(())
}
