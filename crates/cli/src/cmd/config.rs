//! Configuration command
//!
//! Shows the effective configuration, its location, or an example file.

use anyhow::{Context, Result};
use dirwatch_cli::Config;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(explicit: Option<&Path>, show_path: bool, example: bool) -> Result<()> {
    if example {
        print!("{}", Config::EXAMPLE);
        return Ok(());
    }

    let config_path = Config::resolve_path(explicit).context("Could not determine config file path")?;
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    let config = Config::load(explicit)?;
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", config_path.display())
    };

    println!("{}", "dirwatch Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), source.dimmed());

    println!("{}", "[watch]".yellow());
    println!("  {} = {}", "events".cyan(), config.kinds());
    println!("  {} = {}", "daemon".cyan(), config.watch.daemon);
    println!("  {} = {}", "rescan_on_overflow".cyan(), config.watch.rescan_on_overflow);

    println!("\n{}", "[log]".yellow());
    println!("  {} = {}", "level".cyan(), config.log.level);
    match &config.log.file {
        Some(file) => println!("  {} = {}", "file".cyan(), file.display()),
        None => println!("  {} = {}", "file".cyan(), "(stderr)".dimmed()),
    }

    Ok(())
}
