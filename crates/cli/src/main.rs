//! dirwatch CLI - dw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use dirwatch_cli::{logging, Config};
use std::path::PathBuf;
use std::time::Duration;

mod cmd;

/// dirwatch - Watch a directory and report its changes
#[derive(Parser)]
#[command(name = "dw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/dirwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding the config file (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and print its changes
    Watch {
        /// Directory path or file:// URI
        dir: String,

        /// Comma-separated event kinds: create, modify, delete or all
        #[arg(short, long)]
        events: Option<String>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,

        /// Do not rescan the directory after an overflow
        #[arg(long)]
        no_rescan: bool,

        /// Stop after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show the effective configuration
    Config {
        /// Print the config file path only
        #[arg(long, conflicts_with = "example")]
        path: bool,

        /// Print an annotated example config file
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { path, example } => cmd::config::run(cli.config.as_deref(), path, example).await,
        Commands::Watch {
            dir,
            events,
            json,
            no_rescan,
            timeout,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
            let _guard = logging::init(level, config.log.file.as_deref())?;

            let options = cmd::watch::WatchOptions {
                dir,
                events,
                json,
                rescan: !no_rescan,
                timeout: timeout.map(Duration::from_secs),
            };
            cmd::watch::run(options, &config).await
        }
    }
}
