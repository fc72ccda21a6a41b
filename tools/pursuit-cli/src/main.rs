//! Pursuit CLI: run the tracking loop and manage its settings.
//!
//! Usage:
//!   pursuit simulate [OPTIONS]   Run the pipeline against a synthetic target
//!   pursuit check                Validate settings and print the effective values
//!   pursuit init                 Write a default settings file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pursuit_common::config::Settings;

mod commands;

#[derive(Parser)]
#[command(
    name = "pursuit",
    about = "Real-time target tracking and pointer control",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the standard config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline against a synthetic moving target
    Simulate {
        /// Stop after this many control ticks (0 runs until Ctrl+C)
        #[arg(long, default_value = "600")]
        ticks: u64,

        /// Synthetic capture rate
        #[arg(long, default_value = "120")]
        fps: f64,

        /// Engage after this many ticks
        #[arg(long, default_value = "30")]
        engage_after: u64,
    },

    /// Validate a settings file and print the effective configuration
    Check,

    /// Write a settings file with default values
    Init {
        /// Output path (defaults to the standard config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match cli.command {
        Commands::Init { .. } => Settings::default(),
        _ => load_settings(cli.config.as_ref())?,
    };

    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    pursuit_common::logging::init_logging(&settings.logging);

    match cli.command {
        Commands::Simulate {
            ticks,
            fps,
            engage_after,
        } => commands::simulate::run(settings, ticks, fps, engage_after).await,
        Commands::Check => commands::check::run(&settings, cli.config.as_deref()),
        Commands::Init { output, force } => commands::init::run(output, force),
    }
}
