//! # panelnav CLI
//!
//! Command-line harness for panelnav - drive navigation scripts against a
//! set of terminal panels and watch the navigator and transition queue.
//!
//! ## Usage
//!
//! - `panelnav run "nav home" "nav settings" back` - Run steps given as arguments
//! - `panelnav run --file demo.nav --frames` - Run a script file, printing frames
//! - `panelnav panels` - Show the built-in panels

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod backend;
mod commands;
mod config;
mod script;
mod stage;

use commands::{panels_command, run_command};
use config::CliConfigLoader;

/// panelnav - navigation, history and animated transitions for stacked panels
#[derive(Parser)]
#[command(name = "panelnav")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive panel navigation scripts in the terminal")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Frame interval override in milliseconds
    #[arg(long, global = true)]
    frame_ms: Option<u64>,

    /// Default easing override (linear, ease_in_quad, ease_out_cubic, ...)
    #[arg(long, global = true)]
    easing: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a navigation script
    Run {
        /// Script steps, e.g. "nav settings slide_left 200"
        steps: Vec<String>,

        /// Read steps from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print every rendered animation frame
        #[arg(long)]
        frames: bool,
    },

    /// Show the built-in demo panels
    Panels,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(frame_ms) = cli.frame_ms {
        loader = loader.with_frame_ms_override(frame_ms);
    }

    if let Some(easing) = &cli.easing {
        loader = loader.with_easing_override(easing.clone());
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout stays a clean transcript
    let filter = if cli.verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config_loader = build_config_loader(&cli);

    match cli.command {
        Commands::Run {
            steps,
            file,
            frames,
        } => run_command(steps, file, frames, config_loader).await,
        Commands::Panels => panels_command().await,
    }
}
