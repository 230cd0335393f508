//! Navigation script execution command

use crate::config::{expand_path, CliConfigLoader};
use crate::script::{parse_steps, Step};
use crate::stage::Stage;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

/// Run a navigation script against the demo panels
pub async fn run_command(
    steps: Vec<String>,
    file: Option<PathBuf>,
    show_frames: bool,
    config_loader: CliConfigLoader,
) -> Result<()> {
    let script = load_script(&steps, file.as_ref()).await?;
    if script.is_empty() {
        println!("{}", "Nothing to run".yellow());
        return Ok(());
    }

    let config = config_loader.load().await?;
    info!(
        steps = script.len(),
        frame_ms = config.frame_interval_ms,
        easing = %config.default_easing,
        "Running navigation script"
    );

    let mut stage = Stage::new(config, show_frames)?;
    for (index, step) in script.iter().enumerate() {
        let outcome = stage
            .apply(step)
            .await
            .with_context(|| format!("step {} `{}` failed", index + 1, step))?;
        println!(
            "{} {:<24} {:<16} {}",
            format!("[{:>2}]", index + 1).dimmed(),
            step.to_string().bold(),
            outcome,
            stage.state_line()
        );
    }

    stage.settle().await?;
    println!("{} {}", "settled".green().bold(), stage.state_line());
    Ok(())
}

/// Steps from the script file come first, then those given as arguments
async fn load_script(steps: &[String], file: Option<&PathBuf>) -> Result<Vec<Step>> {
    let mut script = Vec::new();

    if let Some(file) = file {
        let path = expand_path(file);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read script file: {}", path.display()))?;
        script.extend(
            parse_steps(content.lines())
                .with_context(|| format!("Invalid script file: {}", path.display()))?,
        );
    }

    script.extend(
        parse_steps(steps.iter().map(String::as_str)).context("Invalid step argument")?,
    );
    Ok(script)
}
