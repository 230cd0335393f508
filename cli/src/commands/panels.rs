//! Built-in panel listing command

use crate::backend::{PanelRole, TerminalRenderer, DEMO_PANELS};
use anyhow::Result;
use colored::Colorize;
use panelnav_core::{AnimationKind, AnimationRenderer};

/// Show the demo panels and the animations they play by default
pub async fn panels_command() -> Result<()> {
    println!("{}", "Demo panels".bold());
    println!("{:<10} {:<7} {:<18} {}", "NAME", "ROLE", "ENTRY", "EXIT");

    for info in DEMO_PANELS {
        let name = match info.role {
            PanelRole::Screen => info.name.green(),
            PanelRole::Tab => info.name.cyan(),
        };
        println!(
            "{:<10} {:<7} {:<18} {}",
            name,
            info.role.as_str(),
            describe(info.entry),
            describe(info.exit)
        );
    }

    let renderer = TerminalRenderer::default();
    let unsupported: Vec<&str> = [
        AnimationKind::Fade,
        AnimationKind::SlideLeft,
        AnimationKind::SlideRight,
        AnimationKind::SlideUp,
        AnimationKind::SlideDown,
        AnimationKind::Scale,
    ]
    .into_iter()
    .filter(|kind| !renderer.supports(*kind))
    .map(|kind| kind.as_str())
    .collect();
    println!();
    println!(
        "{} {}",
        "Played as fallback:".dimmed(),
        unsupported.join(", ")
    );

    Ok(())
}

fn describe(animation: Option<(AnimationKind, u64)>) -> String {
    match animation {
        Some((kind, millis)) => format!("{} {}ms", kind, millis),
        None => "-".to_string(),
    }
}
