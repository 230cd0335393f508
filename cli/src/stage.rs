//! Demo stage: terminal panels wired to a navigation and a tab coordinator

use crate::backend::{PanelRole, TerminalPanel, TerminalRenderer, DEMO_PANELS};
use crate::script::Step;
use anyhow::{anyhow, Context, Result};
use colored::{ColoredString, Colorize};
use panelnav_core::{
    ActivationCoordinator, Completion, NavigationConfig, NavigationCoordinator, NavigationResult,
    Registry, Widget, WidgetRef,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Live state a script runs against
pub struct Stage {
    navigation: Arc<NavigationCoordinator>,
    tabs: Arc<ActivationCoordinator>,
    panels: BTreeMap<&'static str, Arc<TerminalPanel>>,
    pending: Vec<(String, Completion)>,
}

impl Stage {
    /// Register every demo panel with the coordinator for its role
    pub fn new(config: NavigationConfig, show_frames: bool) -> Result<Self> {
        let screens = Arc::new(Registry::with_event_capacity(config.event_capacity));
        let tab_bar = Arc::new(Registry::with_event_capacity(config.event_capacity));
        let mut panels = BTreeMap::new();

        for info in DEMO_PANELS {
            let panel = TerminalPanel::new(info);
            let registry = match info.role {
                PanelRole::Screen => &screens,
                PanelRole::Tab => &tab_bar,
            };
            registry
                .register(panel.as_widget())
                .with_context(|| format!("Failed to register panel '{}'", info.name))?;
            panels.insert(info.name, panel);
        }

        let renderer = Arc::new(TerminalRenderer::new(show_frames));
        let navigation =
            NavigationCoordinator::from_config(screens, renderer.clone(), config.clone())?;
        let tabs = ActivationCoordinator::from_config(tab_bar, renderer, config)?;

        Ok(Self {
            navigation,
            tabs,
            panels,
            pending: Vec::new(),
        })
    }

    fn panel(&self, name: &str) -> Result<WidgetRef> {
        self.panels
            .get(name)
            .map(TerminalPanel::as_widget)
            .ok_or_else(|| anyhow!("unknown panel '{}' (see `panelnav panels`)", name))
    }

    /// Execute one step and describe what happened
    pub async fn apply(&mut self, step: &Step) -> Result<ColoredString> {
        let outcome = match step {
            Step::Navigate {
                panel,
                animation,
                length,
            } => {
                let mut request = self.navigation.create_navigation_request(self.panel(panel)?);
                if let Some(kind) = animation {
                    request = request.with_animation(*kind)?;
                }
                if let Some(length) = length {
                    request = request.with_length(*length)?;
                }
                let (result, completion) = request.execute()?.into_parts();
                self.track(step, completion);
                navigation_outcome(&result)
            }
            Step::Back => {
                let (result, completion) = self.navigation.return_back()?.into_parts();
                self.track(step, completion);
                navigation_outcome(&result)
            }
            Step::Exit => {
                let (result, completion) = self.navigation.exit()?.into_parts();
                self.track(step, completion);
                navigation_outcome(&result)
            }
            Step::Tab { panel } => {
                let (result, completion) = self.tabs.activate(self.panel(panel)?)?.into_parts();
                self.track(step, completion);
                if result.success {
                    "ok".green()
                } else {
                    "refused".yellow()
                }
            }
            Step::Lock => {
                self.navigation.navigator().lock();
                "locked".blue()
            }
            Step::Unlock => {
                self.navigation.navigator().unlock();
                "unlocked".blue()
            }
            Step::Group => {
                self.navigation.push_history_group();
                "group pushed".blue()
            }
            Step::Ungroup => {
                if self.navigation.pop_history_group() {
                    "group popped".blue()
                } else {
                    "no group".yellow()
                }
            }
            Step::Skip => {
                let navigation = self.navigation.transitions().skip_active();
                let tabs = self.tabs.transitions().skip_active();
                if navigation || tabs {
                    "skipped".blue()
                } else {
                    "nothing running".yellow()
                }
            }
            Step::Wait(duration) => {
                tokio::time::sleep(*duration).await;
                "waited".dimmed()
            }
        };
        Ok(outcome)
    }

    fn track(&mut self, step: &Step, completion: Completion) {
        if !completion.is_finished() {
            self.pending.push((step.to_string(), completion));
        }
    }

    /// Wait for every transition still running
    pub async fn settle(&mut self) -> Result<()> {
        for (step, completion) in self.pending.drain(..) {
            match completion.wait().await {
                Ok(outcome) => debug!(%step, ?outcome, "Transition finished"),
                Err(err) if err.is_cancelled() => {
                    warn!(%step, "Transition cancelled");
                    println!("      {} {}", "cancelled".yellow(), step);
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("transition of `{}` failed", step))
                }
            }
        }
        Ok(())
    }

    /// One-line summary of the navigator, the tab bar and panel visibility
    pub fn state_line(&self) -> String {
        let navigator = self.navigation.navigator();
        let active = navigator
            .active_kind()
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tab = self
            .tabs
            .activator()
            .active_kind()
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "-".to_string());
        let shown: Vec<&str> = self
            .panels
            .values()
            .filter(|panel| panel.is_visible())
            .map(|panel| panel.info().name)
            .collect();

        let mut line = format!(
            "active={} version={} history={} tab={} shown=[{}]",
            active,
            navigator.version(),
            navigator.history_count(),
            tab,
            shown.join(",")
        );
        if navigator.is_locked() {
            line.push_str(" locked");
        }
        line
    }
}

fn navigation_outcome(result: &NavigationResult) -> ColoredString {
    if result.success {
        "ok".green()
    } else {
        "refused".yellow()
    }
}
