//! Terminal panels and frame renderer
//!
//! The harness has no real UI: panels only track their visibility and
//! draw priority, and animation frames are printed as text lines.

use colored::Colorize;
use panelnav_core::{
    Animation, AnimationFrame, AnimationKind, AnimationRenderer, Visibility, Widget, WidgetKind,
    WidgetRef,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Which state machine a demo panel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelRole {
    /// Driven by `nav`, `back` and `exit`
    Screen,
    /// Driven by `tab`
    Tab,
}

impl PanelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelRole::Screen => "screen",
            PanelRole::Tab => "tab",
        }
    }
}

/// Static description of a built-in panel
#[derive(Debug, Clone, Copy)]
pub struct DemoPanel {
    pub name: &'static str,
    pub role: PanelRole,
    pub entry: Option<(AnimationKind, u64)>,
    pub exit: Option<(AnimationKind, u64)>,
}

/// Panels available to scripts
pub const DEMO_PANELS: &[DemoPanel] = &[
    DemoPanel {
        name: "home",
        role: PanelRole::Screen,
        entry: None,
        exit: None,
    },
    DemoPanel {
        name: "settings",
        role: PanelRole::Screen,
        entry: Some((AnimationKind::SlideLeft, 200)),
        exit: None,
    },
    DemoPanel {
        name: "profile",
        role: PanelRole::Screen,
        entry: Some((AnimationKind::Fade, 150)),
        exit: Some((AnimationKind::Fade, 150)),
    },
    DemoPanel {
        name: "wizard",
        role: PanelRole::Screen,
        entry: Some((AnimationKind::SlideUp, 250)),
        exit: Some((AnimationKind::SlideDown, 250)),
    },
    DemoPanel {
        name: "inbox",
        role: PanelRole::Tab,
        entry: Some((AnimationKind::Fade, 120)),
        exit: None,
    },
    DemoPanel {
        name: "sent",
        role: PanelRole::Tab,
        entry: Some((AnimationKind::Fade, 120)),
        exit: None,
    },
    DemoPanel {
        name: "drafts",
        role: PanelRole::Tab,
        entry: Some((AnimationKind::Fade, 120)),
        exit: None,
    },
];

/// A panel that lives only as state in the terminal
#[derive(Debug)]
pub struct TerminalPanel {
    info: &'static DemoPanel,
    visible: Mutex<bool>,
    sort_priority: Mutex<i32>,
}

impl TerminalPanel {
    pub fn new(info: &'static DemoPanel) -> Arc<Self> {
        Arc::new(Self {
            info,
            visible: Mutex::new(false),
            sort_priority: Mutex::new(0),
        })
    }

    pub fn info(&self) -> &'static DemoPanel {
        self.info
    }

    pub fn as_widget(self: &Arc<Self>) -> WidgetRef {
        Arc::clone(self) as WidgetRef
    }
}

impl Widget for TerminalPanel {
    fn kind(&self) -> WidgetKind {
        WidgetKind::new(self.info.name)
    }

    fn is_visible(&self) -> bool {
        *self.visible.lock()
    }

    fn set_visible(&self, visible: bool) {
        debug!(panel = self.info.name, visible, "Panel visibility changed");
        *self.visible.lock() = visible;
    }

    fn set_sort_priority(&self, priority: i32) {
        *self.sort_priority.lock() = priority;
    }

    fn default_animation(&self, visibility: Visibility) -> Option<Animation> {
        let animation = match visibility {
            Visibility::Visible => self.info.entry,
            Visibility::Hidden => self.info.exit,
        };
        animation.map(|(kind, millis)| Animation::from_millis(kind, millis))
    }
}

/// Prints animation frames as text
///
/// Terminal cells cannot be resized, so `scale` is reported as unsupported
/// and plays as the configured fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer {
    show_frames: bool,
}

impl TerminalRenderer {
    pub fn new(show_frames: bool) -> Self {
        Self { show_frames }
    }
}

impl AnimationRenderer for TerminalRenderer {
    fn supports(&self, kind: AnimationKind) -> bool {
        kind != AnimationKind::Scale
    }

    fn render(&self, widget: &dyn Widget, frame: &AnimationFrame) {
        if !self.show_frames {
            return;
        }
        let direction = if frame.visibility.is_visible() {
            "in"
        } else {
            "out"
        };
        println!(
            "      {} {:<10} {:<11} {:<3} {}",
            "~".dimmed(),
            widget.kind().as_str(),
            frame.kind.as_str(),
            direction,
            progress_bar(frame.eased).cyan()
        );
    }
}

fn progress_bar(eased: f64) -> String {
    const WIDTH: usize = 20;
    let filled = (eased.clamp(0.0, 1.0) * WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        " ".repeat(WIDTH - filled),
        eased * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_panel(name: &str) -> Option<&'static DemoPanel> {
        DEMO_PANELS.iter().find(|info| info.name == name)
    }

    #[test]
    fn test_demo_panels_are_unique() {
        for (index, info) in DEMO_PANELS.iter().enumerate() {
            assert!(DEMO_PANELS[index + 1..].iter().all(|other| other.name != info.name));
        }
        assert_eq!(find_panel("wizard").map(|s| s.role), Some(PanelRole::Screen));
        assert!(find_panel("nowhere").is_none());
    }

    #[test]
    fn test_panel_default_animations() {
        let wizard = TerminalPanel::new(find_panel("wizard").unwrap());
        assert_eq!(
            wizard.default_animation(Visibility::Hidden),
            Some(Animation::from_millis(AnimationKind::SlideDown, 250))
        );

        let home = TerminalPanel::new(find_panel("home").unwrap());
        assert_eq!(home.default_animation(Visibility::Visible), None);
        home.set_visible(true);
        home.set_sort_priority(3);
        assert!(home.is_visible());
        assert_eq!(*home.sort_priority.lock(), 3);
    }

    #[test]
    fn test_renderer_cannot_scale() {
        let renderer = TerminalRenderer::default();
        assert!(renderer.supports(AnimationKind::SlideRight));
        assert!(!renderer.supports(AnimationKind::Scale));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), format!("[{}]   0%", " ".repeat(20)));
        assert_eq!(progress_bar(1.0), format!("[{}] 100%", "#".repeat(20)));
    }
}
