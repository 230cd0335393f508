//! Widget contract consumed by the navigation core
//!
//! A widget is any visually exclusive panel (screen, window, tab). The core
//! never owns or renders widgets; it only flips their visibility, orders
//! them for drawing and asks them for their default animations.

use crate::animation::Animation;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a widget, used as the registry and history key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetKind(&'static str);

impl WidgetKind {
    /// Create a widget kind from a static name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Kind derived from a Rust type, for one-instance-per-type widgets
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(std::any::type_name::<T>())
    }

    /// Get the kind name
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl From<&'static str> for WidgetKind {
    fn from(name: &'static str) -> Self {
        Self(name)
    }
}

/// Visibility a widget is heading towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

/// Trait implemented by host panels taking part in navigation
///
/// Implementations use interior mutability; the core only ever holds
/// shared references.
pub trait Widget: Send + Sync {
    /// Kind used to register and look up this widget
    fn kind(&self) -> WidgetKind;

    /// Whether the widget finished its own setup and can be shown
    fn is_initialized(&self) -> bool {
        true
    }

    /// Current visibility
    fn is_visible(&self) -> bool;

    /// Show or hide the widget instantly
    fn set_visible(&self, visible: bool);

    /// Draw order hint while a transition is running; higher draws on top
    fn set_sort_priority(&self, _priority: i32) {}

    /// Animation this widget plays by default when moving to `visibility`
    fn default_animation(&self, _visibility: Visibility) -> Option<Animation> {
        None
    }
}

/// Shared reference to a widget
pub type WidgetRef = Arc<dyn Widget>;

/// Identity comparison of two widget references
pub fn same_widget(a: &WidgetRef, b: &WidgetRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Identity comparison of two optional widget references
pub fn same_slot(a: Option<&WidgetRef>, b: Option<&WidgetRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_widget(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Human readable label for an optional widget, for logs and errors
pub fn describe(widget: Option<&WidgetRef>) -> String {
    widget
        .map(|w| w.kind().to_string())
        .unwrap_or_else(|| "<none>".to_string())
}
