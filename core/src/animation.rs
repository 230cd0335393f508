//! Animation primitives for visibility transitions
//!
//! This module provides easing functions, the set of animation kinds a
//! transition can request, and the renderer interface a UI backend
//! implements to draw animation frames.

use crate::widget::{Visibility, Widget};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Easing curves applied to transition progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    /// Curve that traces this one backwards in time
    pub fn inverse(self) -> Self {
        match self {
            Easing::Linear => Easing::Linear,
            Easing::EaseInQuad => Easing::EaseOutQuad,
            Easing::EaseOutQuad => Easing::EaseInQuad,
            Easing::EaseInOutQuad => Easing::EaseInOutQuad,
            Easing::EaseInCubic => Easing::EaseOutCubic,
            Easing::EaseOutCubic => Easing::EaseInCubic,
            Easing::EaseInOutCubic => Easing::EaseInOutCubic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInQuad => "ease_in_quad",
            Easing::EaseOutQuad => "ease_out_quad",
            Easing::EaseInOutQuad => "ease_in_out_quad",
            Easing::EaseInCubic => "ease_in_cubic",
            Easing::EaseOutCubic => "ease_out_cubic",
            Easing::EaseInOutCubic => "ease_in_out_cubic",
        }
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "linear" => Ok(Easing::Linear),
            "ease_in_quad" | "easeinquad" => Ok(Easing::EaseInQuad),
            "ease_out_quad" | "easeoutquad" => Ok(Easing::EaseOutQuad),
            "ease_in_out_quad" | "easeinoutquad" => Ok(Easing::EaseInOutQuad),
            "ease_in_cubic" | "easeincubic" => Ok(Easing::EaseInCubic),
            "ease_out_cubic" | "easeoutcubic" => Ok(Easing::EaseOutCubic),
            "ease_in_out_cubic" | "easeinoutcubic" => Ok(Easing::EaseInOutCubic),
            _ => Err(format!("unknown easing '{}'", s)),
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply easing function to a normalized time value (0.0 to 1.0)
pub fn apply_easing(easing: Easing, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match easing {
        Easing::Linear => t,
        Easing::EaseInQuad => t * t,
        Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        Easing::EaseInOutQuad => {
            if t < 0.5 {
                2.0 * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
            }
        }
        Easing::EaseInCubic => t * t * t,
        Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        Easing::EaseInOutCubic => {
            if t < 0.5 {
                4.0 * t * t * t
            } else {
                1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
            }
        }
    }
}

/// Kinds of visibility animation a renderer may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    #[default]
    Fade,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    Scale,
}

impl AnimationKind {
    /// Mirror image of this animation, used when a transition is replayed backwards
    pub fn reversed(self) -> Self {
        match self {
            AnimationKind::SlideLeft => AnimationKind::SlideRight,
            AnimationKind::SlideRight => AnimationKind::SlideLeft,
            AnimationKind::SlideUp => AnimationKind::SlideDown,
            AnimationKind::SlideDown => AnimationKind::SlideUp,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationKind::Fade => "fade",
            AnimationKind::SlideLeft => "slide_left",
            AnimationKind::SlideRight => "slide_right",
            AnimationKind::SlideUp => "slide_up",
            AnimationKind::SlideDown => "slide_down",
            AnimationKind::Scale => "scale",
        }
    }
}

impl FromStr for AnimationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fade" => Ok(AnimationKind::Fade),
            "slide_left" => Ok(AnimationKind::SlideLeft),
            "slide_right" => Ok(AnimationKind::SlideRight),
            "slide_up" => Ok(AnimationKind::SlideUp),
            "slide_down" => Ok(AnimationKind::SlideDown),
            "scale" => Ok(AnimationKind::Scale),
            _ => Err(format!("unknown animation '{}'", s)),
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An animation a widget offers, with its intrinsic length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Animation {
    pub kind: AnimationKind,
    pub length: Duration,
}

impl Animation {
    pub fn new(kind: AnimationKind, length: Duration) -> Self {
        Self { kind, length }
    }

    pub fn from_millis(kind: AnimationKind, millis: u64) -> Self {
        Self::new(kind, Duration::from_millis(millis))
    }
}

/// A single sampled frame of a running visibility animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub kind: AnimationKind,
    /// Visibility the widget is moving towards
    pub visibility: Visibility,
    /// Linear progress, 0.0 to 1.0
    pub progress: f64,
    /// Progress after easing
    pub eased: f64,
}

/// Backend that knows how to draw animation frames onto widgets
pub trait AnimationRenderer: Send + Sync {
    /// Whether this backend can draw the given kind
    fn supports(&self, kind: AnimationKind) -> bool;

    /// Draw one frame of an animation on `widget`
    fn render(&self, widget: &dyn Widget, frame: &AnimationFrame);
}

/// Renderer that accepts every kind and draws nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl AnimationRenderer for NullRenderer {
    fn supports(&self, _kind: AnimationKind) -> bool {
        true
    }

    fn render(&self, _widget: &dyn Widget, _frame: &AnimationFrame) {}
}

/// Pick the kind a renderer will actually play, falling back when unsupported
pub fn resolve_kind(
    renderer: &dyn AnimationRenderer,
    requested: AnimationKind,
    fallback: AnimationKind,
) -> Option<AnimationKind> {
    if renderer.supports(requested) {
        Some(requested)
    } else if renderer.supports(fallback) {
        Some(fallback)
    } else {
        None
    }
}
