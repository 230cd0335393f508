//! Visibility transition parameters

use crate::animation::{AnimationKind, Easing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Which widget draws on top while a transition runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPriority {
    #[default]
    Auto,
    Source,
    Target,
}

impl SortPriority {
    /// Same preference with source and target roles swapped
    pub fn inverse(self) -> Self {
        match self {
            SortPriority::Auto => SortPriority::Auto,
            SortPriority::Source => SortPriority::Target,
            SortPriority::Target => SortPriority::Source,
        }
    }
}

/// Which side of a transition actually animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    None,
    Source,
    Target,
    Both,
}

/// Draw priorities assigned to the two sides of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub source: i32,
    pub target: i32,
}

/// Parameters describing one visibility handoff
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VisibilityTransitionParams {
    pub length: Duration,
    pub easing: Easing,
    /// Played on the source while it hides
    pub exit_animation: Option<AnimationKind>,
    /// Played on the target while it shows
    pub entry_animation: Option<AnimationKind>,
    pub sort_priority: SortPriority,
}

impl VisibilityTransitionParams {
    /// Instantaneous handoff with no animation
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(length: Duration) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    pub fn with_exit(mut self, kind: AnimationKind) -> Self {
        self.exit_animation = Some(kind);
        self
    }

    pub fn with_entry(mut self, kind: AnimationKind) -> Self {
        self.entry_animation = Some(kind);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_sort_priority(mut self, priority: SortPriority) -> Self {
        self.sort_priority = priority;
        self
    }

    /// Derived from which animation refs are present
    pub fn target_kind(&self) -> TargetKind {
        match (self.exit_animation.is_some(), self.entry_animation.is_some()) {
            (false, false) => TargetKind::None,
            (true, false) => TargetKind::Source,
            (false, true) => TargetKind::Target,
            (true, true) => TargetKind::Both,
        }
    }

    /// Whether this compares equal to [`VisibilityTransitionParams::none`]
    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    /// The transition that undoes this one when source and target swap roles
    pub fn inverse(&self) -> Self {
        Self {
            length: self.length,
            easing: self.easing.inverse(),
            exit_animation: self.entry_animation.map(AnimationKind::reversed),
            entry_animation: self.exit_animation.map(AnimationKind::reversed),
            sort_priority: self.sort_priority.inverse(),
        }
    }

    /// Draw priorities for source and target
    ///
    /// `Auto` keeps both level when both animate; otherwise the animating
    /// side draws on top, and the entering target wins when nothing animates.
    /// That includes an exit-only transition: the leaving source stays above
    /// the target already shown beneath it, or its exit would play hidden.
    pub fn sort_order(&self) -> SortOrder {
        let (source, target) = match self.sort_priority {
            SortPriority::Source => (1, 0),
            SortPriority::Target => (0, 1),
            SortPriority::Auto => match self.target_kind() {
                TargetKind::Both => (0, 0),
                TargetKind::Source => (1, 0),
                TargetKind::Target | TargetKind::None => (0, 1),
            },
        };
        SortOrder { source, target }
    }

    fn length_millis(&self) -> u128 {
        self.length.as_millis()
    }
}

impl PartialEq for VisibilityTransitionParams {
    fn eq(&self, other: &Self) -> bool {
        self.length_millis() == other.length_millis()
            && self.easing == other.easing
            && self.exit_animation == other.exit_animation
            && self.entry_animation == other.entry_animation
            && self.sort_priority == other.sort_priority
    }
}

impl Eq for VisibilityTransitionParams {}

impl Hash for VisibilityTransitionParams {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length_millis().hash(state);
        self.easing.hash(state);
        self.exit_animation.hash(state);
        self.entry_animation.hash(state);
        self.sort_priority.hash(state);
    }
}

impl fmt::Display for VisibilityTransitionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |kind: Option<AnimationKind>| kind.map(|k| k.as_str()).unwrap_or("-");
        write!(
            f,
            "{}ms {} exit={} entry={}",
            self.length_millis(),
            self.easing,
            side(self.exit_animation),
            side(self.entry_animation)
        )
    }
}
