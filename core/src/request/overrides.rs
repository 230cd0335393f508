//! Explicit transition overrides carried by requests, and their resolution

use crate::animation::{Animation, AnimationKind, Easing};
use crate::config::NavigationConfig;
use crate::error::RequestError;
use crate::params::VisibilityTransitionParams;
use crate::widget::{Visibility, WidgetRef};
use std::time::Duration;

/// Optional transition settings; `Some` means explicitly set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct TransitionOverrides {
    pub transition: Option<VisibilityTransitionParams>,
    pub animation: Option<AnimationKind>,
    pub length: Option<Duration>,
    pub easing: Option<Easing>,
}

impl TransitionOverrides {
    pub fn set_transition(&mut self, params: VisibilityTransitionParams) -> Result<(), RequestError> {
        if let Some(field) = self.individual_field() {
            return Err(RequestError::ConflictingConfiguration { field });
        }
        self.transition = Some(params);
        Ok(())
    }

    pub fn set_animation(&mut self, kind: AnimationKind) -> Result<(), RequestError> {
        self.check_no_transition("animation")?;
        self.animation = Some(kind);
        Ok(())
    }

    pub fn set_length(&mut self, length: Duration) -> Result<(), RequestError> {
        self.check_no_transition("length")?;
        self.length = Some(length);
        Ok(())
    }

    pub fn set_easing(&mut self, easing: Easing) -> Result<(), RequestError> {
        self.check_no_transition("easing")?;
        self.easing = Some(easing);
        Ok(())
    }

    /// Whether anything at all was set explicitly
    pub fn is_configured(&self) -> bool {
        self.transition.is_some() || self.individual_field().is_some()
    }

    /// Turn the overrides into concrete parameters for a handoff
    ///
    /// An explicit animation applies to the entering target, or to the
    /// leaving source when there is no target.
    pub fn resolve(
        &self,
        source: Option<&WidgetRef>,
        target: Option<&WidgetRef>,
        config: &NavigationConfig,
    ) -> VisibilityTransitionParams {
        if let Some(params) = self.transition {
            return params;
        }
        if self.length.is_some_and(|length| length.is_zero())
            || (!self.is_configured() && !config.animate_by_default)
        {
            return VisibilityTransitionParams::none();
        }

        let entry_default = target.and_then(|t| t.default_animation(Visibility::Visible));
        let exit_default = source.and_then(|s| s.default_animation(Visibility::Hidden));
        let explicit = |fallback: Option<Animation>| {
            self.animation.map(|kind| {
                Animation::new(
                    kind,
                    fallback.map_or(config.default_length(), |a| a.length),
                )
            })
        };

        let (entry, exit) = match (target, source) {
            (Some(_), _) => (explicit(entry_default).or(entry_default), exit_default),
            (None, Some(_)) => (None, explicit(exit_default).or(exit_default)),
            (None, None) => (None, None),
        };
        if entry.is_none() && exit.is_none() {
            return VisibilityTransitionParams::none();
        }

        let length = self
            .length
            .or(entry.map(|a| a.length))
            .or(exit.map(|a| a.length))
            .unwrap_or(config.default_length());
        VisibilityTransitionParams {
            length,
            easing: self.easing.unwrap_or(config.default_easing),
            exit_animation: exit.map(|a| a.kind),
            entry_animation: entry.map(|a| a.kind),
            ..VisibilityTransitionParams::default()
        }
    }

    /// Resolution for a return: undo the recorded transition unless overridden
    pub fn resolve_return(
        &self,
        recorded: Option<VisibilityTransitionParams>,
        source: &WidgetRef,
        target: &WidgetRef,
        config: &NavigationConfig,
    ) -> VisibilityTransitionParams {
        if self.is_configured() {
            return self.resolve(Some(source), Some(target), config);
        }
        recorded
            .map(|params| params.inverse())
            .unwrap_or_else(VisibilityTransitionParams::none)
    }

    fn individual_field(&self) -> Option<&'static str> {
        if self.animation.is_some() {
            Some("animation")
        } else if self.length.is_some() {
            Some("length")
        } else if self.easing.is_some() {
            Some("easing")
        } else {
            None
        }
    }

    fn check_no_transition(&self, field: &'static str) -> Result<(), RequestError> {
        if self.transition.is_some() {
            return Err(RequestError::ConflictingConfiguration { field });
        }
        Ok(())
    }
}
