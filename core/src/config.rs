//! Navigation configuration
//!
//! Core only accepts fully resolved configuration. File discovery and
//! merging happen in the CLI layer; `from_env` is provided for hosts that
//! want environment overrides without a config file.

use crate::animation::{AnimationKind, Easing};
use crate::error::ConfigError;
use crate::scheduler::{FrameScheduler, TimeMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables shared by navigators, activators and transition managers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Tick length of the default frame scheduler
    pub frame_interval_ms: u64,
    /// Multiplier applied to scaled time
    pub time_scale: f64,
    /// Clock transitions measure their length against
    pub time_mode: TimeMode,
    /// Easing used when a request does not set one
    pub default_easing: Easing,
    /// Length used when neither the request nor the animation provides one
    pub default_length_ms: u64,
    /// Kind a renderer falls back to when it cannot play the requested one
    pub fallback_animation: AnimationKind,
    /// Whether requests without overrides pick up widget default animations
    pub animate_by_default: bool,
    /// Buffer size of broadcast channels for observable events
    pub event_capacity: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            time_scale: 1.0,
            time_mode: TimeMode::Scaled,
            default_easing: Easing::Linear,
            default_length_ms: 250,
            fallback_animation: AnimationKind::Fade,
            animate_by_default: true,
            event_capacity: 64,
        }
    }
}

impl NavigationConfig {
    /// Create config from defaults with `PANELNAV_*` environment overrides
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup; unparsable values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PANELNAV_FRAME_MS").and_then(|v| v.parse().ok()) {
            self.frame_interval_ms = v;
        }
        if let Some(v) = lookup("PANELNAV_TIME_SCALE").and_then(|v| v.parse().ok()) {
            self.time_scale = v;
        }
        if let Some(v) = lookup("PANELNAV_TIME_MODE") {
            match v.to_lowercase().as_str() {
                "scaled" => self.time_mode = TimeMode::Scaled,
                "unscaled" => self.time_mode = TimeMode::Unscaled,
                _ => {}
            }
        }
        if let Some(v) = lookup("PANELNAV_EASING").and_then(|v| v.parse().ok()) {
            self.default_easing = v;
        }
        if let Some(v) = lookup("PANELNAV_LENGTH_MS").and_then(|v| v.parse().ok()) {
            self.default_length_ms = v;
        }
        if let Some(v) = lookup("PANELNAV_FALLBACK_ANIMATION").and_then(|v| v.parse().ok()) {
            self.fallback_animation = v;
        }
        if let Some(v) = lookup("PANELNAV_ANIMATE").and_then(|v| parse_flag(&v)) {
            self.animate_by_default = v;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "frame_interval_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "time_scale".to_string(),
                value: self.time_scale.to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn default_length(&self) -> Duration {
        Duration::from_millis(self.default_length_ms)
    }

    /// Build the frame scheduler this configuration describes
    pub fn scheduler(&self) -> FrameScheduler {
        FrameScheduler::new(self.frame_interval()).with_time_scale(self.time_scale)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = NavigationConfig::default();
        assert_eq!(config.frame_interval_ms, 16);
        assert_eq!(config.default_length(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PANELNAV_FRAME_MS", "8"),
            ("PANELNAV_EASING", "ease-in-out-cubic"),
            ("PANELNAV_TIME_MODE", "Unscaled"),
            ("PANELNAV_ANIMATE", "off"),
            ("PANELNAV_LENGTH_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config =
            NavigationConfig::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.frame_interval_ms, 8);
        assert_eq!(config.default_easing, Easing::EaseInOutCubic);
        assert_eq!(config.time_mode, TimeMode::Unscaled);
        assert!(!config.animate_by_default);
        assert_eq!(config.default_length_ms, 250);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = NavigationConfig {
            frame_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = NavigationConfig {
            time_scale: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NavigationConfig =
            serde_json::from_str(r#"{"default_easing": "ease_out_quad", "time_scale": 0.5}"#)
                .unwrap();
        assert_eq!(config.default_easing, Easing::EaseOutQuad);
        assert_eq!(config.time_scale, 0.5);
        assert_eq!(config.fallback_animation, AnimationKind::Fade);
    }
}
