//! CLI configuration loader for panelnav
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./panelnav.json or ./.panelnav/config.json
//! 3. User config dir: <config_dir>/panelnav/config.json
//! 4. Environment variables only (`PANELNAV_*`, no files)

use anyhow::{anyhow, Context, Result};
use panelnav_core::{Easing, NavigationConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration loader
#[derive(Debug, Default)]
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    frame_ms_override: Option<u64>,
    easing_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set frame interval override
    pub fn with_frame_ms_override(mut self, frame_ms: u64) -> Self {
        self.frame_ms_override = Some(frame_ms);
        self
    }

    /// Set default easing override
    pub fn with_easing_override(mut self, easing: String) -> Self {
        self.easing_override = Some(easing);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<NavigationConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            let path = expand_path(override_path);
            self.load_from_path(&path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(frame_ms) = self.frame_ms_override {
            config.frame_interval_ms = frame_ms;
        }
        if let Some(easing) = &self.easing_override {
            config.default_easing = easing
                .parse::<Easing>()
                .map_err(|e| anyhow!(e))
                .context("Invalid --easing value")?;
        }

        // Step 3: Validate
        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<NavigationConfig> {
        // 1. Current working directory
        if let Some(config) = self.try_load_cwd().await? {
            return Ok(config);
        }

        // 2. User config directory
        if let Some(config) = self.try_load_user_dir().await? {
            return Ok(config);
        }

        // 3. Environment variables only
        debug!("No config file found, using environment");
        Ok(NavigationConfig::from_env())
    }

    /// Try loading from current working directory
    async fn try_load_cwd(&self) -> Result<Option<NavigationConfig>> {
        let cwd = std::env::current_dir()?;

        let panelnav_json = cwd.join("panelnav.json");
        if panelnav_json.exists() {
            return Ok(Some(self.load_file(&panelnav_json).await?));
        }

        let dir_config = cwd.join(".panelnav").join("config.json");
        if dir_config.exists() {
            return Ok(Some(self.load_file(&dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from the platform config directory
    async fn try_load_user_dir(&self) -> Result<Option<NavigationConfig>> {
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("panelnav").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<NavigationConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<NavigationConfig> {
        debug!(path = %path.display(), "Loading config file");
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Expand `~` and environment variables in a user supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelnav_core::TimeMode;

    #[tokio::test]
    async fn test_load_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panelnav.json");
        std::fs::write(&path, r#"{"time_mode": "unscaled", "default_length_ms": 90}"#).unwrap();

        let config = CliConfigLoader::new()
            .with_config_override(path)
            .with_frame_ms_override(8)
            .with_easing_override("ease-out-cubic".to_string())
            .load()
            .await
            .unwrap();
        assert_eq!(config.time_mode, TimeMode::Unscaled);
        assert_eq!(config.default_length_ms, 90);
        assert_eq!(config.frame_interval_ms, 8);
        assert_eq!(config.default_easing, Easing::EaseOutCubic);
    }

    #[tokio::test]
    async fn test_directory_override_uses_config_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"animate_by_default": false}"#).unwrap();

        let config = CliConfigLoader::new()
            .with_config_override(dir.path().to_path_buf())
            .load()
            .await
            .unwrap();
        assert!(!config.animate_by_default);
    }

    #[tokio::test]
    async fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"frame_interval_ms": 0}"#).unwrap();

        let err = CliConfigLoader::new()
            .with_config_override(path.clone())
            .load()
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("frame_interval_ms"));

        let err = CliConfigLoader::new()
            .with_config_override(dir.path().join("missing.json"))
            .load()
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("does not exist"));

        std::fs::write(&path, "{}").unwrap();
        let err = CliConfigLoader::new()
            .with_config_override(path)
            .with_easing_override("wobbly".to_string())
            .load()
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("unknown easing"));
    }
}
