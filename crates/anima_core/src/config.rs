//! Engine configuration: TOML file with env overrides.
//!
//! The engine runs with built-in defaults when no config file exists; a file
//! only needs to name the fields it changes.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default cron expression for the nightly dream phase (3 AM daily).
pub const DEFAULT_DREAM_CRON: &str = "0 3 * * *";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MindConfig {
    /// Root directory for persistent state. Per-agent databases live under
    /// `<data_dir>/mind/`.
    pub data_dir: PathBuf,
    /// Cron expression handed to the external scheduler for the dream phase.
    pub dream_cron: String,
    /// How long a rendered identity section stays valid, in seconds.
    pub identity_cache_ttl_secs: u64,
    /// Cosine similarity threshold for the semantic stress pass.
    pub semantic_threshold: f32,
}

impl Default for MindConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dream_cron: DEFAULT_DREAM_CRON.to_string(),
            identity_cache_ttl_secs: 300,
            semantic_threshold: 0.75,
        }
    }
}

impl MindConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MindConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults with
    /// env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OPENCLAW_DREAM_CRON") {
            if !v.trim().is_empty() {
                self.dream_cron = v;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MindConfig::default();
        assert_eq!(cfg.dream_cron, "0 3 * * *");
        assert_eq!(cfg.identity_cache_ttl_secs, 300);
        assert!((cfg.semantic_threshold - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: MindConfig = toml::from_str("dream_cron = \"30 4 * * *\"").unwrap();
        assert_eq!(cfg.dream_cron, "30 4 * * *");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }
}
