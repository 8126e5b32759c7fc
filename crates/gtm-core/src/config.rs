use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::state::Pricing;
use crate::teams::Team;

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/sales-agent";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub webhook_url: String,
    pub stats_url: Option<String>,
    pub stats_poll_secs: u64,
    pub pricing: Pricing,
    pub default_team: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            stats_url: None,
            stats_poll_secs: 60,
            pricing: Pricing::default(),
            default_team: Team::Sales.as_str().to_string(),
        }
    }
}

impl Config {
    /// Load from the user config dir, then apply `GTM_WEBHOOK_URL` / `GTM_STATS_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(
            std::env::var("GTM_WEBHOOK_URL").ok(),
            std::env::var("GTM_STATS_URL").ok(),
        );
        Ok(config)
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    /// Remember the team picked in the shell, leaving the rest of the file alone.
    /// An unreadable file is replaced with defaults.
    pub fn save_default_team_to(path: &Path, team: Team) -> Result<(), ConfigError> {
        let mut config = match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Config unreadable, replacing with defaults");
                Self::default()
            }
        };
        config.default_team = team.as_str().to_string();
        config.save_to(path)
    }

    /// Non-empty values replace what the file said.
    pub fn apply_overrides(&mut self, webhook_url: Option<String>, stats_url: Option<String>) {
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            self.webhook_url = url;
        }
        if let Some(url) = stats_url.filter(|u| !u.trim().is_empty()) {
            self.stats_url = Some(url);
        }
    }

    /// Unknown team names fall back to Sales.
    pub fn team(&self) -> Team {
        Team::from_str(&self.default_team).unwrap_or(Team::Sales)
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("gtm-intel"))
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert_eq!(config.stats_poll_secs, 60);
        assert_eq!(config.team(), Team::Sales);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"stats_url": "http://localhost:5678/webhook/stats"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.stats_url.as_deref(), Some("http://localhost:5678/webhook/stats"));
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert_eq!(config.pricing, Pricing::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            webhook_url: "https://agents.example.com/ask".to_string(),
            stats_poll_secs: 15,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_save_default_team_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            webhook_url: "https://agents.example.com/ask".to_string(),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        Config::save_default_team_to(&path, Team::Product).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.team(), Team::Product);
        assert_eq!(loaded.webhook_url, "https://agents.example.com/ask");
    }

    #[test]
    fn test_save_default_team_replaces_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        Config::save_default_team_to(&path, Team::ProductMarketing).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.team(), Team::ProductMarketing);
        assert_eq!(loaded.webhook_url, DEFAULT_WEBHOOK_URL);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(Some("  ".to_string()), Some("http://stats".to_string()));
        assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
        assert_eq!(config.stats_url.as_deref(), Some("http://stats"));

        config.apply_overrides(Some("http://hook".to_string()), None);
        assert_eq!(config.webhook_url, "http://hook");
        assert_eq!(config.stats_url.as_deref(), Some("http://stats"));
    }

    #[test]
    fn test_unknown_team_falls_back() {
        let config = Config {
            default_team: "finance".to_string(),
            ..Default::default()
        };
        assert_eq!(config.team(), Team::Sales);
    }
}
