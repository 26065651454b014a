//! Configuration management
//!
//! Read from `config.yaml` in the user config directory (or the file named by
//! `MATERIEL_CONFIG`), then overridden by environment variables. A missing
//! file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::quota::{QuotaGate, QuotaLimits};

pub const CONFIG_ENV: &str = "MATERIEL_CONFIG";
pub const DATA_DIR_ENV: &str = "MATERIEL_DATA_DIR";
pub const PREMIUM_ENV: &str = "MATERIEL_PREMIUM";
pub const LOG_ENV: &str = "MATERIEL_LOG";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    #[diagnostic(code(materiel::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    #[diagnostic(code(materiel::config::parse), help("Check the YAML syntax and field names"))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },

    #[error("Invalid value for {var}: '{value}'")]
    #[diagnostic(code(materiel::config::env), help("Use true/false, yes/no or 1/0"))]
    InvalidEnv { var: &'static str, value: String },

    #[error("No data directory could be determined")]
    #[diagnostic(
        code(materiel::config::no_data_dir),
        help("Set MATERIEL_DATA_DIR or pass --data-dir")
    )]
    NoDataDir,
}

/// Configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the entity lists are stored
    pub data_dir: Option<PathBuf>,

    /// Lifts every creation limit
    pub premium: bool,

    /// Free-tier creation limits
    pub limits: QuotaLimits,

    /// Quiet period before a change is saved
    pub autosave_debounce_ms: u64,

    /// Default log filter (overridden by MATERIEL_LOG)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            premium: false,
            limits: QuotaLimits::default(),
            autosave_debounce_ms: 600,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults on any error
    pub fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from the config file and environment
    pub fn try_load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(content)
    }

    /// Apply environment overrides, reading variables through `get`
    pub fn apply_env(
        &mut self,
        get: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = get(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = get(PREMIUM_ENV) {
            self.premium = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: PREMIUM_ENV,
                value,
            })?;
        }
        Ok(())
    }

    /// Config file path: `MATERIEL_CONFIG`, else the platform config dir
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        project_dirs().map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Data directory: configured, else the platform data dir
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoDataDir)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Quota gate built from the premium flag and limits
    pub fn quota_gate(&self) -> QuotaGate {
        QuotaGate::new(self.premium, self.limits.clone())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "materiel")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::QuotaCategory;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("premium: true\nlimits:\n  loan: 3\n").unwrap();
        assert!(config.premium);
        assert_eq!(config.limits.loan, 3);
        assert_eq!(config.limits.equipment, 20);
        assert_eq!(config.autosave_debounce_ms, 600);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("").unwrap();
        assert!(!config.premium);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(|var| match var {
                DATA_DIR_ENV => Some("/tmp/materiel".to_string()),
                PREMIUM_ENV => Some("yes".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/materiel")));
        assert!(config.premium);
        assert!(config.quota_gate().can_create(QuotaCategory::Worksite));
    }

    #[test]
    fn test_bad_premium_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|var| (var == PREMIUM_ENV).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "autosave_debounce_ms: 50\nlog_level: debug\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.log_level, "debug");

        std::fs::write(&path, "premium: [oops").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
