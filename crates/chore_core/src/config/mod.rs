use crate::error::AppError;
use crate::model::DEFAULT_GRACE_PERIOD_MINUTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "chores";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "CHORES_CONFIG_PATH";
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Grace period given to new timed tasks that do not set their own.
    #[serde(default)]
    pub default_grace_period_minutes: Option<u32>,
    /// `tracing` filter directive, e.g. `debug` or `chore_core=trace`.
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn grace_period_minutes(&self) -> u32 {
        self.default_grace_period_minutes
            .unwrap_or(DEFAULT_GRACE_PERIOD_MINUTES)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub default_grace_period_minutes: Option<u32>,
    pub log_level: Option<String>,
}

/// Per-user directory holding the config file and, by default, the store.
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_log_level(config))
}

fn normalize_log_level(mut config: Config) -> Config {
    config.log_level = config
        .log_level
        .map(|level| level.trim().to_string())
        .filter(|level| !level.is_empty());
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(minutes) = overrides.default_grace_period_minutes {
        merged.default_grace_period_minutes = Some(minutes);
    }
    if let Some(level) = overrides.log_level.as_ref() {
        merged.log_level = Some(level.clone());
    }

    normalize_log_level(merged)
}
