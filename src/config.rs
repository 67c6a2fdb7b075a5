use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::scheduler::SchedulerKind;
use crate::timetable::Timetable;

const APP_DIR: &str = "pau-tracker";
const DEFAULT_DB_NAME: &str = "pau.db";
const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scheduler: SchedulerKind,
    pub timetable: Timetable,
    pub profile: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            timetable: Timetable::default(),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

fn app_dir() -> PathBuf {
    let dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);

    std::fs::create_dir_all(&dir).ok();
    dir
}

pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("PAU_CONFIG") {
        return PathBuf::from(path);
    }
    app_dir().join(CONFIG_FILE)
}

pub fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PAU_DB") {
        return PathBuf::from(path);
    }
    app_dir().join(DEFAULT_DB_NAME)
}
