use serde::Deserialize;

use std::path::{Path, PathBuf};

mod general;
mod log;

use self::general::General;
use self::log::Log;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to open config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("timeout couldn't be parsed: {0}")]
    Timeout(#[from] humantime::DurationError),
    #[error("workers must be at least 1")]
    Workers,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    log: Log,
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse()
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn general(&self) -> &General {
        &self.general
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;

        config.general.check()?;

        Ok(config)
    }
}
