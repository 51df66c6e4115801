use super::schema::Config;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./userale.yaml
    /// 2. ~/.userale/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<Config, ConfigError> {
        let local_config = PathBuf::from("./userale.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".userale").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(Config::default())
    }

    pub async fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.transmit_interval == 0 {
        return Err(ConfigError::Invalid("transmit_interval must be positive".into()));
    }
    if config.log_count_threshold == 0 {
        return Err(ConfigError::Invalid(
            "log_count_threshold must be positive".into(),
        ));
    }
    if config.resolution == 0 {
        return Err(ConfigError::Invalid("resolution must be positive".into()));
    }
    Ok(())
}
