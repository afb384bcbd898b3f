use crate::error::{DeepscanError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default broker address, matching a local Redis with database 0.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Task name under which audio analysis jobs are queued.
pub const DEFAULT_QUEUE_NAME: &str = "audio.analyze";

/// Default checkpoint filename, relative to the worker's working directory.
pub const DEFAULT_MODEL_PATH: &str = "crnn_audio_fake.onnx";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub queue_name: String,
    pub model_path: PathBuf,
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            concurrency: 4,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(url) = std::env::var("DEEPSCAN_REDIS_URL") {
            config.redis_url = url;
        }
        if let Ok(queue) = std::env::var("DEEPSCAN_QUEUE") {
            config.queue_name = queue;
        }
        if let Ok(path) = std::env::var("DEEPSCAN_MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Ok(concurrency) = std::env::var("DEEPSCAN_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                config.concurrency = c;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.redis_url.is_empty() {
            return Err(DeepscanError::Config(
                "Broker URL must not be empty".to_string(),
            ));
        }

        if self.queue_name.is_empty() {
            return Err(DeepscanError::Config(
                "Queue name must not be empty".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(DeepscanError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("deepscan").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.redis_url, DEFAULT_REDIS_URL);
        assert_eq!(config.queue_name, "audio.analyze");
        assert_eq!(config.model_path, PathBuf::from("crnn_audio_fake.onnx"));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_queue() {
        let config = Config {
            queue_name: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.redis_url, config.redis_url);
        assert_eq!(parsed.queue_name, config.queue_name);
    }
}
