use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma3:latest";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Endpoint URL: env var wins, then the config file, then the default.
    pub fn resolved_endpoint(&self) -> String {
        env::var("CHARLA_ENDPOINT")
            .ok()
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    /// Model name: env var wins, then the config file, then the default.
    pub fn resolved_model(&self) -> String {
        env::var("CHARLA_MODEL")
            .ok()
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla").join("config.json"))
    }
}
