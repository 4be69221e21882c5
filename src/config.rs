use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};
use crate::client::ChatMode;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub default_mode: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Record the mode in the config file, keeping every other setting. An
    /// unreadable file is left alone and reported.
    pub fn save_default_mode_to(config_path: &Path, mode: ChatMode) -> Result<()> {
        let mut config = Self::load_from(config_path)?;
        config.default_mode = Some(mode.as_str().to_string());
        config.save_to(config_path)
    }

    /// Flag or env value wins, then the config file, then the built-in default.
    pub fn resolve_api_base(&self, cli_value: Option<&str>) -> String {
        cli_value
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.api_base_url.clone().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolve_mode(&self, cli_value: Option<ChatMode>) -> ChatMode {
        cli_value
            .or_else(|| self.default_mode.as_deref().and_then(|mode| mode.parse().ok()))
            .unwrap_or_default()
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatline").join("config.json"))
    }
}
