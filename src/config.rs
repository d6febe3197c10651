use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Models offered by the settings picker when the config file names none.
const DEFAULT_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"];

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub default_model: Option<String>,
    pub models: Option<Vec<String>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Backend base URL: `CHATTERM_SERVER` wins over the config file, which
    /// wins over the localhost default.
    pub fn server_url(&self) -> String {
        std::env::var("CHATTERM_SERVER")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn default_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn models(&self) -> Vec<String> {
        match &self.models {
            Some(models) if !models.is_empty() => models.clone(),
            _ => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("chatterm").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `server_url()` reads a process-global env var; serialize the tests
    // that touch it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_file_yields_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("CHATTERM_SERVER");

        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.server_url(), DEFAULT_SERVER_URL);
        assert_eq!(config.default_model(), DEFAULT_MODEL);
        assert!(!config.models().is_empty());
    }

    #[test]
    fn env_var_beats_the_config_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let config = Config {
            server_url: Some("http://filehost:5000".to_string()),
            ..Default::default()
        };

        std::env::set_var("CHATTERM_SERVER", "http://envhost:5000");
        assert_eq!(config.server_url(), "http://envhost:5000");

        // An empty override is ignored, not honored.
        std::env::set_var("CHATTERM_SERVER", "");
        assert_eq!(config.server_url(), "http://filehost:5000");

        std::env::remove_var("CHATTERM_SERVER");
        assert_eq!(config.server_url(), "http://filehost:5000");
    }

    #[test]
    fn round_trips_through_disk() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("CHATTERM_SERVER");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            server_url: Some("http://10.0.0.2:5000".to_string()),
            default_model: Some("gpt-4o".to_string()),
            models: Some(vec!["gpt-4o".to_string()]),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server_url(), "http://10.0.0.2:5000");
        assert_eq!(loaded.default_model(), "gpt-4o");
        assert_eq!(loaded.models(), vec!["gpt-4o".to_string()]);
    }
}
