use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::types::ModelChoice;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_model: ModelChoice,
    pub caching_enabled: bool,
    pub request_timeout_secs: u64,
    pub anthropic_model: String,
    pub anthropic_max_tokens: u32,
    pub anthropic_base_url: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_model: ModelChoice::Claude,
            caching_enabled: false,
            request_timeout_secs: 120,
            anthropic_model: "claude-3-5-sonnet-20240620".to_string(),
            anthropic_max_tokens: 1024,
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_base_url: "https://api.openai.com".to_string(),
            anthropic_api_key: None,
            openai_api_key: None,
        }
    }
}

impl Settings {
    /// Get the platform-specific settings directory
    pub fn settings_dir() -> Result<PathBuf, SettingsError> {
        let config_dir = if cfg!(any(target_os = "windows", target_os = "macos")) {
            // Windows: %APPDATA%\aichat, macOS: ~/Library/Application Support/aichat
            dirs::config_dir()
                .ok_or(SettingsError::NoConfigDir)?
                .join("aichat")
        } else {
            // Linux/Unix: $HOME/.aichat
            dirs::home_dir()
                .ok_or(SettingsError::NoConfigDir)?
                .join(".aichat")
        };

        Ok(config_dir)
    }

    pub fn settings_path() -> Result<PathBuf, SettingsError> {
        Ok(Self::settings_dir()?.join("settings.toml"))
    }

    /// Where exported chat transcripts are written
    pub fn exports_dir() -> Result<PathBuf, SettingsError> {
        Ok(Self::settings_dir()?.join("exports"))
    }

    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Load settings from `path`, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        // The file may hold API keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
