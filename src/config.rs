use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "study-tracker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub supabase_url: String,

    #[serde(default)]
    pub supabase_anon_key: String,

    #[serde(default = "default_subject_limit")]
    pub subject_limit: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_session_path")]
    pub session_path: String,
}

fn default_subject_limit() -> usize {
    6
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    data_dir.join("session.json").to_string_lossy().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            subject_limit: default_subject_limit(),
            request_timeout_secs: default_request_timeout(),
            session_path: default_session_path(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_ANON_KEY").ok(),
        );
        Ok(config)
    }

    /// Read the config at `path`, writing a default one first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn apply_env_overrides(&mut self, url: Option<String>, anon_key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.supabase_url = url;
        }
        if let Some(key) = anon_key.filter(|k| !k.trim().is_empty()) {
            self.supabase_anon_key = key;
        }
    }

    /// Fail early when the backend endpoint has not been configured.
    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.trim().is_empty() || self.supabase_anon_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "supabase_url and supabase_anon_key must be set in {} \
                 (or via SUPABASE_URL / SUPABASE_ANON_KEY)",
                Self::config_path().display()
            )));
        }
        url::Url::parse(&self.supabase_url)?;
        Ok(())
    }
}
