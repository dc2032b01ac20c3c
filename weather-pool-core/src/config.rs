use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use crate::{
    breaker::DEFAULT_COOLDOWN, model::DEFAULT_FORECAST_DAYS, provider::ProviderKind,
    quota::DEFAULT_QUOTA_WINDOW,
};

/// Overrides for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_quota: Option<u64>,
}

/// Timing and request knobs shared by all providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub request_timeout_secs: u64,
    pub cooldown_secs: u64,
    pub quota_window_secs: u64,
    pub default_days: usize,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
            quota_window_secs: DEFAULT_QUOTA_WINDOW.as_secs(),
            default_days: DEFAULT_FORECAST_DAYS,
            user_agent: concat!("weather-pool/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn quota_window(&self) -> Duration {
        Duration::from_secs(self.quota_window_secs)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.quota_window_secs == 0 {
            return Err(anyhow!("settings.quota_window_secs must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("settings.request_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

/// Key-value lookup that supplies provider credentials.
pub trait CredentialSource {
    fn credential(&self, key: &str) -> Option<String>;
}

/// Reads credentials from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn credential(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl CredentialSource for HashMap<String, String> {
    fn credential(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    /// Example TOML:
    /// [providers.openweathermap]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    pub fn provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.get(kind.as_str())
    }

    /// Returns the API key for a provider, if present and non-empty.
    pub fn provider_api_key(&self, kind: ProviderKind) -> Option<&str> {
        self.provider_config(kind)
            .and_then(|cfg| cfg.api_key.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_provider_configured(&self, kind: ProviderKind) -> bool {
        kind.credential_key().is_none() || self.provider_api_key(kind).is_some()
    }

    /// Set or replace a provider API key, keeping its other overrides.
    pub fn upsert_provider_api_key(&mut self, kind: ProviderKind, api_key: String) {
        self.providers.entry(kind.as_str().to_string()).or_default().api_key = Some(api_key);
    }

    /// Overlays credentials from `source` on top of whatever the file held.
    /// Empty values are ignored.
    pub fn with_credentials(mut self, source: &impl CredentialSource) -> Self {
        for kind in ProviderKind::all() {
            let Some(key) = kind.credential_key() else {
                continue;
            };
            if let Some(value) = source.credential(key).filter(|v| !v.trim().is_empty()) {
                self.upsert_provider_api_key(*kind, value);
            }
        }
        self
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-pool", "weather-pool")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
