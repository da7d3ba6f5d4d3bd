use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::clients::SupabaseConfig;
use crate::domain::BackendKind;

pub const REMOTE_URL_ENV: &str = "ANISHELF_REMOTE_URL";
pub const REMOTE_API_KEY_ENV: &str = "ANISHELF_REMOTE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub storage: StorageConfig,

    pub remote: RemoteConfig,

    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// "text" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            worker_threads: 2,
            event_bus_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,

    /// Directory holding one JSON file per key for the local backend.
    pub data_dir: String,

    /// How often the data directory is checked for writes made by other
    /// processes (default: 1000)
    pub watch_interval_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            data_dir: "data".to_string(),
            watch_interval_ms: 1000,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`
    pub url: String,

    /// Public (anon) API key.
    pub api_key: String,

    /// No timeout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_seconds: Option<u64>,
}

impl RemoteConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    #[must_use]
    pub fn client_config(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.request_timeout_seconds.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

impl Config {
    /// Loads `.env`, the first config file found and then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Non-empty values returned by `lookup` replace the remote credentials.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(REMOTE_URL_ENV).filter(|v| !v.is_empty()) {
            self.remote.url = url;
        }
        if let Some(key) = lookup(REMOTE_API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.remote.api_key = key;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("anishelf").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".anishelf").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        Self::create_default_at(&Self::default_config_path())
    }

    pub fn create_default_at(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == BackendKind::Remote && !self.remote.is_configured() {
            anyhow::bail!(
                "Remote backend requires remote.url and remote.api_key \
                 (or {REMOTE_URL_ENV} / {REMOTE_API_KEY_ENV})"
            );
        }

        if self.storage.backend == BackendKind::Local && self.storage.data_dir.trim().is_empty() {
            anyhow::bail!("storage.data_dir cannot be empty for the local backend");
        }

        if self.storage.watch_interval_ms == 0 {
            anyhow::bail!("storage.watch_interval_ms must be > 0");
        }

        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "general.log_format must be \"text\" or \"json\", got {:?}",
                self.general.log_format
            );
        }

        if self.remote.request_timeout_seconds == Some(0) {
            anyhow::bail!("remote.request_timeout_seconds must be > 0 when set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, BackendKind::Local);
        assert_eq!(config.general.log_level, "info");
        assert!(config.remote.request_timeout_seconds.is_none());
        assert_eq!(config.storage.watch_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("backend = \"local\""));
        assert!(!toml_str.contains("request_timeout_seconds"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [storage]
            backend = "remote"

            [remote]
            url = "https://demo.supabase.co"
            api_key = "anon"
            request_timeout_seconds = 20
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, BackendKind::Remote);
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(
            config.remote.client_config().timeout,
            Some(Duration::from_secs(20))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn remote_backend_requires_credentials() {
        let mut config = Config::default();
        config.storage.backend = BackendKind::Remote;
        assert!(config.validate().is_err());

        config.apply_env_overrides(|key| match key {
            REMOTE_URL_ENV => Some("https://env.supabase.co".to_string()),
            REMOTE_API_KEY_ENV => Some("env-key".to_string()),
            _ => None,
        });
        assert_eq!(config.remote.url, "https://env.supabase.co");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        let mut config = Config::default();
        config.general.log_format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_watch_interval_is_rejected() {
        let mut config = Config::default();
        config.storage.watch_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_file_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::create_default_at(&path).unwrap());
        assert!(!Config::create_default_at(&path).unwrap());
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.server.port, Config::default().server.port);
    }
}
