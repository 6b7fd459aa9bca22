//! Client configuration
//!
//! Loaded from `config.toml` in the platform config directory. Every field
//! is optional; CLI flags override individual values after loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::core::{
    EnvTokenStore, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore,
    DEFAULT_OUTPUT_PREFIX, DEFAULT_TOKEN_KEY,
};
use crate::launcher::{CommandLauncher, LauncherSettings, PREDEFINED_TASK};
use crate::transport::HttpTransport;

const CONFIG_FILE: &str = "config.toml";
const TOKEN_FILE: &str = "storage.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid base URL '{0}': {1}")]
    BaseUrl(String, url::ParseError),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Where the bearer token lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    #[default]
    Keyring,
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server the endpoints below are relative to
    pub base_url: String,
    /// Execute endpoint path
    pub endpoint: String,
    /// Static output page prefix, `/output/<id>`
    pub output_prefix: String,
    /// Status endpoint prefix, `/status/<id>`
    pub status_prefix: String,
    /// Storage key of the bearer token
    pub token_key: String,
    pub token_backend: TokenBackend,
    /// Command used by `long-task`
    pub predefined_task: String,
    /// Request timeout; unset or 0 waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            endpoint: "/execute_command".to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            status_prefix: "/status".to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            token_backend: TokenBackend::default(),
            predefined_task: PREDEFINED_TASK.to_string(),
            timeout_secs: None,
        }
    }
}

impl Config {
    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "streamexec")
    }

    /// Default location of `config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Self::project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Default location of the file token store
    pub fn token_file_path() -> Result<PathBuf, ConfigError> {
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(TOKEN_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`; a missing file yields the defaults.
    ///
    /// Values are not checked here so overrides can still replace them;
    /// call [`validate`](Self::validate) once they are applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::BaseUrl(self.base_url.clone(), e))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url().map(|_| ())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn launcher_settings(&self) -> LauncherSettings {
        LauncherSettings {
            endpoint: self.endpoint.clone(),
            output_prefix: self.output_prefix.clone(),
            status_prefix: self.status_prefix.clone(),
            predefined_task: self.predefined_task.clone(),
        }
    }

    /// Token store for the configured backend, with the env override on top
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>, ConfigError> {
        let inner: Box<dyn TokenStore> = match self.token_backend {
            TokenBackend::Keyring => Box::new(KeyringTokenStore::new(&self.token_key)),
            TokenBackend::File => Box::new(FileTokenStore::new(
                Self::token_file_path()?,
                &self.token_key,
            )),
            TokenBackend::Memory => Box::new(MemoryTokenStore::new()),
        };
        Ok(Arc::new(EnvTokenStore::new(inner)))
    }

    /// Wire up a launcher over HTTP
    pub fn launcher(&self) -> anyhow::Result<CommandLauncher> {
        let transport = HttpTransport::new(self.base_url()?, self.timeout())?;
        Ok(CommandLauncher::new(
            self.token_store()?,
            Arc::new(transport),
            self.launcher_settings(),
        ))
    }
}
