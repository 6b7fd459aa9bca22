//! Bearer token storage abstraction
//!
//! The token is written by an external login flow and only read by the
//! launcher. Every backend stores a single string under one fixed key.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::{Map, Value};
use thiserror::Error;

/// Default key the token is stored under
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";

/// Keyring service name
pub const KEYRING_SERVICE: &str = "streamexec";

/// Environment variable that overrides any stored token
pub const TOKEN_ENV_VAR: &str = "STREAMEXEC_TOKEN";

/// Errors that can occur with token storage
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Access denied")]
    AccessDenied,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid token store format: {0}")]
    InvalidFormat(String),
}

/// Trait for token storage backends
pub trait TokenStore: Send + Sync {
    /// Current token, `None` when absent or blank
    fn get(&self) -> Result<Option<String>, TokenStoreError>;

    /// Store a token, replacing any previous one
    fn set(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Remove the token. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), TokenStoreError>;

    /// Short backend name for logs and `token status`
    fn backend_name(&self) -> &'static str;
}

/// Blank strings count as absent
fn non_empty(token: String) -> Option<String> {
    if token.trim().is_empty() {
        None
    } else {
        Some(token)
    }
}

/// OS credential store (Windows Credential Manager, macOS Keychain, Linux keyutils)
pub struct KeyringTokenStore {
    service: String,
    key: String,
}

impl KeyringTokenStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
            key: key.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, TokenStoreError> {
        keyring::Entry::new(&self.service, &self.key)
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(non_empty(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(_)) => Err(TokenStoreError::AccessDenied),
            Err(keyring::Error::Ambiguous(_)) => {
                Err(TokenStoreError::Storage("Ambiguous entry".to_string()))
            }
            Err(e) => Err(TokenStoreError::Storage(e.to_string())),
        }
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        self.entry()?
            .set_password(token)
            .map_err(|e| TokenStoreError::Storage(e.to_string()))
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(TokenStoreError::Storage(e.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}

/// JSON key/value file, the on-disk counterpart of browser local storage.
///
/// Keys other than the token key are left untouched on write.
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, TokenStoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(TokenStoreError::AccessDenied)
            }
            Err(e) => return Err(TokenStoreError::Storage(e.to_string())),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(TokenStoreError::InvalidFormat(
                "expected a JSON object".to_string(),
            )),
            Err(e) => Err(TokenStoreError::InvalidFormat(e.to_string())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(map)
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| TokenStoreError::Storage(e.to_string()))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        let map = self.read_map()?;
        Ok(map
            .get(&self.key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .and_then(non_empty))
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut map = self.read_map()?;
        map.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut map = self.read_map()?;
        if map.remove(&self.key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// In-process store, lost on exit
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        let guard = self
            .token
            .read()
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        Ok(guard.clone().and_then(non_empty))
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        let mut guard = self
            .token
            .write()
            .map_err(|e| TokenStoreError::Storage(e.to_string()))?;
        *guard = None;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Reads the token from an environment variable first, then falls back
/// to the wrapped store. Writes always go to the wrapped store.
pub struct EnvTokenStore {
    var: String,
    inner: Box<dyn TokenStore>,
}

impl EnvTokenStore {
    pub fn new(inner: Box<dyn TokenStore>) -> Self {
        Self::with_var(TOKEN_ENV_VAR, inner)
    }

    pub fn with_var(var: impl Into<String>, inner: Box<dyn TokenStore>) -> Self {
        Self {
            var: var.into(),
            inner,
        }
    }
}

impl TokenStore for EnvTokenStore {
    fn get(&self) -> Result<Option<String>, TokenStoreError> {
        if let Some(token) = std::env::var(&self.var).ok().and_then(non_empty) {
            tracing::debug!("Using token from {}", self.var);
            return Ok(Some(token));
        }
        self.inner.get()
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        self.inner.set(token)
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.inner.clear()
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
