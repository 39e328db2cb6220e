use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::auth::AuthSession;
use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_RAM_GB: u32 = 8;
pub const DEFAULT_CONTENT_VERSION: &str = "0.0.0";

/// Launcher settings persisted as `config/app.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "ram")]
    pub ram_allocation_gb: u32,
    /// What content is on disk. Only advanced after a successful extraction.
    #[serde(rename = "version")]
    pub installed_content_version: String,
    #[serde(rename = "showConsole")]
    pub console_visible_by_default: bool,
    #[serde(rename = "savedAuth")]
    pub saved_session: Option<AuthSession>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ram_allocation_gb: DEFAULT_RAM_GB,
            installed_content_version: DEFAULT_CONTENT_VERSION.into(),
            console_visible_by_default: false,
            saved_session: None,
        }
    }
}

impl Config {
    /// Field-by-field merge over the defaults. A missing or mistyped field
    /// falls back to its default without discarding the others.
    fn from_value(value: Value) -> Self {
        let mut config = Config::default();
        let Value::Object(fields) = value else {
            warn!("Config root is not an object, using defaults");
            return config;
        };

        if let Some(ram) = fields.get("ram").and_then(Value::as_u64) {
            config.ram_allocation_gb = u32::try_from(ram).unwrap_or(DEFAULT_RAM_GB);
        }
        if let Some(version) = fields.get("version").and_then(Value::as_str) {
            config.installed_content_version = version.to_string();
        }
        if let Some(show) = fields.get("showConsole").and_then(Value::as_bool) {
            config.console_visible_by_default = show;
        }
        if let Some(raw) = fields.get("savedAuth").filter(|v| !v.is_null()) {
            match serde_json::from_value::<AuthSession>(raw.clone()) {
                Ok(session) => config.saved_session = Some(session),
                Err(e) => warn!("Ignoring unreadable saved session: {}", e),
            }
        }

        config
    }
}

/// Sole owner of the config file. All writes are serialized.
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: anything unreadable degrades to defaults.
    pub async fn load(&self) -> Config {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
            Err(e) => {
                warn!("Cannot read {:?}: {}", self.path, e);
                return Config::default();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Config::from_value(value),
            Err(e) => {
                warn!("Corrupt config at {:?}: {}", self.path, e);
                Config::default()
            }
        }
    }

    /// Read-merge-write under the writer lock; returns the persisted value.
    pub async fn update<F>(&self, mutator: F) -> LauncherResult<Config>
    where
        F: FnOnce(Config) -> Config,
    {
        let _guard = self.write_lock.lock().await;
        let current = self.load().await;
        let next = mutator(current);
        self.write(&next).await?;
        debug!("Persisted config to {:?}", self.path);
        Ok(next)
    }

    async fn write(&self, config: &Config) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(config)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| LauncherError::io(&staging, e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))?;
        Ok(())
    }
}
