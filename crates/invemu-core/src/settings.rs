//! Settings file
//!
//! TOML with three tables. A missing or unreadable file is replaced by the
//! defaults so the next start finds a valid one.

use crate::error::SettingsError;
use crate::identity::RandomizeOptions;
use crate::persist::DEFAULT_INVENTORY_FILE;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default settings file name
pub const DEFAULT_SETTINGS_FILE: &str = "settings.toml";

/// Environment variable overriding `storage.data_dir`
pub const DATA_DIR_ENV: &str = "INVEMU_DATA_DIR";

/// Subdirectory of the data directory receiving debug dumps
pub const DEBUG_DIR: &str = "debug";

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Process-wide switches
    pub general: GeneralSettings,
    /// Inventory files
    pub storage: StorageSettings,
    /// Session identity
    pub session: SessionSettings,
}

/// `[general]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Verbose logging plus request/response dumps
    pub debug_logging: bool,
    /// Set until first-run provisioning has completed
    pub first_boot: bool,
    /// Port of the intercepting proxy
    pub proxy_port: u16,
    /// Port of the upstream proxy
    pub upstream_port: u16,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            first_boot: true,
            proxy_port: 8888,
            upstream_port: 7890,
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the inventory files
    pub data_dir: PathBuf,
    /// Primary inventory file name
    pub inventory_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            inventory_file: DEFAULT_INVENTORY_FILE.to_string(),
        }
    }
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Remint equipped ids inside the `MapMode` record at session start
    pub remint_map_mode: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            remint_map_mode: RandomizeOptions::default().remint_map_mode,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// `SettingsError::Parse` for invalid TOML or wrong field types
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Render settings as TOML
    ///
    /// # Errors
    /// `SettingsError::Serialize` if rendering fails
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load settings from `path`
    ///
    /// # Errors
    /// I/O or parse errors
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(&text)
    }

    /// Load settings, writing defaults back when the file is missing or invalid
    ///
    /// A failed write-back is logged and the defaults are still returned.
    pub async fn load_or_init(path: &Path) -> Self {
        match Self::load(path).await {
            Ok(settings) => settings,
            Err(err) => {
                if path.exists() {
                    warn!(path = %path.display(), %err, "settings unreadable, restoring defaults");
                } else {
                    info!(path = %path.display(), "no settings file, writing defaults");
                }
                let settings = Self::default();
                if let Err(err) = settings.save(path).await {
                    warn!(path = %path.display(), %err, "default settings not written");
                }
                settings
            }
        }
    }

    /// Write settings to `path`
    ///
    /// # Errors
    /// Serialize or I/O errors
    pub async fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let text = self.to_toml()?;
        let io = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }
        tokio::fs::write(path, text).await.map_err(io)
    }

    /// Clear the first-boot flag and rewrite the file
    ///
    /// # Errors
    /// Serialize or I/O errors
    pub async fn complete_first_boot(&mut self, path: &Path) -> Result<(), SettingsError> {
        self.general.first_boot = false;
        self.save(path).await
    }

    /// Apply [`DATA_DIR_ENV`] if set
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.storage.data_dir = PathBuf::from(dir);
        }
    }

    /// Store configuration derived from these settings
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::new(&self.storage.data_dir)
            .with_inventory_file(&self.storage.inventory_file)
            .with_randomize(RandomizeOptions {
                remint_map_mode: self.session.remint_map_mode,
            });
        if self.general.debug_logging {
            config.with_debug_dir(self.storage.data_dir.join(DEBUG_DIR))
        } else {
            config
        }
    }

    /// Log filter when `RUST_LOG` is unset
    #[inline]
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.general.debug_logging {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(!settings.general.debug_logging);
        assert!(settings.general.first_boot);
        assert_eq!(settings.general.proxy_port, 8888);
        assert_eq!(settings.general.upstream_port, 7890);
        assert_eq!(settings.storage.inventory_file, "inventory.bin");
        assert!(settings.session.remint_map_mode);
        assert_eq!(settings.log_filter(), "info");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let settings = Settings::from_toml("[general]\ndebug_logging = true\n").unwrap();
        assert!(settings.general.debug_logging);
        assert_eq!(settings.general.proxy_port, 8888);
        assert_eq!(settings.log_filter(), "debug");
        assert_eq!(
            settings.store_config().debug_dir,
            Some(PathBuf::from("data").join(DEBUG_DIR))
        );
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = Settings::from_toml("[general]\nproxy_port = \"x\"\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[tokio::test]
    async fn load_or_init_writes_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("conf").join(DEFAULT_SETTINGS_FILE);
        let settings = Settings::load_or_init(&path).await;
        assert_eq!(settings, Settings::default());
        assert_eq!(Settings::load(&path).await.unwrap(), settings);
    }

    #[tokio::test]
    async fn invalid_file_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_SETTINGS_FILE);
        tokio::fs::write(&path, "not = [toml").await.unwrap();
        assert_eq!(Settings::load_or_init(&path).await, Settings::default());
        assert!(Settings::load(&path).await.is_ok());
    }

    #[tokio::test]
    async fn first_boot_completion_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_SETTINGS_FILE);
        let mut settings = Settings::load_or_init(&path).await;
        settings.complete_first_boot(&path).await.unwrap();
        assert!(!Settings::load(&path).await.unwrap().general.first_boot);
    }
}
