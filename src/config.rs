//! Configuration loading with figment.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`~/.config/rollsafe/config.toml` unless overridden)
//! 3. Environment variables prefixed with `ROLLSAFE_`, `__` between levels
//!    (e.g. `ROLLSAFE_ATTACHMENTS__MAX_BYTES=1048576`)

use crate::error::{Result, RollSafeError};
use crate::location::{
    CommandLocation, LocationFix, LocationProvider, NoLocation, StaticLocation,
    DEFAULT_LOCATION_TIMEOUT,
};
use crate::service::{AttachmentPolicy, DEFAULT_MAX_ATTACHMENT_BYTES};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "rollsafe";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub attachments: AttachmentConfig,
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the vault file. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    pub max_bytes: u64,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub timeout_secs: u64,
    /// Fixed position reported instead of querying a device.
    pub fixed: Option<LocationFix>,
    /// Program printing a JSON fix, e.g. `["termux-location", "-p", "gps"]`.
    pub command: Option<Vec<String>>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_LOCATION_TIMEOUT.as_secs(),
            fixed: None,
            command: None,
        }
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the configured provider. A command takes precedence over a fixed
    /// position; with neither, location is unavailable.
    pub fn provider(&self) -> Box<dyn LocationProvider> {
        if let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) {
            return Box::new(CommandLocation::new(program.clone(), args.to_vec()));
        }
        match self.fixed {
            Some(fix) => Box::new(StaticLocation(fix)),
            None => Box::new(NoLocation),
        }
    }
}

impl Config {
    /// Load from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an optional explicit config file.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLSAFE_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR_NAME)
    }

    /// Directory for the vault file, resolving the default when unset.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: self.attachments.max_bytes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.attachments.max_bytes == 0 {
            return Err(RollSafeError::ConfigValidation(
                "attachments.max_bytes must be greater than 0".to_string(),
            ));
        }
        if self.location.timeout_secs == 0 {
            return Err(RollSafeError::ConfigValidation(
                "location.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(fix) = &self.location.fixed {
            fix.validate()
                .map_err(|e| RollSafeError::ConfigValidation(format!("location.fixed: {e}")))?;
        }
        if matches!(&self.location.command, Some(c) if c.is_empty()) {
            return Err(RollSafeError::ConfigValidation(
                "location.command must name a program".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.attachments.max_bytes, 2 * 1024 * 1024);
        assert_eq!(config.location.timeout_secs, 10);
        assert!(config.location.fixed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[storage]
data_dir = "/var/lib/rollsafe"

[attachments]
max_bytes = 1024

[location]
timeout_secs = 3
fixed = { latitude = 39.7392, longitude = -104.9903, accuracy_m = 25.0 }
"#,
        );

        let config = Config::load_from(Some(path.as_path())).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/rollsafe"));
        assert_eq!(config.attachment_policy().max_bytes, 1024);
        assert_eq!(config.location.timeout(), Duration::from_secs(3));
        assert_eq!(config.location.fixed.unwrap().latitude, 39.7392);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[attachments]\nmax_bytes = 1024\n");

        std::env::set_var("ROLLSAFE_ATTACHMENTS__MAX_BYTES", "4096");
        let config = Config::load_from(Some(path.as_path()));
        std::env::remove_var("ROLLSAFE_ATTACHMENTS__MAX_BYTES");

        assert_eq!(config.unwrap().attachments.max_bytes, 4096);
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[attachments]\nmax_bytes = 0\n");
        assert!(matches!(
            Config::load_from(Some(path.as_path())),
            Err(RollSafeError::ConfigValidation(_))
        ));

        let path = write_config(
            &dir,
            "[location]\nfixed = { latitude = 120.0, longitude = 0.0, accuracy_m = 1.0 }\n",
        );
        assert!(Config::load_from(Some(path.as_path())).is_err());
    }

    #[tokio::test]
    async fn test_provider_selection() {
        let fix = LocationFix {
            latitude: 1.0,
            longitude: 2.0,
            accuracy_m: 3.0,
        };
        let mut location = LocationConfig::default();
        assert!(location.provider().current_position().await.is_err());

        location.fixed = Some(fix);
        assert_eq!(location.provider().current_position().await.unwrap(), fix);

        location.command = Some(vec![]);
        let config = Config {
            location,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
