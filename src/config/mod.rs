//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::error::ConfigError;
use crate::sysman::{LevelZeroLoader, OPERATIONS};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Level Zero loader settings
    pub loader: LoaderConfig,
    /// Device selection
    pub device: DeviceConfig,
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()
    }
}

/// General configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,
    /// Log changes instead of applying them
    pub dry_run: bool,
}

/// Loader library configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Loader libraries tried before the system defaults
    pub library_paths: Vec<PathBuf>,
    /// Operations to leave unbound, by name (e.g. `firmware_flash`)
    pub disabled_operations: Vec<String>,
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in &self.disabled_operations {
            if !OPERATIONS.iter().any(|(_, op)| *op == name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "loader.disabled_operations".to_string(),
                    message: format!("unknown operation '{}'", name),
                });
            }
        }
        Ok(())
    }

    /// Level Zero backend configured from these settings
    pub fn to_loader(&self) -> LevelZeroLoader {
        LevelZeroLoader::new()
            .with_library_paths(self.library_paths.iter().cloned())
            .with_disabled(self.disabled_operations.iter().cloned())
    }
}

/// Device selection configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Driver position in enumeration order
    pub driver: u32,
    /// Device position within the driver
    pub device: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.dry_run);
        assert!(config.loader.library_paths.is_empty());
        assert_eq!(config.device.driver, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_disabled_operation_rejected() {
        let loader = LoaderConfig {
            disabled_operations: vec!["fan_spin_faster".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            loader.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_known_disabled_operation_accepted() {
        let loader = LoaderConfig {
            disabled_operations: vec!["firmware_flash".to_string()],
            ..Default::default()
        };
        assert!(loader.validate().is_ok());
    }

    #[test]
    fn test_loader_prefers_configured_paths() {
        let loader = LoaderConfig {
            library_paths: vec![PathBuf::from("/opt/intel/libze_loader.so.1")],
            ..Default::default()
        }
        .to_loader();
        assert_eq!(
            loader.candidates()[0],
            PathBuf::from("/opt/intel/libze_loader.so.1")
        );
    }
}
