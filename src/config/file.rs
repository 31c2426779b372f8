//! Configuration file loading
//!
//! Handles loading configuration from TOML files. A `.json` extension is
//! parsed as JSON instead.

use crate::config::Config;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        let config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the first default location that parses
    pub fn load_default() -> Option<Config> {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return Some(config);
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Get default configuration file paths
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System-wide config
        paths.push(PathBuf::from("/etc/zesctl/config.toml"));

        // User config
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("zesctl/config.toml"));
        }

        // Current directory
        paths.push(PathBuf::from("zesctl.toml"));
        paths.push(PathBuf::from(".zesctl.toml"));

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_paths_not_empty() {
        let paths = ConfigFile::default_paths();
        assert_eq!(paths[0], PathBuf::from("/etc/zesctl/config.toml"));
        assert!(paths.contains(&PathBuf::from("zesctl.toml")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[general]
dry_run = true

[loader]
library_paths = ["/opt/ze/libze_loader.so.1"]
disabled_operations = ["device_reset"]

[device]
device = 2
"#
        )
        .unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert!(config.general.dry_run);
        assert!(!config.general.verbose);
        assert_eq!(config.loader.disabled_operations, vec!["device_reset"]);
        assert_eq!(config.device.driver, 0);
        assert_eq!(config.device.device, 2);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"general": {{"verbose": true}}}}"#).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert!(config.general.verbose);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[general\nverbose = yes").unwrap();

        assert!(matches!(
            ConfigFile::load(file.path()),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_load_rejects_unknown_operation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[loader]\ndisabled_operations = [\"warp_drive\"]").unwrap();

        assert!(matches!(
            ConfigFile::load(file.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
