//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;

use std::path::PathBuf;

/// Builder for merging configuration sources
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// An explicit path must load; without one the default locations are
    /// searched and a missing file is not an error.
    pub fn with_file(mut self, path: Option<&str>) -> Result<Self, ConfigError> {
        let file_config = match path {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::load_default(),
        };

        if let Some(cfg) = file_config {
            self.config = cfg;
        }

        Ok(self)
    }

    /// Override with CLI verbose flag
    pub fn with_verbose(mut self, verbose: Option<bool>) -> Self {
        if let Some(v) = verbose {
            self.config.general.verbose = v;
        }
        self
    }

    /// Override with CLI dry-run flag
    pub fn with_dry_run(mut self, dry_run: Option<bool>) -> Self {
        if let Some(d) = dry_run {
            self.config.general.dry_run = d;
        }
        self
    }

    /// Put a CLI library path ahead of the configured ones
    pub fn with_library_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(p) = path {
            self.config.loader.library_paths.insert(0, p);
        }
        self
    }

    /// Override with CLI driver index
    pub fn with_driver_index(mut self, index: Option<u32>) -> Self {
        if let Some(i) = index {
            self.config.device.driver = i;
        }
        self
    }

    /// Override with CLI device index
    pub fn with_device_index(mut self, index: Option<u32>) -> Self {
        if let Some(i) = index {
            self.config.device.device = i;
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert!(!config.general.verbose);
        assert!(!config.general.dry_run);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .with_verbose(Some(true))
            .with_dry_run(Some(true))
            .with_driver_index(Some(1))
            .with_device_index(None)
            .with_library_path(Some(PathBuf::from("/tmp/libze_loader.so")))
            .build()
            .unwrap();

        assert!(config.general.verbose);
        assert!(config.general.dry_run);
        assert_eq!(config.device.driver, 1);
        assert_eq!(config.device.device, 0);
        assert_eq!(
            config.loader.library_paths,
            vec![PathBuf::from("/tmp/libze_loader.so")]
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[general]\ndry_run = true\n[device]\ndevice = 3").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = ConfigBuilder::new()
            .with_file(Some(&path))
            .unwrap()
            .with_dry_run(Some(false))
            .build()
            .unwrap();

        assert!(!config.general.dry_run);
        assert_eq!(config.device.device, 3);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = ConfigBuilder::new().with_file(Some("/nonexistent/zesctl.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
