//! Unified error types for zesctl
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error returned through the sysman dispatch gate
    #[error("Sysman error: {0}")]
    Sysman(#[from] ZesError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// Device not found at the requested position
    #[error("Device not found: driver {driver}, device {device}")]
    DeviceNotFound { driver: u32, device: u32 },

    /// No sysman drivers reported by the loader
    #[error("No sysman drivers detected")]
    NoDriversFound,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result codes surfaced by sysman operations
///
/// Success is `Ok(..)`; every other code of the closed enumeration is a
/// variant here. Numeric values match the Level Zero `ze_result_t` codes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZesError {
    /// Subsystem is tearing down or never finished initializing
    #[error("sysman is not initialized")]
    Uninitialized,

    /// Device hung, reset, removed or the driver was updated
    #[error("device lost")]
    DeviceLost,

    /// Insufficient host memory
    #[error("out of host memory")]
    OutOfHostMemory,

    /// Insufficient device memory
    #[error("out of device memory")]
    OutOfDeviceMemory,

    /// Caller lacks the privileges the operation requires
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// Resource is already in use or not available right now
    #[error("not available")]
    NotAvailable,

    /// Backend does not implement the operation
    #[error("unsupported feature")]
    UnsupportedFeature,

    /// Argument out of range or otherwise invalid
    #[error("invalid argument")]
    InvalidArgument,

    /// Handle argument is null
    #[error("invalid null handle")]
    InvalidNullHandle,

    /// Handle object is still in use by the driver
    #[error("handle object in use")]
    HandleObjectInUse,

    /// Pointer argument is null
    #[error("invalid null pointer")]
    InvalidNullPointer,

    /// Size argument is invalid (for example zero)
    #[error("invalid size")]
    InvalidSize,

    /// Enumeration argument is out of range
    #[error("invalid enumeration")]
    InvalidEnumeration,

    /// Unknown or internal error
    #[error("unknown error")]
    Unknown,
}

impl ZesError {
    pub const SUCCESS: u32 = 0x0000_0000;

    /// Numeric result code
    pub const fn code(self) -> u32 {
        match self {
            Self::DeviceLost => 0x7000_0001,
            Self::OutOfHostMemory => 0x7000_0002,
            Self::OutOfDeviceMemory => 0x7000_0003,
            Self::InsufficientPermissions => 0x7001_0000,
            Self::NotAvailable => 0x7001_0001,
            Self::Uninitialized => 0x7800_0001,
            Self::UnsupportedFeature => 0x7800_0003,
            Self::InvalidArgument => 0x7800_0004,
            Self::InvalidNullHandle => 0x7800_0005,
            Self::HandleObjectInUse => 0x7800_0006,
            Self::InvalidNullPointer => 0x7800_0007,
            Self::InvalidSize => 0x7800_0008,
            Self::InvalidEnumeration => 0x7800_000c,
            Self::Unknown => 0x7fff_fffe,
        }
    }

    /// Map a non-success code back to an error
    ///
    /// Codes outside the closed enumeration collapse to `Unknown`.
    pub const fn from_code(code: u32) -> Self {
        match code {
            0x7000_0001 => Self::DeviceLost,
            0x7000_0002 => Self::OutOfHostMemory,
            0x7000_0003 => Self::OutOfDeviceMemory,
            0x7001_0000 => Self::InsufficientPermissions,
            0x7001_0001 => Self::NotAvailable,
            0x7800_0001 => Self::Uninitialized,
            0x7800_0003 => Self::UnsupportedFeature,
            0x7800_0004 => Self::InvalidArgument,
            0x7800_0005 => Self::InvalidNullHandle,
            0x7800_0006 => Self::HandleObjectInUse,
            0x7800_0007 => Self::InvalidNullPointer,
            0x7800_0008 => Self::InvalidSize,
            0x7800_000c => Self::InvalidEnumeration,
            _ => Self::Unknown,
        }
    }

    /// Convert a raw result code into a `Result`
    pub const fn check(code: u32) -> ZeResult<()> {
        if code == Self::SUCCESS {
            Ok(())
        } else {
            Err(Self::from_code(code))
        }
    }

    /// Convert a `Result` back into a raw result code
    pub fn to_code(result: ZeResult<()>) -> u32 {
        match result {
            Ok(()) => Self::SUCCESS,
            Err(e) => e.code(),
        }
    }
}

/// Result alias for sysman operations
pub type ZeResult<T> = std::result::Result<T, ZesError>;

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid fan speed value (must be 0-100)
    #[error("Invalid fan speed: {0}% (must be 0-100)")]
    InvalidFanSpeed(u8),

    /// Frequency range with min above max
    #[error("Invalid frequency range: min {min} MHz is above max {max} MHz")]
    InvalidFrequencyRange { min: f64, max: f64 },

    /// Performance factor outside 0-100
    #[error("Invalid performance factor: {0} (must be 0-100)")]
    InvalidPerformanceFactor(f64),

    /// Energy threshold must be positive
    #[error("Invalid energy threshold: {0} J (must be greater than 0)")]
    InvalidEnergyThreshold(f64),

    /// Invalid value provided
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors from service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Sysman operation failed
    #[error("Sysman operation failed: {0}")]
    Sysman(#[from] ZesError),

    /// Domain validation failed
    #[error("Validation failed: {0}")]
    Domain(#[from] DomainError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Sysman(e) => AppError::Sysman(e),
            ServiceError::Domain(e) => AppError::Domain(e),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InvalidFanSpeed(150);
        assert_eq!(err.to_string(), "Invalid fan speed: 150% (must be 0-100)");
    }

    #[test]
    fn test_code_values() {
        assert_eq!(ZesError::Uninitialized.code(), 0x7800_0001);
        assert_eq!(ZesError::UnsupportedFeature.code(), 0x7800_0003);
        assert_eq!(ZesError::DeviceLost.code(), 0x7000_0001);
    }

    #[test]
    fn test_check_success() {
        assert_eq!(ZesError::check(0), Ok(()));
        assert_eq!(ZesError::check(0x7800_000c), Err(ZesError::InvalidEnumeration));
    }

    #[test]
    fn test_unrecognised_code_is_unknown() {
        assert_eq!(ZesError::from_code(0x1234), ZesError::Unknown);
        // NOT_READY is not part of the closed set
        assert_eq!(ZesError::from_code(1), ZesError::Unknown);
    }

    #[test]
    fn test_to_code() {
        assert_eq!(ZesError::to_code(Ok(())), 0);
        assert_eq!(
            ZesError::to_code(Err(ZesError::HandleObjectInUse)),
            0x7800_0006
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: AppError = ServiceError::Sysman(ZesError::DeviceLost).into();
        assert!(matches!(err, AppError::Sysman(ZesError::DeviceLost)));
    }
}
