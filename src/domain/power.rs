//! Power domain types
//!
//! Power domains, energy counters, limits and power supplies.

use crate::error::DomainError;
use serde::Serialize;
use std::fmt;

/// Power domain properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PowerProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    /// Whether the user can change limits
    pub can_control: bool,
    pub is_energy_threshold_supported: bool,
    /// Factory default limit in milliwatts (-1 if unknown)
    pub default_limit: i32,
    pub min_limit: i32,
    pub max_limit: i32,
}

/// Monotonic energy counter sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PowerEnergyCounter {
    /// Energy in microjoules
    pub energy: u64,
    /// Timestamp in microseconds
    pub timestamp: u64,
}

impl PowerEnergyCounter {
    /// Average power in watts between this sample and a later one
    ///
    /// Returns `None` if the later sample is not strictly newer.
    pub fn average_power_watts(&self, later: &PowerEnergyCounter) -> Option<f64> {
        if later.timestamp <= self.timestamp || later.energy < self.energy {
            return None;
        }
        let joules = (later.energy - self.energy) as f64 / 1_000_000.0;
        let seconds = (later.timestamp - self.timestamp) as f64 / 1_000_000.0;
        Some(joules / seconds)
    }
}

/// Energy threshold configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EnergyThreshold {
    pub enable: bool,
    /// Threshold in joules
    pub threshold: f64,
    /// Process that last set the threshold
    pub process_id: u32,
}

impl EnergyThreshold {
    /// Validate a requested threshold in joules
    ///
    /// # Errors
    /// Returns `DomainError::InvalidEnergyThreshold` if not finite and positive
    pub fn validate(joules: f64) -> Result<f64, DomainError> {
        if !joules.is_finite() || joules <= 0.0 {
            return Err(DomainError::InvalidEnergyThreshold(joules));
        }
        Ok(joules)
    }
}

impl fmt::Display for EnergyThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enable {
            write!(f, "{:.1} J (pid {})", self.threshold, self.process_id)
        } else {
            write!(f, "disabled")
        }
    }
}

/// Power limit level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PowerLevel {
    #[default]
    Unknown,
    Sustained,
    Burst,
    Peak,
    Instantaneous,
}

/// Power source a limit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PowerSource {
    #[default]
    Any,
    Mains,
    Battery,
}

/// One power limit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PowerLimitDescriptor {
    pub level: PowerLevel,
    pub source: PowerSource,
    pub enabled: bool,
    /// Limit in milliwatts
    pub limit: i32,
    /// Averaging window in milliseconds
    pub interval: i32,
}

/// Power supply properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PsuProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub have_fan: bool,
    /// Current limit in milliamps (-1 if unknown)
    pub amp_limit: i32,
}

/// Power supply voltage status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PsuVoltageStatus {
    #[default]
    Unknown,
    Normal,
    OverVoltage,
    UnderVoltage,
}

/// Power supply state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PsuState {
    pub voltage_status: PsuVoltageStatus,
    pub fan_failed: bool,
    /// Temperature in degrees Celsius
    pub temperature: i32,
    /// Current in milliamps
    pub current: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_power() {
        let a = PowerEnergyCounter {
            energy: 1_000_000,
            timestamp: 0,
        };
        let b = PowerEnergyCounter {
            energy: 151_000_000,
            timestamp: 1_000_000,
        };
        assert_eq!(a.average_power_watts(&b), Some(150.0));
    }

    #[test]
    fn test_average_power_stale_sample() {
        let a = PowerEnergyCounter {
            energy: 10,
            timestamp: 100,
        };
        assert_eq!(a.average_power_watts(&a), None);
    }

    #[test]
    fn test_energy_threshold_validation() {
        assert_eq!(EnergyThreshold::validate(500.0), Ok(500.0));
        assert!(EnergyThreshold::validate(0.0).is_err());
        assert!(EnergyThreshold::validate(f64::NAN).is_err());
    }

    #[test]
    fn test_energy_threshold_display() {
        let t = EnergyThreshold::default();
        assert_eq!(t.to_string(), "disabled");
    }
}
