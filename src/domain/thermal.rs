//! Thermal domain types
//!
//! Temperature sensors and fans.

use crate::error::DomainError;
use serde::Serialize;
use std::fmt;

/// Temperature sensor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TempSensor {
    #[default]
    Global,
    Gpu,
    Memory,
    GlobalMin,
    GpuMin,
    MemoryMin,
    GpuBoard,
    GpuBoardMin,
    Vram,
}

impl fmt::Display for TempSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Global => "Global",
            Self::Gpu => "GPU",
            Self::Memory => "Memory",
            Self::GlobalMin => "Global (min)",
            Self::GpuMin => "GPU (min)",
            Self::MemoryMin => "Memory (min)",
            Self::GpuBoard => "GPU board",
            Self::GpuBoardMin => "GPU board (min)",
            Self::Vram => "VRAM",
        };
        write!(f, "{}", name)
    }
}

/// Temperature sensor properties
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TempProperties {
    pub sensor: TempSensor,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    /// Maximum readable temperature in degrees Celsius
    pub max_temperature: f64,
    pub is_critical_temp_supported: bool,
    pub is_threshold1_supported: bool,
    pub is_threshold2_supported: bool,
}

/// One temperature threshold
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TempThreshold {
    pub enable_low_to_high: bool,
    pub enable_high_to_low: bool,
    pub threshold: f64,
}

/// Temperature event configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TempConfig {
    pub enable_critical: bool,
    pub threshold1: TempThreshold,
    pub threshold2: TempThreshold,
}

/// Fan speed mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FanSpeedMode {
    #[default]
    Default,
    Fixed,
    Table,
}

impl fmt::Display for FanSpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Fixed => write!(f, "Fixed"),
            Self::Table => write!(f, "Table"),
        }
    }
}

/// Units a fan speed is expressed in, as driver values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u32)]
pub enum FanSpeedUnits {
    Rpm = 0,
    #[default]
    Percent = 1,
}

/// Fan speed with units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FanSpeed {
    /// -1 means the speed is unknown
    pub speed: i32,
    pub units: FanSpeedUnits,
}

impl FanSpeed {
    pub fn percent(value: FanPercent) -> Self {
        Self {
            speed: value.as_percentage() as i32,
            units: FanSpeedUnits::Percent,
        }
    }
}

/// Fan speed percentage (0-100)
///
/// Validated on construction to ensure the value is within valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FanPercent(u8);

impl FanPercent {
    /// Maximum valid fan speed
    pub const MAX: u8 = 100;

    /// Create a new FanPercent with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFanSpeed` if value > 100
    pub fn new(value: u8) -> Result<Self, DomainError> {
        if value > Self::MAX {
            return Err(DomainError::InvalidFanSpeed(value));
        }
        Ok(Self(value))
    }

    #[inline]
    pub const fn as_percentage(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for FanPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Fan properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FanProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    /// Supported modes, as driver flags
    pub supported_modes: u32,
    /// Supported units, as driver flags
    pub supported_units: u32,
    /// Maximum RPM (-1 if unknown)
    pub max_rpm: i32,
    /// Maximum points in a speed table (-1 if unknown)
    pub max_points: i32,
}

/// One point of a fan speed table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FanTempSpeed {
    /// Degrees Celsius
    pub temperature: u32,
    pub speed: FanSpeed,
}

/// Fan configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FanConfig {
    pub mode: FanSpeedMode,
    pub speed_fixed: FanSpeed,
    pub speed_table: Vec<FanTempSpeed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_percent_validation() {
        assert!(FanPercent::new(100).is_ok());
        assert_eq!(
            FanPercent::new(150).unwrap_err(),
            DomainError::InvalidFanSpeed(150)
        );
    }

    #[test]
    fn test_fan_speed_percent() {
        let speed = FanSpeed::percent(FanPercent::new(75).unwrap());
        assert_eq!(speed.speed, 75);
        assert_eq!(speed.units, FanSpeedUnits::Percent);
    }

    #[test]
    fn test_sensor_display() {
        assert_eq!(TempSensor::Gpu.to_string(), "GPU");
        assert_eq!(TempSensor::MemoryMin.to_string(), "Memory (min)");
    }
}
