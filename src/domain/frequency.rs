//! Frequency, performance factor and overclock domain types

use crate::error::DomainError;
use serde::Serialize;
use std::fmt;

/// Clock domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FrequencyDomain {
    #[default]
    Gpu,
    Memory,
    Media,
}

impl fmt::Display for FrequencyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "GPU"),
            Self::Memory => write!(f, "Memory"),
            Self::Media => write!(f, "Media"),
        }
    }
}

/// Frequency domain properties
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FreqProperties {
    pub domain: FrequencyDomain,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    pub is_throttle_event_supported: bool,
    /// Hardware minimum in MHz
    pub min: f64,
    /// Hardware maximum in MHz
    pub max: f64,
}

/// Frequency range in MHz
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FreqRange {
    pub min: f64,
    pub max: f64,
}

impl FreqRange {
    /// Create a validated range
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFrequencyRange` if min > max
    pub fn new(min: f64, max: f64) -> Result<Self, DomainError> {
        if min > max {
            return Err(DomainError::InvalidFrequencyRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Whether a frequency lies within the range
    pub fn contains(&self, mhz: f64) -> bool {
        mhz >= self.min && mhz <= self.max
    }
}

impl fmt::Display for FreqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}-{:.0} MHz", self.min, self.max)
    }
}

/// Why the frequency is being throttled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThrottleReasons {
    pub ave_pwr_cap: bool,
    pub burst_pwr_cap: bool,
    pub current_limit: bool,
    pub thermal_limit: bool,
    pub psu_alert: bool,
    pub sw_range: bool,
    pub hw_range: bool,
}

impl ThrottleReasons {
    /// Decode the driver bitmask
    pub fn from_bits(bits: u32) -> Self {
        Self {
            ave_pwr_cap: bits & (1 << 0) != 0,
            burst_pwr_cap: bits & (1 << 1) != 0,
            current_limit: bits & (1 << 2) != 0,
            thermal_limit: bits & (1 << 3) != 0,
            psu_alert: bits & (1 << 4) != 0,
            sw_range: bits & (1 << 5) != 0,
            hw_range: bits & (1 << 6) != 0,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.ave_pwr_cap
            || self.burst_pwr_cap
            || self.current_limit
            || self.thermal_limit
            || self.psu_alert
            || self.sw_range
            || self.hw_range
    }
}

/// Current frequency state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FreqState {
    /// Voltage in volts (-1 if unknown)
    pub current_voltage: f64,
    pub request: f64,
    pub tdp: f64,
    pub efficient: f64,
    pub actual: f64,
    pub throttle_reasons: ThrottleReasons,
}

/// Accumulated throttle time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FreqThrottleTime {
    /// Microseconds spent throttled
    pub throttle_time: u64,
    pub timestamp: u64,
}

/// Performance factor domain properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PerfProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    /// Engine types affected, as driver flags
    pub engines: u32,
}

/// Performance factor in the range 0-100
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct PerformanceFactor(f64);

impl PerformanceFactor {
    pub const MAX: f64 = 100.0;

    /// # Errors
    /// Returns `DomainError::InvalidPerformanceFactor` outside 0-100
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !(0.0..=Self::MAX).contains(&value) {
            return Err(DomainError::InvalidPerformanceFactor(value));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Overclock domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OverclockDomain {
    #[default]
    Card,
    Package,
    GpuAll,
    GpuRenderCompute,
    GpuMedia,
    Vram,
}

/// Overclock control, as its driver bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum OverclockControl {
    VfCurve = 1,
    FreqOffset = 2,
    VmaxOffset = 4,
    Freq = 8,
    VoltLimit = 16,
    PowerSustainedLimit = 32,
    PowerBurstLimit = 64,
    PowerPeakLimit = 128,
    IccMax = 256,
    TjMax = 512,
}

/// Overclock domain properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OverclockDomainProperties {
    pub domain: OverclockDomain,
    /// Available controls, as driver flags
    pub available_controls: u32,
}

/// What must happen before a new overclock value takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PendingAction {
    #[default]
    None,
    ColdReset,
    WarmReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freq_range_validation() {
        assert!(FreqRange::new(300.0, 1500.0).is_ok());
        assert!(matches!(
            FreqRange::new(1500.0, 300.0),
            Err(DomainError::InvalidFrequencyRange { .. })
        ));
    }

    #[test]
    fn test_freq_range_contains() {
        let range = FreqRange::new(300.0, 1500.0).unwrap();
        assert!(range.contains(300.0));
        assert!(!range.contains(1600.0));
        assert_eq!(range.to_string(), "300-1500 MHz");
    }

    #[test]
    fn test_throttle_reasons_from_bits() {
        let reasons = ThrottleReasons::from_bits(0b1001);
        assert!(reasons.ave_pwr_cap);
        assert!(reasons.thermal_limit);
        assert!(!reasons.psu_alert);
        assert!(!ThrottleReasons::from_bits(0).is_throttled());
    }

    #[test]
    fn test_performance_factor_range() {
        assert!(PerformanceFactor::new(50.0).is_ok());
        assert!(PerformanceFactor::new(100.5).is_err());
        assert!(PerformanceFactor::new(-1.0).is_err());
    }
}
