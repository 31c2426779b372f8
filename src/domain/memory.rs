//! Memory and RAS domain types
//!
//! Memory modules, bandwidth counters and reliability/availability/
//! serviceability (RAS) error tracking.

use serde::Serialize;
use std::fmt;

/// Memory technology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MemType {
    #[default]
    Hbm,
    Ddr,
    Lpddr,
    Gddr6,
    Gddr6x,
    Sram,
}

/// Where the memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MemLocation {
    System,
    #[default]
    Device,
}

/// Memory health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MemHealth {
    #[default]
    Unknown,
    Ok,
    Degraded,
    Critical,
    Replace,
}

impl fmt::Display for MemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Ok => write!(f, "OK"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Critical => write!(f, "Critical"),
            Self::Replace => write!(f, "Replace"),
        }
    }
}

/// Memory module properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemProperties {
    pub mem_type: MemType,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub location: MemLocation,
    /// Physical size in bytes (0 if unknown)
    pub physical_size: u64,
    pub bus_width: i32,
    pub num_channels: i32,
}

/// Memory module state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemState {
    pub health: MemHealth,
    /// Free bytes
    pub free: u64,
    /// Total allocatable bytes
    pub size: u64,
}

impl MemState {
    pub fn used(&self) -> u64 {
        self.size.saturating_sub(self.free)
    }
}

/// Memory bandwidth counter sample
///
/// # Examples
///
/// ```
/// use zesctl::domain::MemBandwidth;
///
/// let a = MemBandwidth { read_counter: 0, write_counter: 0, max_bandwidth: 1000, timestamp: 0 };
/// let b = MemBandwidth { read_counter: 300, write_counter: 200, max_bandwidth: 1000, timestamp: 1_000_000 };
///
/// assert_eq!(a.utilization_percent(&b), Some(50.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemBandwidth {
    /// Bytes read
    pub read_counter: u64,
    /// Bytes written
    pub write_counter: u64,
    /// Bytes per second
    pub max_bandwidth: u64,
    /// Microseconds
    pub timestamp: u64,
}

impl MemBandwidth {
    /// Bandwidth utilization between this sample and a later one
    pub fn utilization_percent(&self, later: &MemBandwidth) -> Option<f64> {
        if later.timestamp <= self.timestamp || later.max_bandwidth == 0 {
            return None;
        }
        let bytes = later.read_counter.checked_sub(self.read_counter)?
            + later.write_counter.checked_sub(self.write_counter)?;
        let elapsed = (later.timestamp - self.timestamp) as f64;
        Some(bytes as f64 * 1_000_000.0 * 100.0 / (later.max_bandwidth as f64 * elapsed))
    }
}

/// RAS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RasErrorType {
    #[default]
    Correctable,
    Uncorrectable,
}

/// RAS error set properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RasProperties {
    pub error_type: RasErrorType,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
}

/// Error counters per category
///
/// Order: reset, programming, driver, compute, non-compute, cache, display.
pub type RasCategoryCounters = [u64; 7];

/// RAS event thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RasConfig {
    pub total_threshold: u64,
    pub detailed_thresholds: RasCategoryCounters,
}

/// RAS error counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RasState {
    pub category: RasCategoryCounters,
}

impl RasState {
    pub fn total(&self) -> u64 {
        self.category.iter().sum()
    }
}

/// Error categories of the extended RAS interface, as driver values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum RasErrorCategoryExp {
    Reset = 0,
    ProgrammingErrors = 1,
    DriverErrors = 2,
    ComputeErrors = 3,
    NonComputeErrors = 4,
    CacheErrors = 5,
    DisplayErrors = 6,
    MemoryErrors = 7,
    ScaleErrors = 8,
    L3FabricErrors = 9,
}

/// One counter of the extended RAS interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RasStateExp {
    pub category: RasErrorCategoryExp,
    pub error_counter: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_state_used() {
        let state = MemState {
            health: MemHealth::Ok,
            free: 6,
            size: 16,
        };
        assert_eq!(state.used(), 10);
    }

    #[test]
    fn test_bandwidth_counter_wrap_is_none() {
        let a = MemBandwidth {
            read_counter: 10,
            write_counter: 0,
            max_bandwidth: 100,
            timestamp: 0,
        };
        let b = MemBandwidth {
            read_counter: 5,
            write_counter: 0,
            max_bandwidth: 100,
            timestamp: 10,
        };
        assert_eq!(a.utilization_percent(&b), None);
    }

    #[test]
    fn test_ras_total() {
        let state = RasState {
            category: [1, 0, 2, 0, 0, 3, 0],
        };
        assert_eq!(state.total(), 6);
    }
}
