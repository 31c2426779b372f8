//! Engine, scheduler, standby, diagnostics, firmware and LED types

use serde::Serialize;
use std::fmt;

/// Engine group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EngineGroup {
    #[default]
    All,
    ComputeAll,
    MediaAll,
    CopyAll,
    ComputeSingle,
    RenderSingle,
    MediaDecodeSingle,
    MediaEncodeSingle,
    CopySingle,
    RenderAll,
}

/// Engine group properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngineProperties {
    pub group: EngineGroup,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
}

/// Engine activity counter sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EngineStats {
    /// Microseconds the engine was busy
    pub active_time: u64,
    /// Microseconds
    pub timestamp: u64,
}

impl EngineStats {
    /// Busy percentage between this sample and a later one
    pub fn utilization_percent(&self, later: &EngineStats) -> Option<f64> {
        if later.timestamp <= self.timestamp {
            return None;
        }
        let active = later.active_time.checked_sub(self.active_time)? as f64;
        let elapsed = (later.timestamp - self.timestamp) as f64;
        Some((active * 100.0 / elapsed).min(100.0))
    }
}

/// Scheduler mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u32)]
pub enum SchedMode {
    #[default]
    Timeout = 0,
    Timeslice = 1,
    Exclusive = 2,
    ComputeUnitDebug = 3,
}

impl SchedMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Timeout),
            1 => Some(Self::Timeslice),
            2 => Some(Self::Exclusive),
            3 => Some(Self::ComputeUnitDebug),
            _ => None,
        }
    }
}

impl fmt::Display for SchedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Timeout"),
            Self::Timeslice => write!(f, "Timeslice"),
            Self::Exclusive => write!(f, "Exclusive"),
            Self::ComputeUnitDebug => write!(f, "Compute unit debug"),
        }
    }
}

/// Scheduler controller properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    /// Engine types controlled, as driver flags
    pub engines: u32,
    /// Supported modes, as driver flags
    pub supported_modes: u32,
}

/// Timeout mode parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedTimeoutProperties {
    /// Microseconds to wait for a workload to yield
    pub watchdog_timeout: u64,
}

/// Standby domain type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StandbyType {
    #[default]
    Global,
}

/// Standby domain properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StandbyProperties {
    pub standby_type: StandbyType,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
}

/// Standby promotion mode, as driver values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u32)]
pub enum StandbyPromoMode {
    #[default]
    Default = 0,
    Never = 1,
}

impl StandbyPromoMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Default),
            1 => Some(Self::Never),
            _ => None,
        }
    }
}

impl fmt::Display for StandbyPromoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Never => write!(f, "Never"),
        }
    }
}

/// Diagnostics suite properties
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub name: String,
    pub have_tests: bool,
}

/// A single diagnostics test
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsTest {
    pub index: u32,
    pub name: String,
}

/// Outcome of a diagnostics run, as driver values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u32)]
pub enum DiagnosticsResult {
    #[default]
    NoErrors = 0,
    Abort = 1,
    FailCantRepair = 2,
    RebootForRepair = 3,
}

impl DiagnosticsResult {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::NoErrors),
            1 => Some(Self::Abort),
            2 => Some(Self::FailCantRepair),
            3 => Some(Self::RebootForRepair),
            _ => None,
        }
    }
}

/// Firmware properties
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FirmwareProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    pub name: String,
    pub version: String,
}

/// LED properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedProperties {
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub can_control: bool,
    pub have_rgb: bool,
}

/// LED colour, each channel 0.0-1.0 (-1 if unknown)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LedColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

/// LED state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LedState {
    pub is_on: bool,
    pub color: LedColor,
}
