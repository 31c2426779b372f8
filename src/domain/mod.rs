//! Domain models for zesctl
//!
//! Typed handles plus the property, state and counter types that flow
//! through the sysman dispatch gate. Values with a legal range are
//! validated on construction (fail-fast pattern).

pub mod device;
pub mod engine;
pub mod fabric;
pub mod frequency;
pub mod handles;
pub mod memory;
pub mod power;
pub mod thermal;

pub use device::{
    DeviceByUuid, DeviceProperties, DeviceState, DeviceType, DeviceUuid,
    DriverExtensionProperties, PciAddress, PciProperties, ProcessUsage, ResetReasons,
    SubdeviceProperties,
};
pub use engine::{
    DiagnosticsProperties, DiagnosticsResult, DiagnosticsTest, EngineGroup, EngineProperties,
    EngineStats, FirmwareProperties, LedColor, LedProperties, LedState, SchedMode,
    SchedProperties, SchedTimeoutProperties, StandbyPromoMode, StandbyProperties, StandbyType,
};
pub use fabric::{
    FabricPortConfig, FabricPortId, FabricPortProperties, FabricPortState, FabricPortStatus,
    FabricPortThroughput, VfEngineUtil, VfMemoryUtil, VfProperties,
};
pub use frequency::{
    FreqProperties, FreqRange, FreqState, FreqThrottleTime, FrequencyDomain, OverclockControl,
    OverclockDomain, OverclockDomainProperties, PendingAction, PerfProperties,
    PerformanceFactor, ThrottleReasons,
};
pub use handles::{
    DeviceHandle, DiagnosticsHandle, DriverHandle, EngineHandle, FabricPortHandle, FanHandle,
    FirmwareHandle, FrequencyHandle, Handle, LedHandle, MemoryHandle, OverclockHandle,
    PerfHandle, PowerHandle, PsuHandle, RasHandle, SchedulerHandle, StandbyHandle,
    TemperatureHandle, VfHandle,
};
pub use memory::{
    MemBandwidth, MemHealth, MemLocation, MemProperties, MemState, MemType, RasConfig,
    RasErrorCategoryExp, RasErrorType, RasProperties, RasState, RasStateExp,
};
pub use power::{
    EnergyThreshold, PowerEnergyCounter, PowerLevel, PowerLimitDescriptor, PowerProperties,
    PowerSource, PsuProperties, PsuState, PsuVoltageStatus,
};
pub use thermal::{
    FanConfig, FanPercent, FanProperties, FanSpeed, FanSpeedMode, FanSpeedUnits, FanTempSpeed,
    TempConfig, TempProperties, TempSensor, TempThreshold,
};
