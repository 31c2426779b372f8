//! Service layer over the sysman gate
//!
//! Services encapsulate device queries and validated setting changes so
//! command handlers stay thin.

pub mod control;
pub mod inventory;

pub use control::ControlService;
pub use inventory::{
    DeviceSummary, EngineSummary, FanSummary, FrequencyDomainSummary, Inventory, MemorySummary,
    PowerDomainSummary, StandbySummary, TemperatureSummary,
};
