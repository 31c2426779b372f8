//! Fabric port and virtual function types

use super::device::{DeviceUuid, PciAddress};
use super::engine::EngineGroup;
use super::memory::MemLocation;
use serde::Serialize;
use std::fmt;

/// Unique fabric port identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FabricPortId {
    pub fabric_id: u32,
    pub attach_id: u32,
    pub port_number: u8,
}

impl fmt::Display for FabricPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.fabric_id, self.attach_id, self.port_number)
    }
}

/// Fabric port properties
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FabricPortProperties {
    pub model: String,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
    pub port_id: FabricPortId,
    /// Maximum receive speed in bits per second
    pub max_rx_speed: i64,
    pub max_tx_speed: i64,
}

/// Fabric port configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FabricPortConfig {
    pub enabled: bool,
    pub beaconing: bool,
}

/// Fabric port status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FabricPortStatus {
    #[default]
    Unknown,
    Healthy,
    Degraded,
    Failed,
    Disabled,
}

/// Fabric port state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FabricPortState {
    pub status: FabricPortStatus,
    /// Remote end, if connected
    pub remote_port_id: Option<FabricPortId>,
}

/// Fabric port throughput counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FabricPortThroughput {
    /// Microseconds
    pub timestamp: u64,
    /// Bytes received
    pub rx_counter: u64,
    /// Bytes transmitted
    pub tx_counter: u64,
}

/// Virtual function properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VfProperties {
    pub address: PciAddress,
    pub uuid: DeviceUuid,
    /// Utilization info the VF reports, as driver flags
    pub flags: u32,
}

/// Virtual function memory utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VfMemoryUtil {
    pub location: MemLocation,
    /// Free bytes
    pub free: u64,
}

/// Virtual function engine utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VfEngineUtil {
    pub group: EngineGroup,
    pub active_counter_value: u64,
    pub sampling_counter_value: u64,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_id_display() {
        let id = FabricPortId {
            fabric_id: 1,
            attach_id: 2,
            port_number: 3,
        };
        assert_eq!(id.to_string(), "1.2.3");
    }
}
