//! Driver and device domain types

use super::handles::DeviceHandle;
use serde::Serialize;
use std::fmt;

/// Device UUID (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct DeviceUuid(pub [u8; 16]);

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Driver extension entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DriverExtensionProperties {
    pub name: String,
    pub version: u32,
}

/// Device type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DeviceType {
    #[default]
    Gpu,
    Cpu,
    Fpga,
    Mca,
    Vpu,
}

/// Device properties
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeviceProperties {
    pub device_type: DeviceType,
    pub uuid: DeviceUuid,
    pub name: String,
    pub vendor_name: String,
    pub serial_number: String,
    pub driver_version: String,
    pub num_subdevices: u32,
}

/// Reasons a device needs a reset, as flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResetReasons {
    pub wedged: bool,
    pub repair: bool,
}

impl ResetReasons {
    pub fn any(&self) -> bool {
        self.wedged || self.repair
    }
}

/// Device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceState {
    pub reset_required: ResetReasons,
    pub repaired: bool,
}

/// PCI address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PciAddress {
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    pub function: u32,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

/// PCI properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PciProperties {
    pub address: PciAddress,
    pub max_gen: i32,
    pub max_width: i32,
}

/// Per-process device usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProcessUsage {
    pub process_id: u32,
    pub mem_size: u64,
    pub shared_size: u64,
    pub engines: u32,
}

/// Sub-device properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SubdeviceProperties {
    pub subdevice_id: u32,
    pub uuid: DeviceUuid,
}

/// Result of a by-UUID device lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceByUuid {
    pub device: DeviceHandle,
    pub on_subdevice: bool,
    pub subdevice_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_display() {
        let uuid = DeviceUuid([
            0x86, 0x80, 0xa0, 0x56, 0, 0, 0, 0, 0, 0, 0x03, 0, 0, 0, 0, 0x01,
        ]);
        assert_eq!(uuid.to_string(), "8680a056-0000-0000-0000-030000000001");
    }

    #[test]
    fn test_pci_address_display() {
        let addr = PciAddress {
            domain: 0,
            bus: 3,
            device: 0,
            function: 0,
        };
        assert_eq!(addr.to_string(), "0000:03:00.0");
    }

    #[test]
    fn test_reset_reasons() {
        assert!(!ResetReasons::default().any());
        assert!(ResetReasons {
            wedged: true,
            repair: false
        }
        .any());
    }
}
