//! List command implementation
//!
//! Lists every device of every sysman driver.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, DeviceList, DeviceListEntry};
use crate::error::Result;
use crate::services::Inventory;
use crate::sysman::SysmanGate;

/// Execute the list command
pub fn run_list(gate: &SysmanGate, format: OutputFormat) -> Result<()> {
    print_output(&device_list(gate)?, format)?;
    Ok(())
}

fn device_list(gate: &SysmanGate) -> Result<DeviceList> {
    let inventory = Inventory::new(gate);
    let drivers = inventory.drivers()?;

    let mut devices = Vec::new();
    for (driver_index, driver) in drivers.iter().enumerate() {
        for (device_index, device) in inventory.devices(*driver)?.into_iter().enumerate() {
            let summary = inventory.summarize(device, driver_index as u32, device_index as u32)?;
            devices.push(DeviceListEntry {
                driver: summary.driver_index,
                device: summary.device_index,
                name: summary.name(),
                device_type: summary.properties.as_ref().map(|p| p.device_type),
                uuid: summary.properties.as_ref().map(|p| p.uuid.to_string()),
                pci: summary.pci.as_ref().map(|p| p.address.to_string()),
            });
        }
    }

    Ok(DeviceList {
        drivers: drivers.len(),
        devices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::mock::MockSysman;

    #[test]
    fn test_device_list() {
        let gate = testing::gate(MockSysman::new());
        let list = device_list(&gate).unwrap();

        assert_eq!(list.drivers, 1);
        assert_eq!(list.devices.len(), 1);
        assert_eq!(list.devices[0].name, "Mock Arc A770");
        assert!(list.devices[0].pci.is_some());
    }

    #[test]
    fn test_device_list_without_pci() {
        let gate = testing::gate(MockSysman::new().without("device_pci_get_properties"));
        let list = device_list(&gate).unwrap();
        assert!(list.devices[0].pci.is_none());
    }
}
