//! Temperature command implementation

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, TemperatureStatus};
use crate::commands::target;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::services::Inventory;
use crate::sysman::SysmanGate;

/// Execute the temp command
pub fn run_temp(gate: &SysmanGate, format: OutputFormat, device: &DeviceConfig) -> Result<()> {
    print_output(&temperature_status(gate, device)?, format)?;
    Ok(())
}

fn temperature_status(gate: &SysmanGate, device: &DeviceConfig) -> Result<TemperatureStatus> {
    let handle = target(gate, device)?;
    let inventory = Inventory::new(gate);
    let name = inventory
        .summarize(handle, device.driver, device.device)?
        .name();

    Ok(TemperatureStatus {
        device_name: name,
        sensors: inventory.temperatures(handle)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::mock::{self, MockSysman};

    #[test]
    fn test_temperature_status() {
        let sysman = MockSysman::new();
        sysman.set_temperature(mock::TEMP_GPU, 71.5);
        let gate = testing::gate(sysman);

        let status = temperature_status(&gate, &DeviceConfig::default()).unwrap();
        assert_eq!(status.sensors.len(), 2);
        assert_eq!(status.sensors[0].celsius, Some(71.5));
    }

    #[test]
    fn test_unreadable_sensor() {
        let gate = testing::gate(MockSysman::new().without("temperature_get_state"));
        let status = temperature_status(&gate, &DeviceConfig::default()).unwrap();
        assert!(status.sensors.iter().all(|s| s.celsius.is_none()));
    }
}
