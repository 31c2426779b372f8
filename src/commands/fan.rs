//! Fan command implementation
//!
//! Handles fan status, default mode and fixed speed commands.

use crate::cli::args::{FanArgs, FanCommands, OutputFormat};
use crate::cli::output::{print_output, FanStatus, Message};
use crate::commands::{pick, target};
use crate::config::DeviceConfig;
use crate::domain::FanHandle;
use crate::error::Result;
use crate::services::{ControlService, Inventory};
use crate::sysman::{enumerate, SysmanGate};

/// Execute fan commands
pub fn run_fan(
    gate: &SysmanGate,
    args: &FanArgs,
    format: OutputFormat,
    device: &DeviceConfig,
    dry_run: bool,
) -> Result<()> {
    match &args.command {
        FanCommands::Status => print_output(&fan_status(gate, device)?, format)?,
        FanCommands::Auto { fan_index } => {
            for message in fan_auto(gate, device, *fan_index, dry_run)? {
                print_output(&message, format)?;
            }
        }
        FanCommands::Speed { speed, fan_index } => {
            for message in fan_speed(gate, device, *speed, *fan_index, dry_run)? {
                print_output(&message, format)?;
            }
        }
    }
    Ok(())
}

fn fan_status(gate: &SysmanGate, device: &DeviceConfig) -> Result<FanStatus> {
    let handle = target(gate, device)?;
    let summary = Inventory::new(gate).summarize(handle, device.driver, device.device)?;
    Ok(FanStatus {
        device_name: summary.name(),
        fans: summary.fans,
    })
}

fn fans(gate: &SysmanGate, device: &DeviceConfig, index: Option<usize>) -> Result<Vec<FanHandle>> {
    let handle = target(gate, device)?;
    let all = enumerate(|count, out| gate.device_enum_fans(handle, count, out))?;
    pick(&all, index, "fan")
}

fn fan_auto(
    gate: &SysmanGate,
    device: &DeviceConfig,
    index: Option<usize>,
    dry_run: bool,
) -> Result<Vec<Message>> {
    let service = ControlService::new(gate, dry_run);
    let mut messages = Vec::new();

    for fan in fans(gate, device, index)? {
        service.set_fan_default(fan)?;
        messages.push(if service.is_dry_run() {
            Message::dry_run(format!("restore default mode on fan {}", fan))
        } else {
            Message::ok(format!("Fan {} returned to default mode", fan))
        });
    }

    Ok(messages)
}

fn fan_speed(
    gate: &SysmanGate,
    device: &DeviceConfig,
    speed: u8,
    index: Option<usize>,
    dry_run: bool,
) -> Result<Vec<Message>> {
    let service = ControlService::new(gate, dry_run);
    let mut messages = Vec::new();

    for fan in fans(gate, device, index)? {
        service.set_fan_speed(fan, speed)?;
        messages.push(if service.is_dry_run() {
            Message::dry_run(format!("set fan {} to {}%", fan, speed))
        } else {
            Message::ok(format!("Fan {} set to {}%", fan, speed))
        });
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::domain::FanSpeedMode;
    use crate::mock::MockSysman;

    #[test]
    fn test_fan_status() {
        let gate = testing::gate(MockSysman::new());
        let status = fan_status(&gate, &DeviceConfig::default()).unwrap();
        assert_eq!(status.fans.len(), 1);
        assert_eq!(status.fans[0].speed_percent, Some(35));
    }

    #[test]
    fn test_fan_speed_then_auto() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());
        let device = DeviceConfig::default();

        let messages = fan_speed(&gate, &device, 80, None, false).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(sysman.fan_config().mode, FanSpeedMode::Fixed);
        assert_eq!(sysman.fan_config().speed_fixed.speed, 80);

        fan_auto(&gate, &device, Some(0), false).unwrap();
        assert_eq!(sysman.fan_config().mode, FanSpeedMode::Default);
    }

    #[test]
    fn test_fan_speed_dry_run() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());

        let messages = fan_speed(&gate, &DeviceConfig::default(), 80, None, true).unwrap();
        assert!(messages[0].message.starts_with("[DRY RUN]"));
        assert_eq!(sysman.fan_config().mode, FanSpeedMode::Default);
    }

    #[test]
    fn test_no_fans() {
        let gate = testing::gate(MockSysman::new().without("device_enum_fans"));
        assert!(fan_speed(&gate, &DeviceConfig::default(), 50, None, false).is_err());
    }
}
