//! Standby command implementation

use crate::cli::args::{OutputFormat, StandbyArgs, StandbyCommands};
use crate::cli::output::{print_output, Message, StandbyStatus};
use crate::commands::target;
use crate::config::DeviceConfig;
use crate::domain::StandbyPromoMode;
use crate::error::Result;
use crate::services::{ControlService, Inventory};
use crate::sysman::{enumerate, SysmanGate};

/// Execute standby commands
pub fn run_standby(
    gate: &SysmanGate,
    args: &StandbyArgs,
    format: OutputFormat,
    device: &DeviceConfig,
    dry_run: bool,
) -> Result<()> {
    match &args.command {
        StandbyCommands::Status => {
            let handle = target(gate, device)?;
            let summary = Inventory::new(gate).summarize(handle, device.driver, device.device)?;
            let status = StandbyStatus {
                device_name: summary.name(),
                domains: summary.standby,
            };
            print_output(&status, format)?;
        }
        StandbyCommands::Set { mode } => {
            for message in set_mode(gate, device, (*mode).into(), dry_run)? {
                print_output(&message, format)?;
            }
        }
    }
    Ok(())
}

fn set_mode(
    gate: &SysmanGate,
    device: &DeviceConfig,
    mode: StandbyPromoMode,
    dry_run: bool,
) -> Result<Vec<Message>> {
    let handle = target(gate, device)?;
    let domains = enumerate(|count, out| gate.device_enum_standby_domains(handle, count, out))?;
    let service = ControlService::new(gate, dry_run);

    let mut messages = Vec::with_capacity(domains.len());
    for standby in domains {
        service.set_standby_mode(standby, mode)?;
        messages.push(if service.is_dry_run() {
            Message::dry_run(format!("set standby mode of {} to {}", standby, mode))
        } else {
            Message::ok(format!("Standby mode of {} set to {}", standby, mode))
        });
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::mock::MockSysman;

    #[test]
    fn test_set_mode() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());

        let messages =
            set_mode(&gate, &DeviceConfig::default(), StandbyPromoMode::Never, false).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(sysman.standby_mode(), StandbyPromoMode::Never);
    }

    #[test]
    fn test_set_mode_unsupported() {
        let gate = testing::gate(MockSysman::new().without("standby_set_mode"));
        assert!(set_mode(&gate, &DeviceConfig::default(), StandbyPromoMode::Never, false).is_err());
    }
}
