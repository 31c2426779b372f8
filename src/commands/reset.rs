//! Reset command implementation

use crate::cli::args::{OutputFormat, ResetArgs};
use crate::cli::output::{print_output, Message};
use crate::commands::target;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::services::ControlService;
use crate::sysman::SysmanGate;

/// Execute the reset command
pub fn run_reset(
    gate: &SysmanGate,
    args: &ResetArgs,
    format: OutputFormat,
    device: &DeviceConfig,
    dry_run: bool,
) -> Result<()> {
    print_output(&reset(gate, device, args.force, dry_run)?, format)?;
    Ok(())
}

fn reset(gate: &SysmanGate, device: &DeviceConfig, force: bool, dry_run: bool) -> Result<Message> {
    let handle = target(gate, device)?;
    let service = ControlService::new(gate, dry_run);
    service.reset_device(handle, force)?;

    Ok(if service.is_dry_run() {
        Message::dry_run(format!("reset device {}", handle))
    } else {
        Message::ok(format!("Device {} reset", handle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::mock::MockSysman;

    #[test]
    fn test_reset() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());

        reset(&gate, &DeviceConfig::default(), false, false).unwrap();
        reset(&gate, &DeviceConfig::default(), true, true).unwrap();
        assert_eq!(sysman.resets(), 1);
    }
}
