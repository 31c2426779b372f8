//! Info command implementation
//!
//! Displays everything the selected device reports.

use crate::cli::args::OutputFormat;
use crate::cli::output::print_output;
use crate::commands::target;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::services::Inventory;
use crate::sysman::SysmanGate;

/// Execute the info command
pub fn run_info(gate: &SysmanGate, format: OutputFormat, device: &DeviceConfig) -> Result<()> {
    let handle = target(gate, device)?;
    let summary = Inventory::new(gate).summarize(handle, device.driver, device.device)?;
    print_output(&summary, format)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::error::AppError;
    use crate::mock::MockSysman;

    #[test]
    fn test_info_runs() {
        let gate = testing::gate(MockSysman::new());
        assert!(run_info(&gate, OutputFormat::Compact, &DeviceConfig::default()).is_ok());
    }

    #[test]
    fn test_info_torn_down() {
        let gate = testing::gate(MockSysman::new());
        gate.teardown();
        assert!(matches!(
            run_info(&gate, OutputFormat::Table, &DeviceConfig::default()),
            Err(AppError::Sysman(crate::error::ZesError::Uninitialized))
        ));
    }
}
