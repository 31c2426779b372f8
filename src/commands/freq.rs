//! Frequency command implementation
//!
//! Handles frequency status, available clocks and range commands.

use crate::cli::args::{FreqArgs, FreqCommands, OutputFormat};
use crate::cli::output::{print_output, ClockList, FrequencyStatus, Message};
use crate::commands::{pick, target};
use crate::config::DeviceConfig;
use crate::domain::FrequencyHandle;
use crate::error::Result;
use crate::services::{ControlService, Inventory};
use crate::sysman::{enumerate, SysmanGate};

/// Execute frequency commands
pub fn run_freq(
    gate: &SysmanGate,
    args: &FreqArgs,
    format: OutputFormat,
    device: &DeviceConfig,
    dry_run: bool,
) -> Result<()> {
    match &args.command {
        FreqCommands::Status => {
            let handle = target(gate, device)?;
            let summary = Inventory::new(gate).summarize(handle, device.driver, device.device)?;
            let status = FrequencyStatus {
                device_name: summary.name(),
                domains: summary.frequency,
            };
            print_output(&status, format)?;
        }
        FreqCommands::Clocks { domain } => {
            print_output(&clocks(gate, device, *domain)?, format)?;
        }
        FreqCommands::Range { min, max, domain } => {
            let message = set_range(gate, device, *min, *max, *domain, dry_run)?;
            print_output(&message, format)?;
        }
    }
    Ok(())
}

fn domain_handle(gate: &SysmanGate, device: &DeviceConfig, domain: usize) -> Result<FrequencyHandle> {
    let handle = target(gate, device)?;
    let domains = enumerate(|count, out| gate.device_enum_frequency_domains(handle, count, out))?;
    Ok(pick(&domains, Some(domain), "frequency domain")?[0])
}

fn clocks(gate: &SysmanGate, device: &DeviceConfig, domain: usize) -> Result<ClockList> {
    let frequency = domain_handle(gate, device, domain)?;
    let clocks_mhz =
        enumerate(|count, out| gate.frequency_get_available_clocks(frequency, count, out))?;
    Ok(ClockList { domain, clocks_mhz })
}

fn set_range(
    gate: &SysmanGate,
    device: &DeviceConfig,
    min: f64,
    max: f64,
    domain: usize,
    dry_run: bool,
) -> Result<Message> {
    let frequency = domain_handle(gate, device, domain)?;
    let service = ControlService::new(gate, dry_run);
    let range = service.set_frequency_range(frequency, min, max)?;

    Ok(if service.is_dry_run() {
        Message::dry_run(format!("set frequency domain {} to {}", domain, range))
    } else {
        Message::ok(format!("Frequency domain {} set to {}", domain, range))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::error::{AppError, ZesError};
    use crate::mock::{self, MockSysman};

    #[test]
    fn test_clocks() {
        let gate = testing::gate(MockSysman::new());
        let list = clocks(&gate, &DeviceConfig::default(), 0).unwrap();

        assert_eq!(list.clocks_mhz.first(), Some(&300.0));
        assert_eq!(list.clocks_mhz.last(), Some(&2400.0));
        assert_eq!(clocks(&gate, &DeviceConfig::default(), 1).unwrap().clocks_mhz.len(), 1);
    }

    #[test]
    fn test_set_range() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());

        set_range(&gate, &DeviceConfig::default(), 500.0, 1500.0, 0, false).unwrap();
        let range = sysman.freq_range(mock::FREQ_GPU).unwrap();
        assert_eq!((range.min, range.max), (500.0, 1500.0));
    }

    #[test]
    fn test_set_range_fixed_domain() {
        let gate = testing::gate(MockSysman::new());
        assert!(matches!(
            set_range(&gate, &DeviceConfig::default(), 900.0, 900.0, 1, false),
            Err(AppError::Sysman(ZesError::UnsupportedFeature))
        ));
    }

    #[test]
    fn test_set_range_dry_run() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());
        let before = sysman.freq_range(mock::FREQ_GPU);

        let message = set_range(&gate, &DeviceConfig::default(), 500.0, 1500.0, 0, true).unwrap();
        assert!(message.message.starts_with("[DRY RUN]"));
        assert_eq!(sysman.freq_range(mock::FREQ_GPU), before);
    }
}
