//! Power command implementation
//!
//! Handles power status and energy threshold commands.

use crate::cli::args::{OutputFormat, PowerArgs, PowerCommands};
use crate::cli::output::{print_output, Message, PowerDomainStatus, PowerStatus};
use crate::commands::{pick, target};
use crate::config::DeviceConfig;
use crate::error::{Result, ZesError};
use crate::services::{ControlService, Inventory};
use crate::sysman::SysmanGate;

use std::time::Duration;

/// Execute power commands
pub fn run_power(
    gate: &SysmanGate,
    args: &PowerArgs,
    format: OutputFormat,
    device: &DeviceConfig,
    dry_run: bool,
) -> Result<()> {
    match &args.command {
        PowerCommands::Status { sample_ms } => {
            let status = power_status(gate, device, Duration::from_millis(*sample_ms))?;
            print_output(&status, format)?;
        }
        PowerCommands::Threshold { joules, domain } => {
            let message = set_threshold(gate, device, *joules, *domain, dry_run)?;
            print_output(&message, format)?;
        }
    }
    Ok(())
}

fn power_status(gate: &SysmanGate, device: &DeviceConfig, sample: Duration) -> Result<PowerStatus> {
    let handle = target(gate, device)?;
    let inventory = Inventory::new(gate);
    let summary = inventory.summarize(handle, device.driver, device.device)?;

    let mut domains = Vec::with_capacity(summary.power.len());
    for power in &summary.power {
        let average_watts = match inventory.sample_power(power.handle, sample) {
            Ok(watts) => watts,
            Err(ZesError::UnsupportedFeature) => None,
            Err(e) => return Err(e.into()),
        };
        domains.push(PowerDomainStatus {
            handle: power.handle,
            average_watts,
            default_limit_mw: power.properties.as_ref().map(|p| p.default_limit),
            min_limit_mw: power.properties.as_ref().map(|p| p.min_limit),
            max_limit_mw: power.properties.as_ref().map(|p| p.max_limit),
            energy_threshold_joules: power.energy_threshold.as_ref().map(|t| t.threshold),
        });
    }

    Ok(PowerStatus {
        device_name: summary.name(),
        domains,
    })
}

fn set_threshold(
    gate: &SysmanGate,
    device: &DeviceConfig,
    joules: f64,
    domain: usize,
    dry_run: bool,
) -> Result<Message> {
    let handle = target(gate, device)?;
    let domains: Vec<_> = Inventory::new(gate)
        .power_domains(handle)?
        .into_iter()
        .map(|p| p.handle)
        .collect();
    let power = pick(&domains, Some(domain), "power domain")?[0];

    let service = ControlService::new(gate, dry_run);
    let joules = service.set_energy_threshold(power, joules)?;

    let what = format!("set energy threshold of power domain {} to {} J", domain, joules);
    Ok(if service.is_dry_run() {
        Message::dry_run(what)
    } else {
        Message::ok(format!("Energy threshold of power domain {} set to {} J", domain, joules))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use crate::error::AppError;
    use crate::mock::MockSysman;

    #[test]
    fn test_power_status() {
        let gate = testing::gate(MockSysman::new());
        let status = power_status(&gate, &DeviceConfig::default(), Duration::ZERO).unwrap();

        assert_eq!(status.domains.len(), 1);
        let domain = &status.domains[0];
        assert!((domain.average_watts.unwrap() - 150.0).abs() < 1e-6);
        assert_eq!(domain.default_limit_mw, Some(190_000));
    }

    #[test]
    fn test_power_status_without_counter() {
        let gate = testing::gate(MockSysman::new().without("power_get_energy_counter"));
        let status = power_status(&gate, &DeviceConfig::default(), Duration::ZERO).unwrap();
        assert_eq!(status.domains[0].average_watts, None);
    }

    #[test]
    fn test_set_threshold() {
        let sysman = MockSysman::new();
        let gate = testing::gate(sysman.clone());

        let message = set_threshold(&gate, &DeviceConfig::default(), 2500.0, 0, false).unwrap();
        assert!(message.success);
        assert_eq!(sysman.energy_threshold().threshold, 2500.0);
    }

    #[test]
    fn test_set_threshold_bad_domain() {
        let gate = testing::gate(MockSysman::new());
        assert!(matches!(
            set_threshold(&gate, &DeviceConfig::default(), 2500.0, 2, false),
            Err(AppError::Domain(_))
        ));
    }
}
