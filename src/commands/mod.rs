//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command
//! against an initialized [`SysmanGate`].

pub mod caps;
pub mod fan;
pub mod freq;
pub mod info;
pub mod list;
pub mod power;
pub mod reset;
pub mod standby;
pub mod temp;

pub use caps::run_caps;
pub use fan::run_fan;
pub use freq::run_freq;
pub use info::run_info;
pub use list::run_list;
pub use power::run_power;
pub use reset::run_reset;
pub use standby::run_standby;
pub use temp::run_temp;

use crate::config::{Config, DeviceConfig};
use crate::domain::DeviceHandle;
use crate::error::Result;
use crate::services::Inventory;
use crate::sysman::{InitFlags, SysmanGate};

/// Initialize the process-wide gate for `config`
///
/// With `mock` set (and the `mock` feature built in) the gate is backed by
/// the simulated device instead of the Level Zero loader.
pub fn open_gate(config: &Config, mock: bool) -> Result<&'static SysmanGate> {
    let gate = SysmanGate::global_with(|| make_gate(config, mock));
    gate.init(InitFlags::NONE)?;
    Ok(gate)
}

#[cfg(feature = "mock")]
fn make_gate(config: &Config, mock: bool) -> SysmanGate {
    use crate::mock::{MockLoader, MockSysman};
    use crate::sysman::OPERATIONS;

    if mock {
        log::info!("Using simulated sysman backend");
        let mut sysman = MockSysman::new();
        for op in &config.loader.disabled_operations {
            if let Some(&(_, name)) = OPERATIONS.iter().find(|(_, o)| *o == op.as_str()) {
                sysman = sysman.without(name);
            }
        }
        return SysmanGate::new(MockLoader::new(sysman));
    }
    SysmanGate::new(config.loader.to_loader())
}

#[cfg(not(feature = "mock"))]
fn make_gate(config: &Config, _mock: bool) -> SysmanGate {
    SysmanGate::new(config.loader.to_loader())
}

/// Resolve the configured device selection to a handle
pub(crate) fn target(gate: &SysmanGate, device: &DeviceConfig) -> Result<DeviceHandle> {
    let handle = Inventory::new(gate).select(device.driver, device.device)?;
    log::debug!(
        "Selected device {} (driver {}, index {})",
        handle,
        device.driver,
        device.device
    );
    Ok(handle)
}

/// Pick one component, or all of them when no index is given
pub(crate) fn pick<T: Copy>(items: &[T], index: Option<usize>, what: &str) -> Result<Vec<T>> {
    match index {
        None => Ok(items.to_vec()),
        Some(i) => items.get(i).map(|item| vec![*item]).ok_or_else(|| {
            crate::error::DomainError::InvalidValue(format!(
                "{} index {} out of range ({} available)",
                what,
                i,
                items.len()
            ))
            .into()
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::mock::{MockLoader, MockSysman};
    use crate::sysman::{InitFlags, SysmanGate};

    pub fn gate(sysman: MockSysman) -> SysmanGate {
        let gate = SysmanGate::new(MockLoader::new(sysman));
        gate.init(InitFlags::NONE).unwrap();
        gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::mock::MockSysman;

    #[test]
    fn test_target_defaults_to_first_device() {
        let gate = testing::gate(MockSysman::new());
        let handle = target(&gate, &DeviceConfig::default()).unwrap();
        assert_eq!(handle, crate::mock::DEVICE);
    }

    #[test]
    fn test_target_out_of_range() {
        let gate = testing::gate(MockSysman::new());
        let device = DeviceConfig {
            driver: 0,
            device: 4,
        };
        assert!(matches!(
            target(&gate, &device),
            Err(AppError::DeviceNotFound { device: 4, .. })
        ));
    }

    #[test]
    fn test_pick() {
        let items = [1, 2, 3];
        assert_eq!(pick(&items, None, "fan").unwrap(), vec![1, 2, 3]);
        assert_eq!(pick(&items, Some(1), "fan").unwrap(), vec![2]);
        assert!(matches!(
            pick(&items, Some(3), "fan"),
            Err(AppError::Domain(_))
        ));
    }
}
