//! Device inventory
//!
//! Walks drivers, devices and their components through the gate and
//! collects what each one reports. Operations the backend does not
//! implement show up as `None` or an empty list rather than an error.

use crate::domain::*;
use crate::error::{AppError, ZeResult, ZesError};
use crate::sysman::{enumerate, SysmanGate};

use serde::Serialize;
use std::thread;
use std::time::Duration;

/// Turn `UnsupportedFeature` into `None`
fn optional<T>(result: ZeResult<T>) -> ZeResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ZesError::UnsupportedFeature) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Enumeration that yields nothing when unsupported
fn components<T: Clone + Default>(
    call: impl FnMut(&mut u32, Option<&mut [T]>) -> ZeResult<()>,
) -> ZeResult<Vec<T>> {
    Ok(optional(enumerate(call))?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerDomainSummary {
    pub handle: PowerHandle,
    pub properties: Option<PowerProperties>,
    pub energy: Option<PowerEnergyCounter>,
    pub energy_threshold: Option<EnergyThreshold>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyDomainSummary {
    pub handle: FrequencyHandle,
    pub properties: Option<FreqProperties>,
    pub range: Option<FreqRange>,
    pub state: Option<FreqState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureSummary {
    pub handle: TemperatureHandle,
    pub properties: Option<TempProperties>,
    pub celsius: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FanSummary {
    pub handle: FanHandle,
    pub properties: Option<FanProperties>,
    pub config: Option<FanConfig>,
    pub speed_percent: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub handle: MemoryHandle,
    pub properties: Option<MemProperties>,
    pub state: Option<MemState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub handle: EngineHandle,
    pub properties: Option<EngineProperties>,
    pub activity: Option<EngineStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandbySummary {
    pub handle: StandbyHandle,
    pub properties: Option<StandbyProperties>,
    pub mode: Option<StandbyPromoMode>,
}

/// Everything a device reports about itself
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub driver_index: u32,
    pub device_index: u32,
    pub handle: DeviceHandle,
    pub properties: Option<DeviceProperties>,
    pub state: Option<DeviceState>,
    pub pci: Option<PciProperties>,
    pub power: Vec<PowerDomainSummary>,
    pub frequency: Vec<FrequencyDomainSummary>,
    pub temperature: Vec<TemperatureSummary>,
    pub fans: Vec<FanSummary>,
    pub memory: Vec<MemorySummary>,
    pub engines: Vec<EngineSummary>,
    pub standby: Vec<StandbySummary>,
}

impl DeviceSummary {
    /// Display name, falling back to the handle
    pub fn name(&self) -> String {
        self.properties
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("device {}", self.handle))
    }

    /// Hottest sensor reading
    pub fn max_temperature(&self) -> Option<f64> {
        self.temperature
            .iter()
            .filter_map(|t| t.celsius)
            .fold(None, |max, t| Some(max.map_or(t, |m: f64| m.max(t))))
    }
}

/// Read-only queries over the gate
pub struct Inventory<'a> {
    gate: &'a SysmanGate,
}

impl<'a> Inventory<'a> {
    pub fn new(gate: &'a SysmanGate) -> Self {
        Self { gate }
    }

    pub fn drivers(&self) -> ZeResult<Vec<DriverHandle>> {
        enumerate(|count, out| self.gate.driver_get(count, out))
    }

    pub fn devices(&self, driver: DriverHandle) -> ZeResult<Vec<DeviceHandle>> {
        enumerate(|count, out| self.gate.device_get(driver, count, out))
    }

    /// Device at a position in enumeration order
    pub fn select(&self, driver_index: u32, device_index: u32) -> Result<DeviceHandle, AppError> {
        let drivers = self.drivers()?;
        if drivers.is_empty() {
            return Err(AppError::NoDriversFound);
        }

        let not_found = AppError::DeviceNotFound {
            driver: driver_index,
            device: device_index,
        };
        let Some(&driver) = drivers.get(driver_index as usize) else {
            return Err(not_found);
        };
        let devices = self.devices(driver)?;
        devices.get(device_index as usize).copied().ok_or(not_found)
    }

    /// Summaries of every device of every driver
    pub fn summaries(&self) -> ZeResult<Vec<DeviceSummary>> {
        let mut out = Vec::new();
        for (driver_index, driver) in self.drivers()?.into_iter().enumerate() {
            for (device_index, device) in self.devices(driver)?.into_iter().enumerate() {
                out.push(self.summarize(device, driver_index as u32, device_index as u32)?);
            }
        }
        log::debug!("Collected {} device summaries", out.len());
        Ok(out)
    }

    pub fn summarize(
        &self,
        device: DeviceHandle,
        driver_index: u32,
        device_index: u32,
    ) -> ZeResult<DeviceSummary> {
        Ok(DeviceSummary {
            driver_index,
            device_index,
            handle: device,
            properties: optional(self.gate.device_get_properties(device))?,
            state: optional(self.gate.device_get_state(device))?,
            pci: optional(self.gate.device_pci_get_properties(device))?,
            power: self.power_domains(device)?,
            frequency: self.frequency_domains(device)?,
            temperature: self.temperatures(device)?,
            fans: self.fans(device)?,
            memory: self.memory_modules(device)?,
            engines: self.engines(device)?,
            standby: self.standby_domains(device)?,
        })
    }

    pub fn power_domains(&self, device: DeviceHandle) -> ZeResult<Vec<PowerDomainSummary>> {
        components(|count, out| self.gate.device_enum_power_domains(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(PowerDomainSummary {
                    handle,
                    properties: optional(self.gate.power_get_properties(handle))?,
                    energy: optional(self.gate.power_get_energy_counter(handle))?,
                    energy_threshold: optional(self.gate.power_get_energy_threshold(handle))?,
                })
            })
            .collect()
    }

    pub fn frequency_domains(
        &self,
        device: DeviceHandle,
    ) -> ZeResult<Vec<FrequencyDomainSummary>> {
        components(|count, out| self.gate.device_enum_frequency_domains(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(FrequencyDomainSummary {
                    handle,
                    properties: optional(self.gate.frequency_get_properties(handle))?,
                    range: optional(self.gate.frequency_get_range(handle))?,
                    state: optional(self.gate.frequency_get_state(handle))?,
                })
            })
            .collect()
    }

    pub fn temperatures(&self, device: DeviceHandle) -> ZeResult<Vec<TemperatureSummary>> {
        components(|count, out| self.gate.device_enum_temperature_sensors(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(TemperatureSummary {
                    handle,
                    properties: optional(self.gate.temperature_get_properties(handle))?,
                    celsius: optional(self.gate.temperature_get_state(handle))?,
                })
            })
            .collect()
    }

    pub fn fans(&self, device: DeviceHandle) -> ZeResult<Vec<FanSummary>> {
        components(|count, out| self.gate.device_enum_fans(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(FanSummary {
                    handle,
                    properties: optional(self.gate.fan_get_properties(handle))?,
                    config: optional(self.gate.fan_get_config(handle))?,
                    speed_percent: optional(
                        self.gate.fan_get_state(handle, FanSpeedUnits::Percent),
                    )?,
                })
            })
            .collect()
    }

    pub fn memory_modules(&self, device: DeviceHandle) -> ZeResult<Vec<MemorySummary>> {
        components(|count, out| self.gate.device_enum_memory_modules(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(MemorySummary {
                    handle,
                    properties: optional(self.gate.memory_get_properties(handle))?,
                    state: optional(self.gate.memory_get_state(handle))?,
                })
            })
            .collect()
    }

    pub fn engines(&self, device: DeviceHandle) -> ZeResult<Vec<EngineSummary>> {
        components(|count, out| self.gate.device_enum_engine_groups(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(EngineSummary {
                    handle,
                    properties: optional(self.gate.engine_get_properties(handle))?,
                    activity: optional(self.gate.engine_get_activity(handle))?,
                })
            })
            .collect()
    }

    pub fn standby_domains(&self, device: DeviceHandle) -> ZeResult<Vec<StandbySummary>> {
        components(|count, out| self.gate.device_enum_standby_domains(device, count, out))?
            .into_iter()
            .map(|handle| -> ZeResult<_> {
                Ok(StandbySummary {
                    handle,
                    properties: optional(self.gate.standby_get_properties(handle))?,
                    mode: optional(self.gate.standby_get_mode(handle))?,
                })
            })
            .collect()
    }

    /// Average power over `interval`, from two energy counter samples
    pub fn sample_power(&self, power: PowerHandle, interval: Duration) -> ZeResult<Option<f64>> {
        let first = self.gate.power_get_energy_counter(power)?;
        thread::sleep(interval);
        let second = self.gate.power_get_energy_counter(power)?;
        Ok(first.average_power_watts(&second))
    }

    /// Engine busy percentage over `interval`
    pub fn sample_engine(&self, engine: EngineHandle, interval: Duration) -> ZeResult<Option<f64>> {
        let first = self.gate.engine_get_activity(engine)?;
        thread::sleep(interval);
        let second = self.gate.engine_get_activity(engine)?;
        Ok(first.utilization_percent(&second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockLoader, MockSysman};
    use crate::sysman::InitFlags;

    fn gate(sysman: MockSysman) -> SysmanGate {
        let gate = SysmanGate::new(MockLoader::new(sysman));
        gate.init(InitFlags::NONE).unwrap();
        gate
    }

    #[test]
    fn test_select_first_device() {
        let gate = gate(MockSysman::new());
        let inventory = Inventory::new(&gate);

        assert_eq!(inventory.select(0, 0).unwrap(), mock::DEVICE);
        assert!(gate.is_sysman_in_use());
        assert!(matches!(
            inventory.select(0, 3),
            Err(AppError::DeviceNotFound {
                driver: 0,
                device: 3
            })
        ));
        assert!(matches!(
            inventory.select(1, 0),
            Err(AppError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn test_summary_collects_components() {
        let gate = gate(MockSysman::new());
        let summaries = Inventory::new(&gate).summaries().unwrap();

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.name(), "Mock Arc A770");
        assert_eq!(summary.frequency.len(), 2);
        assert_eq!(summary.temperature.len(), 2);
        assert_eq!(summary.max_temperature(), Some(52.0));
        assert_eq!(summary.fans[0].speed_percent, Some(35));
    }

    #[test]
    fn test_unsupported_becomes_none() {
        let gate = gate(
            MockSysman::new()
                .without("device_get_properties")
                .without("power_get_energy_threshold")
                .without("device_enum_fans"),
        );
        let summary = Inventory::new(&gate)
            .summarize(mock::DEVICE, 0, 0)
            .unwrap();

        assert!(summary.properties.is_none());
        assert!(summary.name().starts_with("device 0x"));
        assert!(summary.power[0].energy_threshold.is_none());
        assert!(summary.power[0].energy.is_some());
        assert!(summary.fans.is_empty());
    }

    #[test]
    fn test_other_errors_propagate() {
        let gate = gate(MockSysman::new());
        gate.teardown();

        assert_eq!(
            Inventory::new(&gate).summaries().unwrap_err(),
            ZesError::Uninitialized
        );
    }

    #[test]
    fn test_sample_power() {
        let gate = gate(MockSysman::new());
        let watts = Inventory::new(&gate)
            .sample_power(mock::POWER_CARD, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert!((watts - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_engine() {
        let gate = gate(MockSysman::new());
        let busy = Inventory::new(&gate)
            .sample_engine(mock::ENGINE_COMPUTE, Duration::ZERO)
            .unwrap();
        assert_eq!(busy, Some(75.0));
    }
}
