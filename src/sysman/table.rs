//! Capability table
//!
//! One operation list generates the per-category tables, the
//! [`CapabilityTable`] that groups them, the operation catalogue and the
//! forwarding methods on [`SysmanGate`]. A `None` entry means the backend
//! does not implement that operation.

use crate::domain::*;
use crate::error::ZeResult;
use crate::sysman::gate::SysmanGate;

use std::fmt;

macro_rules! capability_table {
    ($(
        $(#[$cat_meta:meta])*
        $cat:ident: $table:ident {
            $(
                $(#[$meta:meta])*
                fn $method:ident => $field:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty
                    $(, on_success = $hook:ident)?;
            )*
        }
    )*) => {
        $(
            $(#[$cat_meta])*
            #[derive(Default)]
            pub struct $table {
                $(
                    pub $field: Option<Box<dyn Fn($($ty),*) -> ZeResult<$ret> + Send + Sync>>,
                )*
            }

            impl $table {
                /// Operations this category implements
                pub fn supported(&self) -> Vec<&'static str> {
                    let mut names = Vec::new();
                    $(
                        if self.$field.is_some() {
                            names.push(stringify!($method));
                        }
                    )*
                    names
                }
            }
        )*

        /// Dispatch table installed by a [`Loader`](crate::sysman::Loader)
        #[derive(Default)]
        pub struct CapabilityTable {
            $(pub $cat: $table,)*
        }

        /// Every operation the gate exposes, as `(category, operation)`
        pub const OPERATIONS: &[(&str, &str)] = &[
            $($((stringify!($cat), stringify!($method)),)*)*
        ];

        impl CapabilityTable {
            /// Implemented operations, as `(category, operation)`
            pub fn supported(&self) -> Vec<(&'static str, &'static str)> {
                let mut out = Vec::new();
                $(
                    for name in self.$cat.supported() {
                        out.push((stringify!($cat), name));
                    }
                )*
                out
            }

            /// Clear the entry for `operation`; returns whether it was set
            pub fn remove(&mut self, operation: &str) -> bool {
                $($(
                    if operation == stringify!($method) {
                        return self.$cat.$field.take().is_some();
                    }
                )*)*
                false
            }
        }

        impl SysmanGate {
            $($(
                $(#[$meta])*
                pub fn $method(&self, $($arg: $ty),*) -> ZeResult<$ret> {
                    let table = self.admit()?;
                    let Some(op) = table.$cat.$field.as_deref() else {
                        return Err(self.missing(stringify!($method)));
                    };
                    let result = op($($arg),*);
                    $(
                        if result.is_ok() {
                            self.$hook();
                        }
                    )?
                    result
                }
            )*)*
        }
    };
}

capability_table! {
    /// Driver enumeration and extensions
    driver: DriverTable {
        /// Enumerate sysman drivers (count-then-fill)
        fn driver_get => get(count: &mut u32, drivers: Option<&mut [DriverHandle]>) -> (),
            on_success = mark_in_use;
        fn driver_get_extension_properties => get_extension_properties(
            driver: DriverHandle,
            count: &mut u32,
            properties: Option<&mut [DriverExtensionProperties]>,
        ) -> ();
        fn driver_get_extension_function_address => get_extension_function_address(
            driver: DriverHandle,
            name: &str,
        ) -> usize;
    }

    /// Device queries, reset and component enumeration
    device: DeviceTable {
        /// Enumerate devices of a driver (count-then-fill)
        fn device_get => get(
            driver: DriverHandle,
            count: &mut u32,
            devices: Option<&mut [DeviceHandle]>,
        ) -> ();
        fn device_get_properties => get_properties(device: DeviceHandle) -> DeviceProperties;
        fn device_get_state => get_state(device: DeviceHandle) -> DeviceState;
        /// Reset the device; `force` kills processes still using it
        fn device_reset => reset(device: DeviceHandle, force: bool) -> ();
        fn device_process_get_state => process_get_state(
            device: DeviceHandle,
            count: &mut u32,
            processes: Option<&mut [ProcessUsage]>,
        ) -> ();
        fn device_pci_get_properties => pci_get_properties(device: DeviceHandle) -> PciProperties;
        fn device_ecc_available => ecc_available(device: DeviceHandle) -> bool;
        fn device_get_card_power_domain => get_card_power_domain(device: DeviceHandle) -> PowerHandle;
        fn device_enum_diagnostic_test_suites => enum_diagnostic_test_suites(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [DiagnosticsHandle]>,
        ) -> ();
        fn device_enum_engine_groups => enum_engine_groups(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [EngineHandle]>,
        ) -> ();
        fn device_enum_fabric_ports => enum_fabric_ports(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [FabricPortHandle]>,
        ) -> ();
        fn device_enum_fans => enum_fans(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [FanHandle]>,
        ) -> ();
        fn device_enum_firmwares => enum_firmwares(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [FirmwareHandle]>,
        ) -> ();
        fn device_enum_frequency_domains => enum_frequency_domains(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [FrequencyHandle]>,
        ) -> ();
        fn device_enum_leds => enum_leds(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [LedHandle]>,
        ) -> ();
        fn device_enum_memory_modules => enum_memory_modules(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [MemoryHandle]>,
        ) -> ();
        fn device_enum_performance_factor_domains => enum_performance_factor_domains(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [PerfHandle]>,
        ) -> ();
        fn device_enum_power_domains => enum_power_domains(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [PowerHandle]>,
        ) -> ();
        fn device_enum_psus => enum_psus(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [PsuHandle]>,
        ) -> ();
        fn device_enum_ras_error_sets => enum_ras_error_sets(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [RasHandle]>,
        ) -> ();
        fn device_enum_schedulers => enum_schedulers(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [SchedulerHandle]>,
        ) -> ();
        fn device_enum_standby_domains => enum_standby_domains(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [StandbyHandle]>,
        ) -> ();
        fn device_enum_temperature_sensors => enum_temperature_sensors(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [TemperatureHandle]>,
        ) -> ();
    }

    /// Overclocking
    overclock: OverclockTable {
        fn device_enum_overclock_domains => enum_domains(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [OverclockHandle]>,
        ) -> ();
        /// Restore overclock settings, optionally to the shipped state
        fn device_reset_overclock_settings => reset_settings(
            device: DeviceHandle,
            on_shipped_state: bool,
        ) -> ();
        fn overclock_get_domain_properties => get_domain_properties(
            overclock: OverclockHandle,
        ) -> OverclockDomainProperties;
        fn overclock_get_control_current_value => get_control_current_value(
            overclock: OverclockHandle,
            control: OverclockControl,
        ) -> f64;
        fn overclock_set_control_user_value => set_control_user_value(
            overclock: OverclockHandle,
            control: OverclockControl,
            value: f64,
        ) -> PendingAction;
    }

    /// Diagnostics test suites
    diagnostics: DiagnosticsTable {
        fn diagnostics_get_properties => get_properties(
            diagnostics: DiagnosticsHandle,
        ) -> DiagnosticsProperties;
        fn diagnostics_get_tests => get_tests(
            diagnostics: DiagnosticsHandle,
            count: &mut u32,
            tests: Option<&mut [DiagnosticsTest]>,
        ) -> ();
        /// Run tests `start_index..=end_index`; may block for minutes
        fn diagnostics_run_tests => run_tests(
            diagnostics: DiagnosticsHandle,
            start_index: u32,
            end_index: u32,
        ) -> DiagnosticsResult;
    }

    /// Engine groups
    engine: EngineTable {
        fn engine_get_properties => get_properties(engine: EngineHandle) -> EngineProperties;
        fn engine_get_activity => get_activity(engine: EngineHandle) -> EngineStats;
    }

    /// Fabric ports
    fabric_port: FabricPortTable {
        fn fabric_port_get_properties => get_properties(
            port: FabricPortHandle,
        ) -> FabricPortProperties;
        fn fabric_port_get_config => get_config(port: FabricPortHandle) -> FabricPortConfig;
        fn fabric_port_set_config => set_config(
            port: FabricPortHandle,
            config: &FabricPortConfig,
        ) -> ();
        fn fabric_port_get_state => get_state(port: FabricPortHandle) -> FabricPortState;
        fn fabric_port_get_throughput => get_throughput(
            port: FabricPortHandle,
        ) -> FabricPortThroughput;
    }

    /// Fans
    fan: FanTable {
        fn fan_get_properties => get_properties(fan: FanHandle) -> FanProperties;
        fn fan_get_config => get_config(fan: FanHandle) -> FanConfig;
        /// Hand fan control back to the hardware
        fn fan_set_default_mode => set_default_mode(fan: FanHandle) -> ();
        fn fan_set_fixed_speed_mode => set_fixed_speed_mode(fan: FanHandle, speed: &FanSpeed) -> ();
        fn fan_get_state => get_state(fan: FanHandle, units: FanSpeedUnits) -> i32;
    }

    /// Firmware
    firmware: FirmwareTable {
        fn firmware_get_properties => get_properties(firmware: FirmwareHandle) -> FirmwareProperties;
        fn firmware_flash => flash(firmware: FirmwareHandle, image: &[u8]) -> ();
    }

    /// Frequency domains
    frequency: FrequencyTable {
        fn frequency_get_properties => get_properties(frequency: FrequencyHandle) -> FreqProperties;
        fn frequency_get_available_clocks => get_available_clocks(
            frequency: FrequencyHandle,
            count: &mut u32,
            clocks: Option<&mut [f64]>,
        ) -> ();
        fn frequency_get_range => get_range(frequency: FrequencyHandle) -> FreqRange;
        fn frequency_set_range => set_range(frequency: FrequencyHandle, range: &FreqRange) -> ();
        fn frequency_get_state => get_state(frequency: FrequencyHandle) -> FreqState;
        fn frequency_get_throttle_time => get_throttle_time(
            frequency: FrequencyHandle,
        ) -> FreqThrottleTime;
    }

    /// LEDs
    led: LedTable {
        fn led_get_properties => get_properties(led: LedHandle) -> LedProperties;
        fn led_get_state => get_state(led: LedHandle) -> LedState;
        fn led_set_state => set_state(led: LedHandle, enable: bool) -> ();
        fn led_set_color => set_color(led: LedHandle, color: &LedColor) -> ();
    }

    /// Memory modules
    memory: MemoryTable {
        fn memory_get_properties => get_properties(memory: MemoryHandle) -> MemProperties;
        fn memory_get_state => get_state(memory: MemoryHandle) -> MemState;
        fn memory_get_bandwidth => get_bandwidth(memory: MemoryHandle) -> MemBandwidth;
    }

    /// Performance factor domains
    performance_factor: PerformanceFactorTable {
        fn performance_factor_get_properties => get_properties(perf: PerfHandle) -> PerfProperties;
        fn performance_factor_get_config => get_config(perf: PerfHandle) -> f64;
        fn performance_factor_set_config => set_config(perf: PerfHandle, factor: f64) -> ();
    }

    /// Power domains
    power: PowerTable {
        fn power_get_properties => get_properties(power: PowerHandle) -> PowerProperties;
        fn power_get_energy_counter => get_energy_counter(power: PowerHandle) -> PowerEnergyCounter;
        fn power_get_limits_ext => get_limits_ext(
            power: PowerHandle,
            count: &mut u32,
            limits: Option<&mut [PowerLimitDescriptor]>,
        ) -> ();
        fn power_set_limits_ext => set_limits_ext(
            power: PowerHandle,
            limits: &[PowerLimitDescriptor],
        ) -> ();
        fn power_get_energy_threshold => get_energy_threshold(power: PowerHandle) -> EnergyThreshold;
        /// Set the energy threshold in joules
        fn power_set_energy_threshold => set_energy_threshold(
            power: PowerHandle,
            threshold: f64,
        ) -> ();
    }

    /// Power supplies
    psu: PsuTable {
        fn psu_get_properties => get_properties(psu: PsuHandle) -> PsuProperties;
        fn psu_get_state => get_state(psu: PsuHandle) -> PsuState;
    }

    /// RAS error sets
    ras: RasTable {
        fn ras_get_properties => get_properties(ras: RasHandle) -> RasProperties;
        fn ras_get_config => get_config(ras: RasHandle) -> RasConfig;
        fn ras_set_config => set_config(ras: RasHandle, config: &RasConfig) -> ();
        /// Read counters, optionally clearing them afterwards
        fn ras_get_state => get_state(ras: RasHandle, clear: bool) -> RasState;
    }

    /// Extended RAS interface
    ras_exp: RasExpTable {
        fn ras_get_state_exp => get_state_exp(
            ras: RasHandle,
            count: &mut u32,
            states: Option<&mut [RasStateExp]>,
        ) -> ();
        fn ras_clear_state_exp => clear_state_exp(
            ras: RasHandle,
            category: RasErrorCategoryExp,
        ) -> ();
    }

    /// Scheduler controllers
    scheduler: SchedulerTable {
        fn scheduler_get_properties => get_properties(scheduler: SchedulerHandle) -> SchedProperties;
        fn scheduler_get_current_mode => get_current_mode(scheduler: SchedulerHandle) -> SchedMode;
        /// Returns whether a driver reload is needed
        fn scheduler_set_timeout_mode => set_timeout_mode(
            scheduler: SchedulerHandle,
            properties: &SchedTimeoutProperties,
        ) -> bool;
        fn scheduler_set_exclusive_mode => set_exclusive_mode(scheduler: SchedulerHandle) -> bool;
    }

    /// Standby domains
    standby: StandbyTable {
        fn standby_get_properties => get_properties(standby: StandbyHandle) -> StandbyProperties;
        fn standby_get_mode => get_mode(standby: StandbyHandle) -> StandbyPromoMode;
        fn standby_set_mode => set_mode(standby: StandbyHandle, mode: StandbyPromoMode) -> ();
    }

    /// Temperature sensors
    temperature: TemperatureTable {
        fn temperature_get_properties => get_properties(
            temperature: TemperatureHandle,
        ) -> TempProperties;
        fn temperature_get_config => get_config(temperature: TemperatureHandle) -> TempConfig;
        fn temperature_set_config => set_config(
            temperature: TemperatureHandle,
            config: &TempConfig,
        ) -> ();
        /// Current reading in degrees Celsius
        fn temperature_get_state => get_state(temperature: TemperatureHandle) -> f64;
    }

    /// Experimental device queries
    device_exp: DeviceExpTable {
        fn device_get_sub_device_properties_exp => get_sub_device_properties_exp(
            device: DeviceHandle,
            count: &mut u32,
            properties: Option<&mut [SubdeviceProperties]>,
        ) -> ();
        fn device_enum_active_vf_exp => enum_active_vf_exp(
            device: DeviceHandle,
            count: &mut u32,
            handles: Option<&mut [VfHandle]>,
        ) -> ();
    }

    /// Experimental driver queries
    driver_exp: DriverExpTable {
        fn driver_get_device_by_uuid_exp => get_device_by_uuid_exp(
            driver: DriverHandle,
            uuid: &DeviceUuid,
        ) -> DeviceByUuid;
    }

    /// Experimental firmware queries
    firmware_exp: FirmwareExpTable {
        /// Flash progress in percent
        fn firmware_get_flash_progress => get_flash_progress(firmware: FirmwareHandle) -> u32;
    }

    /// Experimental virtual function management
    vf_management_exp: VfManagementExpTable {
        fn vf_management_get_vf_properties_exp => get_vf_properties_exp(vf: VfHandle) -> VfProperties;
        fn vf_management_get_vf_memory_util_exp => get_vf_memory_util_exp(
            vf: VfHandle,
            count: &mut u32,
            utils: Option<&mut [VfMemoryUtil]>,
        ) -> ();
        fn vf_management_get_vf_engine_util_exp => get_vf_engine_util_exp(
            vf: VfHandle,
            count: &mut u32,
            utils: Option<&mut [VfEngineUtil]>,
        ) -> ();
        fn vf_management_set_vf_telemetry_mode_exp => set_vf_telemetry_mode_exp(
            vf: VfHandle,
            flags: u32,
            enable: bool,
        ) -> ();
    }
}

impl CapabilityTable {
    /// Operations the backend leaves unimplemented, as `(category, operation)`
    pub fn missing(&self) -> Vec<(&'static str, &'static str)> {
        let supported = self.supported();
        OPERATIONS
            .iter()
            .copied()
            .filter(|op| !supported.contains(op))
            .collect()
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("supported", &self.supported().len())
            .field("total", &OPERATIONS.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_empty() {
        let table = CapabilityTable::default();
        assert!(table.supported().is_empty());
        assert_eq!(table.missing().len(), OPERATIONS.len());
    }

    #[test]
    fn test_supported_lists_filled_entries() {
        let mut table = CapabilityTable::default();
        table.temperature.get_state = Some(Box::new(|_t: TemperatureHandle| Ok(42.0)));
        table.fan.set_default_mode = Some(Box::new(|_f: FanHandle| Ok(())));

        let supported = table.supported();
        assert_eq!(supported.len(), 2);
        assert!(supported.contains(&("temperature", "temperature_get_state")));
        assert!(supported.contains(&("fan", "fan_set_default_mode")));
        assert!(!table.missing().contains(&("fan", "fan_set_default_mode")));
    }

    #[test]
    fn test_operation_catalogue_covers_every_category() {
        for category in [
            "driver",
            "device",
            "overclock",
            "diagnostics",
            "engine",
            "fabric_port",
            "fan",
            "firmware",
            "frequency",
            "led",
            "memory",
            "performance_factor",
            "power",
            "psu",
            "ras",
            "ras_exp",
            "scheduler",
            "standby",
            "temperature",
            "device_exp",
            "driver_exp",
            "firmware_exp",
            "vf_management_exp",
        ] {
            assert!(
                OPERATIONS.iter().any(|(c, _)| *c == category),
                "no operations for {}",
                category
            );
        }
    }

    #[test]
    fn test_remove_clears_entry() {
        let mut table = CapabilityTable::default();
        table.fan.set_default_mode = Some(Box::new(|_f: FanHandle| Ok(())));

        assert!(table.remove("fan_set_default_mode"));
        assert!(table.fan.set_default_mode.is_none());
        assert!(!table.remove("fan_set_default_mode"));
        assert!(!table.remove("no_such_operation"));
    }

    #[test]
    fn test_table_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CapabilityTable>();
    }
}
