//! Mock sysman backend for testing
//!
//! Simulates one driver with one discrete GPU so the gate, services and
//! CLI can be exercised without a Level Zero driver. Setters really
//! change the simulated state and counters advance on every read.

use crate::domain::*;
use crate::error::{ZeResult, ZesError};
use crate::sysman::{CapabilityTable, InitFlags, Loader};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DRIVER: DriverHandle = DriverHandle::new(0xd000);
pub const DEVICE: DeviceHandle = DeviceHandle::new(0x1000);
pub const POWER_CARD: PowerHandle = PowerHandle::new(0x2000);
pub const FREQ_GPU: FrequencyHandle = FrequencyHandle::new(0x3000);
pub const FREQ_MEMORY: FrequencyHandle = FrequencyHandle::new(0x3001);
pub const TEMP_GPU: TemperatureHandle = TemperatureHandle::new(0x4000);
pub const TEMP_MEMORY: TemperatureHandle = TemperatureHandle::new(0x4001);
pub const FAN: FanHandle = FanHandle::new(0x5000);
pub const ENGINE_COMPUTE: EngineHandle = EngineHandle::new(0x6000);
pub const MEMORY: MemoryHandle = MemoryHandle::new(0x7000);
pub const STANDBY: StandbyHandle = StandbyHandle::new(0x8000);
pub const RAS_CORRECTABLE: RasHandle = RasHandle::new(0x9000);
pub const PERF: PerfHandle = PerfHandle::new(0xa000);
pub const SCHEDULER: SchedulerHandle = SchedulerHandle::new(0xb000);
pub const FIRMWARE: FirmwareHandle = FirmwareHandle::new(0xc000);

/// UUID reported by the mock device
pub const DEVICE_UUID: DeviceUuid = DeviceUuid([
    0x86, 0x80, 0xa0, 0x56, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01,
]);

const TICK_US: u64 = 100_000;
const GPU_FREQ_LIMITS: (f64, f64) = (300.0, 2400.0);
const MEMORY_FREQ_LIMITS: (f64, f64) = (1000.0, 1000.0);
const FAN_MAX_RPM: i32 = 3000;

#[derive(Debug)]
struct MockState {
    timestamp: u64,
    energy: u64,
    energy_threshold: EnergyThreshold,
    power_limit: PowerLimitDescriptor,
    freq_ranges: HashMap<FrequencyHandle, FreqRange>,
    temperatures: HashMap<TemperatureHandle, f64>,
    fan: FanConfig,
    engine_active: u64,
    mem_read: u64,
    mem_write: u64,
    standby: StandbyPromoMode,
    perf_factor: f64,
    ras: RasState,
    sched_mode: SchedMode,
    resets: u32,
    flash_progress: u32,
}

impl Default for MockState {
    fn default() -> Self {
        let mut freq_ranges = HashMap::new();
        freq_ranges.insert(
            FREQ_GPU,
            FreqRange {
                min: GPU_FREQ_LIMITS.0,
                max: GPU_FREQ_LIMITS.1,
            },
        );
        freq_ranges.insert(
            FREQ_MEMORY,
            FreqRange {
                min: MEMORY_FREQ_LIMITS.0,
                max: MEMORY_FREQ_LIMITS.1,
            },
        );

        let mut temperatures = HashMap::new();
        temperatures.insert(TEMP_GPU, 45.0);
        temperatures.insert(TEMP_MEMORY, 52.0);

        let mut ras = RasState::default();
        ras.category[5] = 2;

        Self {
            timestamp: 1_000_000,
            energy: 0,
            energy_threshold: EnergyThreshold::default(),
            power_limit: PowerLimitDescriptor {
                level: PowerLevel::Sustained,
                source: PowerSource::Any,
                enabled: true,
                limit: 150_000,
                interval: 28_000,
            },
            freq_ranges,
            temperatures,
            fan: FanConfig::default(),
            engine_active: 0,
            mem_read: 0,
            mem_write: 0,
            standby: StandbyPromoMode::Default,
            perf_factor: 50.0,
            ras,
            sched_mode: SchedMode::Timeslice,
            resets: 0,
            flash_progress: 0,
        }
    }
}

impl MockState {
    /// Advance the simulated clock and counters by one sample period
    fn tick(&mut self) -> u64 {
        self.timestamp += TICK_US;
        self.energy += 15_000_000;
        self.engine_active += TICK_US * 3 / 4;
        self.mem_read += 20_000_000_000;
        self.mem_write += 10_000_000_000;
        self.timestamp
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reject null and unknown handles the way a driver would
fn check<H: Handle + PartialEq>(handle: H, known: &[H]) -> ZeResult<()> {
    if handle.is_null() {
        Err(ZesError::InvalidNullHandle)
    } else if known.contains(&handle) {
        Ok(())
    } else {
        Err(ZesError::InvalidArgument)
    }
}

/// Count-then-fill over a fixed item list
fn fill<T: Clone>(items: &[T], count: &mut u32, out: Option<&mut [T]>) -> ZeResult<()> {
    let total = items.len() as u32;
    match out {
        Some(buf) if *count > 0 => {
            let n = (*count).min(total).min(buf.len() as u32) as usize;
            buf[..n].clone_from_slice(&items[..n]);
            *count = n as u32;
        }
        _ => *count = total,
    }
    Ok(())
}

/// Simulated sysman driver
#[derive(Debug, Clone, Default)]
pub struct MockSysman {
    state: Shared,
    disabled: Vec<&'static str>,
}

impl MockSysman {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: leave `operation` out of the table
    pub fn without(mut self, operation: &'static str) -> Self {
        self.disabled.push(operation);
        self
    }

    /// Set the reading of a temperature sensor
    pub fn set_temperature(&self, sensor: TemperatureHandle, celsius: f64) {
        lock(&self.state).temperatures.insert(sensor, celsius);
    }

    /// Number of device resets performed
    pub fn resets(&self) -> u32 {
        lock(&self.state).resets
    }

    pub fn fan_config(&self) -> FanConfig {
        lock(&self.state).fan.clone()
    }

    pub fn standby_mode(&self) -> StandbyPromoMode {
        lock(&self.state).standby
    }

    pub fn freq_range(&self, frequency: FrequencyHandle) -> Option<FreqRange> {
        lock(&self.state).freq_ranges.get(&frequency).copied()
    }

    pub fn energy_threshold(&self) -> EnergyThreshold {
        lock(&self.state).energy_threshold
    }

    /// Build a dispatch table over this simulated driver
    pub fn into_table(self) -> CapabilityTable {
        let mut t = CapabilityTable::default();

        self.driver_ops(&mut t);
        self.device_ops(&mut t);
        self.power_ops(&mut t);
        self.frequency_ops(&mut t);
        self.thermal_ops(&mut t);
        self.engine_ops(&mut t);
        self.memory_ops(&mut t);
        self.misc_ops(&mut t);

        for operation in &self.disabled {
            if !t.remove(operation) {
                log::warn!("Mock does not implement {}", operation);
            }
        }
        t
    }

    fn driver_ops(&self, t: &mut CapabilityTable) {
        t.driver.get = Some(Box::new(
            |count: &mut u32, out: Option<&mut [DriverHandle]>| fill(&[DRIVER], count, out),
        ));
        t.driver.get_extension_properties = Some(Box::new(
            |driver: DriverHandle,
             count: &mut u32,
             out: Option<&mut [DriverExtensionProperties]>| {
                check(driver, &[DRIVER])?;
                let extensions = [DriverExtensionProperties {
                    name: "ZES_extension_power_limits".to_string(),
                    version: 0x10000,
                }];
                fill(&extensions, count, out)
            },
        ));
        t.driver_exp.get_device_by_uuid_exp =
            Some(Box::new(|driver: DriverHandle, uuid: &DeviceUuid| {
                check(driver, &[DRIVER])?;
                if *uuid != DEVICE_UUID {
                    return Err(ZesError::InvalidArgument);
                }
                Ok(DeviceByUuid {
                    device: DEVICE,
                    on_subdevice: false,
                    subdevice_id: 0,
                })
            }));
    }

    fn device_ops(&self, t: &mut CapabilityTable) {
        let d = &mut t.device;

        d.get = Some(Box::new(
            |driver: DriverHandle, count: &mut u32, out: Option<&mut [DeviceHandle]>| {
                check(driver, &[DRIVER])?;
                fill(&[DEVICE], count, out)
            },
        ));
        d.get_properties = Some(Box::new(|device: DeviceHandle| {
            check(device, &[DEVICE])?;
            Ok(DeviceProperties {
                device_type: DeviceType::Gpu,
                uuid: DEVICE_UUID,
                name: "Mock Arc A770".to_string(),
                vendor_name: "Intel(R) Corporation".to_string(),
                serial_number: "MOCK0001".to_string(),
                driver_version: "1.3.29138".to_string(),
                num_subdevices: 0,
            })
        }));
        d.get_state = Some(Box::new(|device: DeviceHandle| {
            check(device, &[DEVICE])?;
            Ok(DeviceState::default())
        }));

        let state = Arc::clone(&self.state);
        d.reset = Some(Box::new(move |device: DeviceHandle, _force: bool| {
            check(device, &[DEVICE])?;
            let mut s = lock(&state);
            s.resets += 1;
            *s = MockState {
                resets: s.resets,
                ..MockState::default()
            };
            Ok(())
        }));

        d.process_get_state = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [ProcessUsage]>| {
                check(device, &[DEVICE])?;
                let processes = [ProcessUsage {
                    process_id: 4242,
                    mem_size: 512 << 20,
                    shared_size: 0,
                    engines: 1,
                }];
                fill(&processes, count, out)
            },
        ));
        d.pci_get_properties = Some(Box::new(|device: DeviceHandle| {
            check(device, &[DEVICE])?;
            Ok(PciProperties {
                address: PciAddress {
                    domain: 0,
                    bus: 3,
                    device: 0,
                    function: 0,
                },
                max_gen: 4,
                max_width: 16,
            })
        }));
        d.ecc_available = Some(Box::new(|device: DeviceHandle| {
            check(device, &[DEVICE])?;
            Ok(false)
        }));
        d.get_card_power_domain = Some(Box::new(|device: DeviceHandle| {
            check(device, &[DEVICE])?;
            Ok(POWER_CARD)
        }));

        d.enum_power_domains = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [PowerHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[POWER_CARD], count, out)
            },
        ));
        d.enum_frequency_domains = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [FrequencyHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[FREQ_GPU, FREQ_MEMORY], count, out)
            },
        ));
        d.enum_temperature_sensors = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [TemperatureHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[TEMP_GPU, TEMP_MEMORY], count, out)
            },
        ));
        d.enum_fans = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [FanHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[FAN], count, out)
            },
        ));
        d.enum_engine_groups = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [EngineHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[ENGINE_COMPUTE], count, out)
            },
        ));
        d.enum_memory_modules = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [MemoryHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[MEMORY], count, out)
            },
        ));
        d.enum_standby_domains = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [StandbyHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[STANDBY], count, out)
            },
        ));
        d.enum_ras_error_sets = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [RasHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[RAS_CORRECTABLE], count, out)
            },
        ));
        d.enum_performance_factor_domains = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [PerfHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[PERF], count, out)
            },
        ));
        d.enum_schedulers = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [SchedulerHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[SCHEDULER], count, out)
            },
        ));
        d.enum_firmwares = Some(Box::new(
            |device: DeviceHandle, count: &mut u32, out: Option<&mut [FirmwareHandle]>| {
                check(device, &[DEVICE])?;
                fill(&[FIRMWARE], count, out)
            },
        ));
    }

    fn power_ops(&self, t: &mut CapabilityTable) {
        t.power.get_properties = Some(Box::new(|power: PowerHandle| {
            check(power, &[POWER_CARD])?;
            Ok(PowerProperties {
                on_subdevice: false,
                subdevice_id: 0,
                can_control: true,
                is_energy_threshold_supported: true,
                default_limit: 190_000,
                min_limit: 100_000,
                max_limit: 228_000,
            })
        }));

        let state = Arc::clone(&self.state);
        t.power.get_energy_counter = Some(Box::new(move |power: PowerHandle| {
            check(power, &[POWER_CARD])?;
            let mut s = lock(&state);
            let timestamp = s.tick();
            Ok(PowerEnergyCounter {
                energy: s.energy,
                timestamp,
            })
        }));

        let state = Arc::clone(&self.state);
        t.power.get_energy_threshold = Some(Box::new(move |power: PowerHandle| {
            check(power, &[POWER_CARD])?;
            Ok(lock(&state).energy_threshold)
        }));

        let state = Arc::clone(&self.state);
        t.power.set_energy_threshold = Some(Box::new(move |power: PowerHandle, joules: f64| {
            check(power, &[POWER_CARD])?;
            if !joules.is_finite() || joules < 0.0 {
                return Err(ZesError::InvalidArgument);
            }
            lock(&state).energy_threshold = EnergyThreshold {
                enable: joules > 0.0,
                threshold: joules,
                process_id: std::process::id(),
            };
            Ok(())
        }));

        let state = Arc::clone(&self.state);
        t.power.get_limits_ext = Some(Box::new(
            move |power: PowerHandle, count: &mut u32, out: Option<&mut [PowerLimitDescriptor]>| {
                check(power, &[POWER_CARD])?;
                let limits = [lock(&state).power_limit];
                fill(&limits, count, out)
            },
        ));

        let state = Arc::clone(&self.state);
        t.power.set_limits_ext = Some(Box::new(
            move |power: PowerHandle, limits: &[PowerLimitDescriptor]| {
                check(power, &[POWER_CARD])?;
                let [limit] = limits else {
                    return Err(ZesError::InvalidSize);
                };
                if !(100_000..=228_000).contains(&limit.limit) {
                    return Err(ZesError::InvalidArgument);
                }
                lock(&state).power_limit = *limit;
                Ok(())
            },
        ));
    }

    fn frequency_ops(&self, t: &mut CapabilityTable) {
        let f = &mut t.frequency;

        f.get_properties = Some(Box::new(|frequency: FrequencyHandle| {
            check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
            let (domain, (min, max), can_control) = if frequency == FREQ_GPU {
                (FrequencyDomain::Gpu, GPU_FREQ_LIMITS, true)
            } else {
                (FrequencyDomain::Memory, MEMORY_FREQ_LIMITS, false)
            };
            Ok(FreqProperties {
                domain,
                on_subdevice: false,
                subdevice_id: 0,
                can_control,
                is_throttle_event_supported: false,
                min,
                max,
            })
        }));

        f.get_available_clocks = Some(Box::new(
            |frequency: FrequencyHandle, count: &mut u32, out: Option<&mut [f64]>| {
                check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
                let clocks: Vec<f64> = if frequency == FREQ_GPU {
                    (0..=42).map(|step| GPU_FREQ_LIMITS.0 + 50.0 * step as f64).collect()
                } else {
                    vec![MEMORY_FREQ_LIMITS.0]
                };
                fill(&clocks, count, out)
            },
        ));

        let state = Arc::clone(&self.state);
        f.get_range = Some(Box::new(move |frequency: FrequencyHandle| {
            check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
            lock(&state)
                .freq_ranges
                .get(&frequency)
                .copied()
                .ok_or(ZesError::Unknown)
        }));

        let state = Arc::clone(&self.state);
        f.set_range = Some(Box::new(
            move |frequency: FrequencyHandle, range: &FreqRange| {
                check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
                if frequency != FREQ_GPU {
                    return Err(ZesError::UnsupportedFeature);
                }
                if range.min > range.max
                    || range.min < GPU_FREQ_LIMITS.0
                    || range.max > GPU_FREQ_LIMITS.1
                {
                    return Err(ZesError::InvalidArgument);
                }
                lock(&state).freq_ranges.insert(frequency, *range);
                Ok(())
            },
        ));

        let state = Arc::clone(&self.state);
        f.get_state = Some(Box::new(move |frequency: FrequencyHandle| {
            check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
            let s = lock(&state);
            let range = s.freq_ranges.get(&frequency).copied().unwrap_or_default();
            Ok(FreqState {
                current_voltage: -1.0,
                request: range.max,
                tdp: range.max,
                efficient: range.min,
                actual: range.max,
                throttle_reasons: ThrottleReasons::default(),
            })
        }));

        let state = Arc::clone(&self.state);
        f.get_throttle_time = Some(Box::new(move |frequency: FrequencyHandle| {
            check(frequency, &[FREQ_GPU, FREQ_MEMORY])?;
            Ok(FreqThrottleTime {
                throttle_time: 0,
                timestamp: lock(&state).tick(),
            })
        }));
    }

    fn thermal_ops(&self, t: &mut CapabilityTable) {
        t.temperature.get_properties = Some(Box::new(|sensor: TemperatureHandle| {
            check(sensor, &[TEMP_GPU, TEMP_MEMORY])?;
            let kind = if sensor == TEMP_GPU {
                TempSensor::Gpu
            } else {
                TempSensor::Memory
            };
            Ok(TempProperties {
                sensor: kind,
                on_subdevice: false,
                subdevice_id: 0,
                max_temperature: 105.0,
                is_critical_temp_supported: true,
                is_threshold1_supported: true,
                is_threshold2_supported: false,
            })
        }));
        t.temperature.get_config = Some(Box::new(|sensor: TemperatureHandle| {
            check(sensor, &[TEMP_GPU, TEMP_MEMORY])?;
            Ok(TempConfig::default())
        }));

        let state = Arc::clone(&self.state);
        t.temperature.get_state = Some(Box::new(move |sensor: TemperatureHandle| {
            check(sensor, &[TEMP_GPU, TEMP_MEMORY])?;
            lock(&state)
                .temperatures
                .get(&sensor)
                .copied()
                .ok_or(ZesError::Unknown)
        }));

        t.fan.get_properties = Some(Box::new(|fan: FanHandle| {
            check(fan, &[FAN])?;
            Ok(FanProperties {
                on_subdevice: false,
                subdevice_id: 0,
                can_control: true,
                supported_modes: 0b011,
                supported_units: 0b11,
                max_rpm: FAN_MAX_RPM,
                max_points: 0,
            })
        }));

        let state = Arc::clone(&self.state);
        t.fan.get_config = Some(Box::new(move |fan: FanHandle| {
            check(fan, &[FAN])?;
            Ok(lock(&state).fan.clone())
        }));

        let state = Arc::clone(&self.state);
        t.fan.set_default_mode = Some(Box::new(move |fan: FanHandle| {
            check(fan, &[FAN])?;
            lock(&state).fan = FanConfig::default();
            Ok(())
        }));

        let state = Arc::clone(&self.state);
        t.fan.set_fixed_speed_mode = Some(Box::new(move |fan: FanHandle, speed: &FanSpeed| {
            check(fan, &[FAN])?;
            let valid = match speed.units {
                FanSpeedUnits::Percent => (0..=100).contains(&speed.speed),
                FanSpeedUnits::Rpm => (0..=FAN_MAX_RPM).contains(&speed.speed),
            };
            if !valid {
                return Err(ZesError::InvalidArgument);
            }
            let mut s = lock(&state);
            s.fan.mode = FanSpeedMode::Fixed;
            s.fan.speed_fixed = *speed;
            Ok(())
        }));

        let state = Arc::clone(&self.state);
        t.fan.get_state = Some(Box::new(move |fan: FanHandle, units: FanSpeedUnits| {
            check(fan, &[FAN])?;
            let config = lock(&state).fan.clone();
            let percent = match (config.mode, config.speed_fixed.units) {
                (FanSpeedMode::Fixed, FanSpeedUnits::Percent) => config.speed_fixed.speed,
                (FanSpeedMode::Fixed, FanSpeedUnits::Rpm) => {
                    config.speed_fixed.speed * 100 / FAN_MAX_RPM
                }
                _ => 35,
            };
            Ok(match units {
                FanSpeedUnits::Percent => percent,
                FanSpeedUnits::Rpm => percent * FAN_MAX_RPM / 100,
            })
        }));
    }

    fn engine_ops(&self, t: &mut CapabilityTable) {
        t.engine.get_properties = Some(Box::new(|engine: EngineHandle| {
            check(engine, &[ENGINE_COMPUTE])?;
            Ok(EngineProperties {
                group: EngineGroup::ComputeAll,
                on_subdevice: false,
                subdevice_id: 0,
            })
        }));

        let state = Arc::clone(&self.state);
        t.engine.get_activity = Some(Box::new(move |engine: EngineHandle| {
            check(engine, &[ENGINE_COMPUTE])?;
            let mut s = lock(&state);
            let timestamp = s.tick();
            Ok(EngineStats {
                active_time: s.engine_active,
                timestamp,
            })
        }));

        t.scheduler.get_properties = Some(Box::new(|scheduler: SchedulerHandle| {
            check(scheduler, &[SCHEDULER])?;
            Ok(SchedProperties {
                on_subdevice: false,
                subdevice_id: 0,
                can_control: true,
                engines: 1,
                supported_modes: 0b111,
            })
        }));

        let state = Arc::clone(&self.state);
        t.scheduler.get_current_mode = Some(Box::new(move |scheduler: SchedulerHandle| {
            check(scheduler, &[SCHEDULER])?;
            Ok(lock(&state).sched_mode)
        }));

        let state = Arc::clone(&self.state);
        t.scheduler.set_exclusive_mode = Some(Box::new(move |scheduler: SchedulerHandle| {
            check(scheduler, &[SCHEDULER])?;
            lock(&state).sched_mode = SchedMode::Exclusive;
            Ok(false)
        }));
    }

    fn memory_ops(&self, t: &mut CapabilityTable) {
        t.memory.get_properties = Some(Box::new(|memory: MemoryHandle| {
            check(memory, &[MEMORY])?;
            Ok(MemProperties {
                mem_type: MemType::Gddr6,
                on_subdevice: false,
                subdevice_id: 0,
                location: MemLocation::Device,
                physical_size: 16 << 30,
                bus_width: 256,
                num_channels: 8,
            })
        }));
        t.memory.get_state = Some(Box::new(|memory: MemoryHandle| {
            check(memory, &[MEMORY])?;
            Ok(MemState {
                health: MemHealth::Ok,
                free: 12 << 30,
                size: 16 << 30,
            })
        }));

        let state = Arc::clone(&self.state);
        t.memory.get_bandwidth = Some(Box::new(move |memory: MemoryHandle| {
            check(memory, &[MEMORY])?;
            let mut s = lock(&state);
            let timestamp = s.tick();
            Ok(MemBandwidth {
                read_counter: s.mem_read,
                write_counter: s.mem_write,
                max_bandwidth: 500_000_000_000,
                timestamp,
            })
        }));

        t.ras.get_properties = Some(Box::new(|ras: RasHandle| {
            check(ras, &[RAS_CORRECTABLE])?;
            Ok(RasProperties {
                error_type: RasErrorType::Correctable,
                on_subdevice: false,
                subdevice_id: 0,
            })
        }));

        let state = Arc::clone(&self.state);
        t.ras.get_state = Some(Box::new(move |ras: RasHandle, clear: bool| {
            check(ras, &[RAS_CORRECTABLE])?;
            let mut s = lock(&state);
            let current = s.ras;
            if clear {
                s.ras = RasState::default();
            }
            Ok(current)
        }));
    }

    fn misc_ops(&self, t: &mut CapabilityTable) {
        t.standby.get_properties = Some(Box::new(|standby: StandbyHandle| {
            check(standby, &[STANDBY])?;
            Ok(StandbyProperties::default())
        }));

        let state = Arc::clone(&self.state);
        t.standby.get_mode = Some(Box::new(move |standby: StandbyHandle| {
            check(standby, &[STANDBY])?;
            Ok(lock(&state).standby)
        }));

        let state = Arc::clone(&self.state);
        t.standby.set_mode = Some(Box::new(
            move |standby: StandbyHandle, mode: StandbyPromoMode| {
                check(standby, &[STANDBY])?;
                lock(&state).standby = mode;
                Ok(())
            },
        ));

        t.performance_factor.get_properties = Some(Box::new(|perf: PerfHandle| {
            check(perf, &[PERF])?;
            Ok(PerfProperties {
                on_subdevice: false,
                subdevice_id: 0,
                engines: 1,
            })
        }));

        let state = Arc::clone(&self.state);
        t.performance_factor.get_config = Some(Box::new(move |perf: PerfHandle| {
            check(perf, &[PERF])?;
            Ok(lock(&state).perf_factor)
        }));

        let state = Arc::clone(&self.state);
        t.performance_factor.set_config = Some(Box::new(move |perf: PerfHandle, factor: f64| {
            check(perf, &[PERF])?;
            if !(0.0..=100.0).contains(&factor) {
                return Err(ZesError::InvalidArgument);
            }
            lock(&state).perf_factor = factor;
            Ok(())
        }));

        t.firmware.get_properties = Some(Box::new(|firmware: FirmwareHandle| {
            check(firmware, &[FIRMWARE])?;
            Ok(FirmwareProperties {
                on_subdevice: false,
                subdevice_id: 0,
                can_control: true,
                name: "GFX".to_string(),
                version: "DG02_1.3172".to_string(),
            })
        }));

        let state = Arc::clone(&self.state);
        t.firmware.flash = Some(Box::new(move |firmware: FirmwareHandle, image: &[u8]| {
            check(firmware, &[FIRMWARE])?;
            if image.is_empty() {
                return Err(ZesError::InvalidSize);
            }
            lock(&state).flash_progress = 100;
            Ok(())
        }));

        let state = Arc::clone(&self.state);
        t.firmware_exp.get_flash_progress = Some(Box::new(move |firmware: FirmwareHandle| {
            check(firmware, &[FIRMWARE])?;
            Ok(lock(&state).flash_progress)
        }));
    }
}

/// Loader that installs a [`MockSysman`] table
#[derive(Debug)]
pub struct MockLoader {
    sysman: MockSysman,
    failure: Option<ZesError>,
    calls: Arc<AtomicUsize>,
}

impl MockLoader {
    pub fn new(sysman: MockSysman) -> Self {
        Self {
            sysman,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Loader whose bootstrap always fails with `error`
    pub fn failing(error: ZesError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(MockSysman::new())
        }
    }

    /// Counter of bootstrap attempts, shared with the loader
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Loader for MockLoader {
    fn name(&self) -> &str {
        "mock"
    }

    fn load(&self, flags: InitFlags) -> ZeResult<CapabilityTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        log::debug!("Mock bootstrap with flags {:#x}", flags.bits());

        match self.failure {
            Some(error) => Err(error),
            None => Ok(self.sysman.clone().into_table()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysman::enumerate;

    fn table() -> CapabilityTable {
        MockSysman::new().into_table()
    }

    #[test]
    fn test_count_then_fill() {
        let t = table();
        let get = t.device.enum_temperature_sensors.as_deref().unwrap();

        let sensors = enumerate(|count, out| get(DEVICE, count, out)).unwrap();
        assert_eq!(sensors, vec![TEMP_GPU, TEMP_MEMORY]);
    }

    #[test]
    fn test_fill_clamps_to_requested_count() {
        let mut count = 1;
        let mut out = [FrequencyHandle::default(); 4];
        fill(&[FREQ_GPU, FREQ_MEMORY], &mut count, Some(&mut out)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(out[0], FREQ_GPU);
        assert!(out[1].is_null());
    }

    #[test]
    fn test_rejects_bad_handles() {
        let t = table();
        let get = t.temperature.get_state.as_deref().unwrap();

        assert_eq!(get(TemperatureHandle::default()), Err(ZesError::InvalidNullHandle));
        assert_eq!(get(TemperatureHandle::new(0x1)), Err(ZesError::InvalidArgument));
        assert_eq!(get(TEMP_GPU), Ok(45.0));
    }

    #[test]
    fn test_setters_change_state() {
        let sysman = MockSysman::new();
        let t = sysman.clone().into_table();

        let speed = FanSpeed::percent(FanPercent::new(70).unwrap());
        (t.fan.set_fixed_speed_mode.as_deref().unwrap())(FAN, &speed).unwrap();
        assert_eq!(sysman.fan_config().mode, FanSpeedMode::Fixed);
        assert_eq!(
            (t.fan.get_state.as_deref().unwrap())(FAN, FanSpeedUnits::Rpm),
            Ok(2100)
        );

        (t.standby.set_mode.as_deref().unwrap())(STANDBY, StandbyPromoMode::Never).unwrap();
        assert_eq!(sysman.standby_mode(), StandbyPromoMode::Never);
    }

    #[test]
    fn test_energy_counter_yields_constant_power() {
        let t = table();
        let read = t.power.get_energy_counter.as_deref().unwrap();

        let first = read(POWER_CARD).unwrap();
        let second = read(POWER_CARD).unwrap();
        let watts = first.average_power_watts(&second).unwrap();
        assert!((watts - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_frequency_range_bounds() {
        let t = table();
        let set = t.frequency.set_range.as_deref().unwrap();

        assert_eq!(
            set(FREQ_GPU, &FreqRange { min: 100.0, max: 1000.0 }),
            Err(ZesError::InvalidArgument)
        );
        assert_eq!(
            set(FREQ_MEMORY, &FreqRange { min: 1000.0, max: 1000.0 }),
            Err(ZesError::UnsupportedFeature)
        );
        assert!(set(FREQ_GPU, &FreqRange { min: 600.0, max: 1800.0 }).is_ok());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let sysman = MockSysman::new();
        let t = sysman.clone().into_table();

        (t.standby.set_mode.as_deref().unwrap())(STANDBY, StandbyPromoMode::Never).unwrap();
        (t.device.reset.as_deref().unwrap())(DEVICE, false).unwrap();

        assert_eq!(sysman.resets(), 1);
        assert_eq!(sysman.standby_mode(), StandbyPromoMode::Default);
    }

    #[test]
    fn test_without_removes_entry() {
        let t = MockSysman::new().without("fan_get_state").into_table();
        assert!(t.fan.get_state.is_none());
        assert!(t.fan.get_config.is_some());
    }

    #[test]
    fn test_failing_loader_counts_calls() {
        let loader = MockLoader::failing(ZesError::DeviceLost);
        let calls = loader.calls();

        assert!(matches!(loader.load(InitFlags::NONE), Err(ZesError::DeviceLost)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
