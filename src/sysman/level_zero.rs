//! Level Zero loader backend
//!
//! Opens the Level Zero loader library with libloading, runs `zesInit`
//! and binds the sysman entry points whose C prototypes are built from
//! handles, counts, scalars and flat structs. Entry points the library
//! does not export stay unbound, which the gate reports as unsupported.

use crate::domain::*;
use crate::error::{ZeResult, ZesError};
use crate::sysman::gate::InitFlags;
use crate::sysman::loader::Loader;
use crate::sysman::table::CapabilityTable;

use libloading::Library;
use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::sync::Arc;

type RawHandle = *mut c_void;
type ZeBool = u8;
type RawResult = u32;

type Binding<A, R> = Option<Box<dyn Fn(A) -> ZeResult<R> + Send + Sync>>;
type Binding2<A, B, R> = Option<Box<dyn Fn(A, B) -> ZeResult<R> + Send + Sync>>;
type RefBinding<H, In> = Option<Box<dyn Fn(H, &In) -> ZeResult<()> + Send + Sync>>;
type EnumBinding<P, T> =
    Option<Box<dyn Fn(P, &mut u32, Option<&mut [T]>) -> ZeResult<()> + Send + Sync>>;

#[cfg(windows)]
const DEFAULT_LIBRARIES: &[&str] = &["ze_loader.dll"];
#[cfg(not(windows))]
const DEFAULT_LIBRARIES: &[&str] = &["libze_loader.so.1", "libze_loader.so"];

const STRING_PROPERTY_SIZE: usize = 64;
const MAX_EXTENSION_NAME: usize = 256;
const MAX_FABRIC_PORT_MODEL_SIZE: usize = 256;
const FAN_TEMP_SPEED_PAIR_COUNT: usize = 32;
const RAS_CATEGORY_COUNT: usize = 7;

// zes_structure_type_t
const STYPE_DEVICE_PROPERTIES: u32 = 0x1;
const STYPE_PCI_PROPERTIES: u32 = 0x2;
const STYPE_DIAG_PROPERTIES: u32 = 0x4;
const STYPE_ENGINE_PROPERTIES: u32 = 0x5;
const STYPE_FABRIC_PORT_PROPERTIES: u32 = 0x6;
const STYPE_FAN_PROPERTIES: u32 = 0x7;
const STYPE_FIRMWARE_PROPERTIES: u32 = 0x8;
const STYPE_FREQ_PROPERTIES: u32 = 0x9;
const STYPE_LED_PROPERTIES: u32 = 0xa;
const STYPE_MEM_PROPERTIES: u32 = 0xb;
const STYPE_PERF_PROPERTIES: u32 = 0xc;
const STYPE_POWER_PROPERTIES: u32 = 0xd;
const STYPE_PSU_PROPERTIES: u32 = 0xe;
const STYPE_RAS_PROPERTIES: u32 = 0xf;
const STYPE_SCHED_PROPERTIES: u32 = 0x10;
const STYPE_SCHED_TIMEOUT_PROPERTIES: u32 = 0x11;
const STYPE_STANDBY_PROPERTIES: u32 = 0x13;
const STYPE_TEMP_PROPERTIES: u32 = 0x14;
const STYPE_DEVICE_STATE: u32 = 0x15;
const STYPE_PROCESS_STATE: u32 = 0x16;
const STYPE_FABRIC_PORT_CONFIG: u32 = 0x18;
const STYPE_FABRIC_PORT_STATE: u32 = 0x19;
const STYPE_FAN_CONFIG: u32 = 0x1a;
const STYPE_FREQ_STATE: u32 = 0x1b;
const STYPE_LED_STATE: u32 = 0x1d;
const STYPE_MEM_STATE: u32 = 0x1e;
const STYPE_PSU_STATE: u32 = 0x1f;
const STYPE_RAS_CONFIG: u32 = 0x21;
const STYPE_RAS_STATE: u32 = 0x22;
const STYPE_TEMP_CONFIG: u32 = 0x23;
const STYPE_POWER_LIMIT_EXT_DESCRIPTOR: u32 = 0x27;
const STYPE_OVERCLOCK_PROPERTIES: u32 = 0x29;
const STYPE_SUBDEVICE_EXP_PROPERTIES: u32 = 0x0002_0004;
const STYPE_VF_EXP_PROPERTIES: u32 = 0x0002_0005;
const STYPE_VF_UTIL_MEM_EXP: u32 = 0x0002_0006;
const STYPE_VF_UTIL_ENGINE_EXP: u32 = 0x0002_0007;

// ze_structure_type_t
const ZE_STYPE_DEVICE_PROPERTIES: u32 = 0x3;

/// Implement `Default` as all-zero, tagging the structure type when given
macro_rules! zeroed_default {
    ($($name:ident $(= $stype:expr)?),* $(,)?) => {
        $(
            impl Default for $name {
                fn default() -> Self {
                    // SAFETY: integers, floats, arrays and null pointers only
                    #[allow(unused_mut)]
                    let mut raw: Self = unsafe { std::mem::zeroed() };
                    $(raw.stype = $stype;)?
                    raw
                }
            }
        )*
    };
}

// Flat structs shared with the C API

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawEnergyCounter {
    energy: u64,
    timestamp: u64,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawEnergyThreshold {
    enable: ZeBool,
    threshold: f64,
    process_id: u32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawFreqRange {
    min: f64,
    max: f64,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawCounterPair {
    first: u64,
    timestamp: u64,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawMemBandwidth {
    read_counter: u64,
    write_counter: u64,
    max_bandwidth: u64,
    timestamp: u64,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawPortThroughput {
    timestamp: u64,
    rx_counter: u64,
    tx_counter: u64,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawPciAddress {
    domain: u32,
    bus: u32,
    device: u32,
    function: u32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawUuid {
    id: [u8; 16],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawCoreDeviceProperties {
    stype: u32,
    p_next: *mut c_void,
    device_type: u32,
    vendor_id: u32,
    device_id: u32,
    flags: u32,
    subdevice_id: u32,
    core_clock_rate: u32,
    max_mem_alloc_size: u64,
    max_hardware_contexts: u32,
    max_command_queue_priority: u32,
    num_threads_per_eu: u32,
    physical_eu_simd_width: u32,
    num_eus_per_subslice: u32,
    num_subslices_per_slice: u32,
    num_slices: u32,
    timer_resolution: u64,
    timestamp_valid_bits: u32,
    kernel_timestamp_valid_bits: u32,
    uuid: [u8; 16],
    name: [c_char; 256],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawDeviceProperties {
    stype: u32,
    p_next: *mut c_void,
    core: RawCoreDeviceProperties,
    num_subdevices: u32,
    serial_number: [c_char; STRING_PROPERTY_SIZE],
    board_number: [c_char; STRING_PROPERTY_SIZE],
    brand_name: [c_char; STRING_PROPERTY_SIZE],
    model_name: [c_char; STRING_PROPERTY_SIZE],
    vendor_name: [c_char; STRING_PROPERTY_SIZE],
    driver_version: [c_char; STRING_PROPERTY_SIZE],
}

impl Default for RawDeviceProperties {
    fn default() -> Self {
        // SAFETY: every field is an integer, array or raw pointer; all-zero is valid.
        let mut raw: Self = unsafe { std::mem::zeroed() };
        raw.stype = STYPE_DEVICE_PROPERTIES;
        raw.core.stype = ZE_STYPE_DEVICE_PROPERTIES;
        raw
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawDeviceState {
    stype: u32,
    p_next: *mut c_void,
    reset: u32,
    repaired: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPciProperties {
    stype: u32,
    p_next: *mut c_void,
    address: RawPciAddress,
    gen: i32,
    width: i32,
    max_bandwidth: i64,
    have_bandwidth_counters: ZeBool,
    have_packet_counters: ZeBool,
    have_replay_counters: ZeBool,
}

impl Default for RawPciProperties {
    fn default() -> Self {
        Self {
            stype: STYPE_PCI_PROPERTIES,
            p_next: std::ptr::null_mut(),
            address: RawPciAddress::default(),
            gen: -1,
            width: -1,
            max_bandwidth: -1,
            have_bandwidth_counters: 0,
            have_packet_counters: 0,
            have_replay_counters: 0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawProcessState {
    stype: u32,
    p_next: *mut c_void,
    process_id: u32,
    mem_size: u64,
    shared_size: u64,
    engines: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawExtensionProperties {
    name: [c_char; MAX_EXTENSION_NAME],
    version: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSubdeviceProperties {
    stype: u32,
    p_next: *mut c_void,
    subdevice_id: u32,
    uuid: RawUuid,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawOverclockProperties {
    stype: u32,
    p_next: *mut c_void,
    domain: u32,
    available_controls: u32,
    vf_program_type: u32,
    number_of_vf_points: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawDiagProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    name: [c_char; STRING_PROPERTY_SIZE],
    have_tests: ZeBool,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawDiagTest {
    index: u32,
    name: [c_char; STRING_PROPERTY_SIZE],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawEngineProperties {
    stype: u32,
    p_next: *mut c_void,
    group: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawFabricPortId {
    fabric_id: u32,
    attach_id: u32,
    port_number: u8,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawFabricPortSpeed {
    bit_rate: i64,
    width: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFabricPortProperties {
    stype: u32,
    p_next: *mut c_void,
    model: [c_char; MAX_FABRIC_PORT_MODEL_SIZE],
    on_subdevice: ZeBool,
    subdevice_id: u32,
    port_id: RawFabricPortId,
    max_rx_speed: RawFabricPortSpeed,
    max_tx_speed: RawFabricPortSpeed,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFabricPortConfig {
    stype: u32,
    p_next: *mut c_void,
    enabled: ZeBool,
    beaconing: ZeBool,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFabricPortState {
    stype: u32,
    p_next: *mut c_void,
    status: u32,
    quality_issues: u32,
    failure_reasons: u32,
    remote_port_id: RawFabricPortId,
    rx_speed: RawFabricPortSpeed,
    tx_speed: RawFabricPortSpeed,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFanProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    supported_modes: u32,
    supported_units: u32,
    max_rpm: i32,
    max_points: i32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawFanSpeed {
    speed: i32,
    units: u32,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawFanTempSpeed {
    temperature: u32,
    speed: RawFanSpeed,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFanSpeedTable {
    num_points: i32,
    table: [RawFanTempSpeed; FAN_TEMP_SPEED_PAIR_COUNT],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFanConfig {
    stype: u32,
    p_next: *mut c_void,
    mode: u32,
    speed_fixed: RawFanSpeed,
    speed_table: RawFanSpeedTable,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFirmwareProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    name: [c_char; STRING_PROPERTY_SIZE],
    version: [c_char; STRING_PROPERTY_SIZE],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFreqProperties {
    stype: u32,
    p_next: *mut c_void,
    domain: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    is_throttle_event_supported: ZeBool,
    min: f64,
    max: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawFreqState {
    stype: u32,
    p_next: *mut c_void,
    current_voltage: f64,
    request: f64,
    tdp: f64,
    efficient: f64,
    actual: f64,
    throttle_reasons: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawLedProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    have_rgb: ZeBool,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawLedColor {
    red: f64,
    green: f64,
    blue: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawLedState {
    stype: u32,
    p_next: *mut c_void,
    is_on: ZeBool,
    color: RawLedColor,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawMemProperties {
    stype: u32,
    p_next: *mut c_void,
    mem_type: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    location: u32,
    physical_size: u64,
    bus_width: i32,
    num_channels: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawMemState {
    stype: u32,
    p_next: *mut c_void,
    health: u32,
    free: u64,
    size: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPerfProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    engines: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPowerProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    is_energy_threshold_supported: ZeBool,
    default_limit: i32,
    min_limit: i32,
    max_limit: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPowerLimitExt {
    stype: u32,
    p_next: *mut c_void,
    level: u32,
    source: u32,
    limit_unit: u32,
    enabled_state_locked: ZeBool,
    enabled: ZeBool,
    interval_value_locked: ZeBool,
    interval: i32,
    limit_value_locked: ZeBool,
    limit: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPsuProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    have_fan: ZeBool,
    amp_limit: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawPsuState {
    stype: u32,
    p_next: *mut c_void,
    voltage_status: u32,
    fan_failed: ZeBool,
    temperature: i32,
    current: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawRasProperties {
    stype: u32,
    p_next: *mut c_void,
    error_type: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawRasState {
    stype: u32,
    p_next: *mut c_void,
    category: [u64; RAS_CATEGORY_COUNT],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawRasConfig {
    stype: u32,
    p_next: *mut c_void,
    total_threshold: u64,
    detailed_thresholds: RawRasState,
}

impl Default for RawRasConfig {
    fn default() -> Self {
        Self {
            stype: STYPE_RAS_CONFIG,
            p_next: std::ptr::null_mut(),
            total_threshold: 0,
            detailed_thresholds: RawRasState::default(),
        }
    }
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawRasStateExp {
    category: u32,
    error_counter: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSchedProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    can_control: ZeBool,
    engines: u32,
    supported_modes: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawSchedTimeoutProperties {
    stype: u32,
    p_next: *mut c_void,
    watchdog_timeout: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawStandbyProperties {
    stype: u32,
    p_next: *mut c_void,
    standby_type: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawTempProperties {
    stype: u32,
    p_next: *mut c_void,
    sensor: u32,
    on_subdevice: ZeBool,
    subdevice_id: u32,
    max_temperature: f64,
    is_critical_temp_supported: ZeBool,
    is_threshold1_supported: ZeBool,
    is_threshold2_supported: ZeBool,
}

#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RawTempThreshold {
    enable_low_to_high: ZeBool,
    enable_high_to_low: ZeBool,
    threshold: f64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawTempConfig {
    stype: u32,
    p_next: *mut c_void,
    enable_critical: ZeBool,
    threshold1: RawTempThreshold,
    threshold2: RawTempThreshold,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawVfProperties {
    stype: u32,
    p_next: *mut c_void,
    address: RawPciAddress,
    uuid: RawUuid,
    flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawVfUtilMem {
    stype: u32,
    p_next: *mut c_void,
    location: u32,
    free: u64,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct RawVfUtilEngine {
    stype: u32,
    p_next: *mut c_void,
    group: u32,
    active_counter_value: u64,
    sampling_counter_value: u64,
    timestamp: u64,
}

zeroed_default! {
    RawDeviceState = STYPE_DEVICE_STATE,
    RawProcessState = STYPE_PROCESS_STATE,
    RawExtensionProperties,
    RawSubdeviceProperties = STYPE_SUBDEVICE_EXP_PROPERTIES,
    RawOverclockProperties = STYPE_OVERCLOCK_PROPERTIES,
    RawDiagProperties = STYPE_DIAG_PROPERTIES,
    RawDiagTest,
    RawEngineProperties = STYPE_ENGINE_PROPERTIES,
    RawFabricPortProperties = STYPE_FABRIC_PORT_PROPERTIES,
    RawFabricPortConfig = STYPE_FABRIC_PORT_CONFIG,
    RawFabricPortState = STYPE_FABRIC_PORT_STATE,
    RawFanProperties = STYPE_FAN_PROPERTIES,
    RawFanSpeedTable,
    RawFanConfig = STYPE_FAN_CONFIG,
    RawFirmwareProperties = STYPE_FIRMWARE_PROPERTIES,
    RawFreqProperties = STYPE_FREQ_PROPERTIES,
    RawFreqState = STYPE_FREQ_STATE,
    RawLedProperties = STYPE_LED_PROPERTIES,
    RawLedState = STYPE_LED_STATE,
    RawMemProperties = STYPE_MEM_PROPERTIES,
    RawMemState = STYPE_MEM_STATE,
    RawPerfProperties = STYPE_PERF_PROPERTIES,
    RawPowerProperties = STYPE_POWER_PROPERTIES,
    RawPowerLimitExt = STYPE_POWER_LIMIT_EXT_DESCRIPTOR,
    RawPsuProperties = STYPE_PSU_PROPERTIES,
    RawPsuState = STYPE_PSU_STATE,
    RawRasProperties = STYPE_RAS_PROPERTIES,
    RawRasState = STYPE_RAS_STATE,
    RawSchedProperties = STYPE_SCHED_PROPERTIES,
    RawSchedTimeoutProperties = STYPE_SCHED_TIMEOUT_PROPERTIES,
    RawStandbyProperties = STYPE_STANDBY_PROPERTIES,
    RawTempProperties = STYPE_TEMP_PROPERTIES,
    RawTempConfig = STYPE_TEMP_CONFIG,
    RawVfProperties = STYPE_VF_EXP_PROPERTIES,
    RawVfUtilMem = STYPE_VF_UTIL_MEM_EXP,
    RawVfUtilEngine = STYPE_VF_UTIL_ENGINE_EXP,
}

// Conversions between driver values and domain types

fn c_string(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn flag(raw: ZeBool) -> bool {
    raw != 0
}

fn ze_bool(value: bool) -> ZeBool {
    value as ZeBool
}

fn device_type(raw: u32) -> DeviceType {
    match raw {
        2 => DeviceType::Cpu,
        3 => DeviceType::Fpga,
        4 => DeviceType::Mca,
        5 => DeviceType::Vpu,
        _ => DeviceType::Gpu,
    }
}

fn pci_address(raw: RawPciAddress) -> PciAddress {
    PciAddress {
        domain: raw.domain,
        bus: raw.bus,
        device: raw.device,
        function: raw.function,
    }
}

fn engine_group(raw: u32) -> EngineGroup {
    match raw {
        1 => EngineGroup::ComputeAll,
        2 => EngineGroup::MediaAll,
        3 => EngineGroup::CopyAll,
        4 => EngineGroup::ComputeSingle,
        5 => EngineGroup::RenderSingle,
        6 => EngineGroup::MediaDecodeSingle,
        7 => EngineGroup::MediaEncodeSingle,
        8 => EngineGroup::CopySingle,
        12 => EngineGroup::RenderAll,
        _ => EngineGroup::All,
    }
}

fn fabric_port_id(raw: RawFabricPortId) -> FabricPortId {
    FabricPortId {
        fabric_id: raw.fabric_id,
        attach_id: raw.attach_id,
        port_number: raw.port_number,
    }
}

fn fabric_port_status(raw: u32) -> FabricPortStatus {
    match raw {
        1 => FabricPortStatus::Healthy,
        2 => FabricPortStatus::Degraded,
        3 => FabricPortStatus::Failed,
        4 => FabricPortStatus::Disabled,
        _ => FabricPortStatus::Unknown,
    }
}

fn fan_speed(raw: RawFanSpeed) -> FanSpeed {
    FanSpeed {
        speed: raw.speed,
        units: match raw.units {
            0 => FanSpeedUnits::Rpm,
            _ => FanSpeedUnits::Percent,
        },
    }
}

fn raw_fan_speed(speed: &FanSpeed) -> RawFanSpeed {
    RawFanSpeed {
        speed: speed.speed,
        units: speed.units as u32,
    }
}

fn fan_config(raw: RawFanConfig) -> FanConfig {
    let points = usize::try_from(raw.speed_table.num_points)
        .unwrap_or(0)
        .min(FAN_TEMP_SPEED_PAIR_COUNT);
    FanConfig {
        mode: match raw.mode {
            1 => FanSpeedMode::Fixed,
            2 => FanSpeedMode::Table,
            _ => FanSpeedMode::Default,
        },
        speed_fixed: fan_speed(raw.speed_fixed),
        speed_table: raw.speed_table.table[..points]
            .iter()
            .map(|p| FanTempSpeed {
                temperature: p.temperature,
                speed: fan_speed(p.speed),
            })
            .collect(),
    }
}

fn frequency_domain(raw: u32) -> FrequencyDomain {
    match raw {
        1 => FrequencyDomain::Memory,
        2 => FrequencyDomain::Media,
        _ => FrequencyDomain::Gpu,
    }
}

fn mem_type(raw: u32) -> MemType {
    match raw {
        0 => MemType::Hbm,
        5..=8 => MemType::Lpddr,
        9 => MemType::Sram,
        17 => MemType::Gddr6,
        18 => MemType::Gddr6x,
        _ => MemType::Ddr,
    }
}

fn mem_location(raw: u32) -> MemLocation {
    match raw {
        0 => MemLocation::System,
        _ => MemLocation::Device,
    }
}

fn mem_health(raw: u32) -> MemHealth {
    match raw {
        1 => MemHealth::Ok,
        2 => MemHealth::Degraded,
        3 => MemHealth::Critical,
        4 => MemHealth::Replace,
        _ => MemHealth::Unknown,
    }
}

fn power_level(raw: u32) -> PowerLevel {
    match raw {
        1 => PowerLevel::Sustained,
        2 => PowerLevel::Burst,
        3 => PowerLevel::Peak,
        4 => PowerLevel::Instantaneous,
        _ => PowerLevel::Unknown,
    }
}

fn raw_power_level(level: PowerLevel) -> u32 {
    match level {
        PowerLevel::Unknown => 0,
        PowerLevel::Sustained => 1,
        PowerLevel::Burst => 2,
        PowerLevel::Peak => 3,
        PowerLevel::Instantaneous => 4,
    }
}

fn power_source(raw: u32) -> PowerSource {
    match raw {
        1 => PowerSource::Mains,
        2 => PowerSource::Battery,
        _ => PowerSource::Any,
    }
}

fn raw_power_source(source: PowerSource) -> u32 {
    match source {
        PowerSource::Any => 0,
        PowerSource::Mains => 1,
        PowerSource::Battery => 2,
    }
}

fn power_limit(raw: &RawPowerLimitExt) -> ZeResult<PowerLimitDescriptor> {
    Ok(PowerLimitDescriptor {
        level: power_level(raw.level),
        source: power_source(raw.source),
        enabled: flag(raw.enabled),
        limit: raw.limit,
        interval: raw.interval,
    })
}

fn raw_power_limit(limit: &PowerLimitDescriptor) -> RawPowerLimitExt {
    RawPowerLimitExt {
        level: raw_power_level(limit.level),
        source: raw_power_source(limit.source),
        // ZES_LIMIT_UNIT_POWER: limits are in milliwatts
        limit_unit: 2,
        enabled: ze_bool(limit.enabled),
        interval: limit.interval,
        limit: limit.limit,
        ..RawPowerLimitExt::default()
    }
}

fn ras_category(raw: u32) -> ZeResult<RasErrorCategoryExp> {
    use RasErrorCategoryExp::*;
    [
        Reset,
        ProgrammingErrors,
        DriverErrors,
        ComputeErrors,
        NonComputeErrors,
        CacheErrors,
        DisplayErrors,
        MemoryErrors,
        ScaleErrors,
        L3FabricErrors,
    ]
    .into_iter()
    .find(|c| *c as u32 == raw)
    .ok_or(ZesError::Unknown)
}

fn temp_sensor(raw: u32) -> TempSensor {
    match raw {
        1 => TempSensor::Gpu,
        2 => TempSensor::Memory,
        3 => TempSensor::GlobalMin,
        4 => TempSensor::GpuMin,
        5 => TempSensor::MemoryMin,
        6 => TempSensor::GpuBoard,
        7 => TempSensor::GpuBoardMin,
        _ => TempSensor::Global,
    }
}

fn temp_threshold(raw: RawTempThreshold) -> TempThreshold {
    TempThreshold {
        enable_low_to_high: flag(raw.enable_low_to_high),
        enable_high_to_low: flag(raw.enable_high_to_low),
        threshold: raw.threshold,
    }
}

fn raw_temp_threshold(threshold: &TempThreshold) -> RawTempThreshold {
    RawTempThreshold {
        enable_low_to_high: ze_bool(threshold.enable_low_to_high),
        enable_high_to_low: ze_bool(threshold.enable_high_to_low),
        threshold: threshold.threshold,
    }
}

fn overclock_domain(raw: u32) -> OverclockDomain {
    match raw {
        2 => OverclockDomain::Package,
        4 => OverclockDomain::GpuAll,
        8 => OverclockDomain::GpuRenderCompute,
        64 => OverclockDomain::GpuMedia,
        128 => OverclockDomain::Vram,
        _ => OverclockDomain::Card,
    }
}

fn pending_action(raw: u32) -> PendingAction {
    match raw {
        3 => PendingAction::ColdReset,
        4 => PendingAction::WarmReset,
        _ => PendingAction::None,
    }
}

/// Clamp the caller's count to the buffer that receives the entries
fn clamp_count(count: &mut u32, len: usize) {
    *count = (*count).min(u32::try_from(len).unwrap_or(u32::MAX));
}

/// Resolves exported entry points by name
trait Exports: Send + Sync {
    /// Address of `name`, if exported
    fn address(&self, name: &str) -> Option<*mut c_void>;
}

impl Exports for Library {
    fn address(&self, name: &str) -> Option<*mut c_void> {
        let mut symbol = name.as_bytes().to_vec();
        symbol.push(0);
        // SAFETY: the symbol is read as an untyped address only
        let address = unsafe { self.get::<*mut c_void>(&symbol) }
            .ok()
            .map(|s| *s)?;
        (!address.is_null()).then_some(address)
    }
}

/// Loader backend for the Level Zero loader library
#[derive(Debug, Clone, Default)]
pub struct LevelZeroLoader {
    library_paths: Vec<PathBuf>,
    disabled: Vec<String>,
}

impl LevelZeroLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try these library paths before the system defaults
    pub fn with_library_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.library_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Leave these operations unbound even if the library exports them
    pub fn with_disabled<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(operations.into_iter().map(Into::into));
        self
    }

    /// Library paths in the order they are tried
    pub fn candidates(&self) -> Vec<PathBuf> {
        self.library_paths
            .iter()
            .cloned()
            .chain(DEFAULT_LIBRARIES.iter().map(PathBuf::from))
            .collect()
    }

    /// Run `zesInit` and build the dispatch table from resolved exports
    fn bind(&self, exports: Arc<dyn Exports>, flags: InitFlags) -> ZeResult<CapabilityTable> {
        let bindings = Bindings { exports };

        // SAFETY: prototype is ze_result_t zesInit(zes_init_flags_t)
        let init: unsafe extern "C" fn(u32) -> RawResult =
            unsafe { bindings.symbol("zesInit") }.ok_or(ZesError::Uninitialized)?;
        // SAFETY: flags were validated by the gate
        ZesError::check(unsafe { init(flags.bits()) })?;

        let mut table = bindings.table();
        for operation in &self.disabled {
            if !table.remove(operation) {
                log::warn!("Disabled operation {} was not bound", operation);
            }
        }

        log::debug!(
            "Bound {} of {} sysman operations",
            table.supported().len(),
            crate::sysman::OPERATIONS.len()
        );
        Ok(table)
    }
}

fn open_any(paths: impl IntoIterator<Item = PathBuf>) -> ZeResult<Library> {
    for path in paths {
        // SAFETY: loading the Level Zero loader runs its initializers,
        // which is the documented way to use it.
        match unsafe { Library::new(&path) } {
            Ok(lib) => {
                log::debug!("Loaded {}", path.display());
                return Ok(lib);
            }
            Err(e) => log::debug!("Could not load {}: {}", path.display(), e),
        }
    }
    log::warn!("Level Zero loader library not found");
    Err(ZesError::Uninitialized)
}

impl Loader for LevelZeroLoader {
    fn name(&self) -> &str {
        "level-zero"
    }

    fn load(&self, flags: InitFlags) -> ZeResult<CapabilityTable> {
        self.bind(Arc::new(open_any(self.candidates())?), flags)
    }
}

/// Symbol resolution against one set of exports
///
/// Every closure produced here holds an `Arc` to the exports so the
/// function pointers it calls stay mapped.
struct Bindings {
    exports: Arc<dyn Exports>,
}

impl Bindings {
    /// # Safety
    /// `F` must be the exact `extern "C"` prototype of `name`.
    unsafe fn symbol<F: Copy>(&self, name: &str) -> Option<F> {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>()
        );
        match self.exports.address(name) {
            Some(address) => Some(std::mem::transmute_copy::<*mut c_void, F>(&address)),
            None => {
                log::debug!("{} is not exported", name);
                None
            }
        }
    }

    /// Bind `ze_result_t fn(parent, uint32_t*, child*)`
    fn enumeration<P: Handle, C: Handle>(&self, name: &str) -> EnumBinding<P, C> {
        // SAFETY: all sysman enumerations share this prototype
        let f: unsafe extern "C" fn(RawHandle, *mut u32, *mut RawHandle) -> RawResult =
            unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |parent: P, count: &mut u32, out: Option<&mut [C]>| {
                let _exports = &exports;
                let ptr = match out {
                    Some(buf) => {
                        clamp_count(count, buf.len());
                        buf.as_mut_ptr().cast::<RawHandle>()
                    }
                    None => std::ptr::null_mut(),
                };
                // SAFETY: handles are repr(transparent) over usize and the
                // buffer holds at least `*count` entries.
                ZesError::check(unsafe { f(parent.as_raw() as RawHandle, count, ptr) })
            },
        ))
    }

    /// Bind `ze_result_t fn(parent, uint32_t*, Raw*)` and convert each entry
    fn list<P, Raw, Out>(
        &self,
        name: &str,
        convert: fn(&Raw) -> ZeResult<Out>,
    ) -> EnumBinding<P, Out>
    where
        P: Handle,
        Raw: Default + Copy + 'static,
        Out: 'static,
    {
        // SAFETY: caller pairs `name` with its entry struct
        let f: unsafe extern "C" fn(RawHandle, *mut u32, *mut Raw) -> RawResult =
            unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |parent: P, count: &mut u32, out: Option<&mut [Out]>| {
                let _exports = &exports;
                let Some(buf) = out else {
                    // SAFETY: a null buffer asks for the count only
                    return ZesError::check(unsafe {
                        f(parent.as_raw() as RawHandle, count, std::ptr::null_mut())
                    });
                };
                clamp_count(count, buf.len());
                let mut raw = vec![Raw::default(); *count as usize];
                // SAFETY: `raw` holds exactly `*count` entries
                ZesError::check(unsafe {
                    f(parent.as_raw() as RawHandle, count, raw.as_mut_ptr())
                })?;
                for (slot, entry) in buf.iter_mut().zip(raw.iter().take(*count as usize)) {
                    *slot = convert(entry)?;
                }
                Ok(())
            },
        ))
    }

    /// Bind `ze_result_t fn(handle, Raw*)` and convert the output
    fn getter<H, Raw, Out>(&self, name: &str, convert: fn(Raw) -> Out) -> Binding<H, Out>
    where
        H: Handle,
        Raw: Default + Copy + 'static,
        Out: 'static,
    {
        // SAFETY: caller pairs `name` with its output struct
        let f: unsafe extern "C" fn(RawHandle, *mut Raw) -> RawResult =
            unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |handle: H| {
            let _exports = &exports;
            let mut raw = Raw::default();
            // SAFETY: `raw` is a valid, writable Raw
            ZesError::check(unsafe { f(handle.as_raw() as RawHandle, &mut raw) })?;
            Ok(convert(raw))
        }))
    }

    /// Bind `ze_result_t fn(handle, Raw)` taking a converted input
    fn setter<H, In, Raw>(&self, name: &str, convert: fn(In) -> Raw) -> Binding2<H, In, ()>
    where
        H: Handle,
        In: 'static,
        Raw: Copy + 'static,
    {
        // SAFETY: caller pairs `name` with its by-value argument type
        let f: unsafe extern "C" fn(RawHandle, Raw) -> RawResult = unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |handle: H, value: In| {
            let _exports = &exports;
            // SAFETY: by-value scalar argument
            ZesError::check(unsafe { f(handle.as_raw() as RawHandle, convert(value)) })
        }))
    }

    /// Bind `ze_result_t fn(handle, const Raw*)` taking a borrowed input
    fn setter_ref<H, In, Raw>(&self, name: &str, convert: fn(&In) -> Raw) -> RefBinding<H, In>
    where
        H: Handle,
        In: 'static,
        Raw: Copy + 'static,
    {
        // SAFETY: caller pairs `name` with its input struct
        let f: unsafe extern "C" fn(RawHandle, *const Raw) -> RawResult =
            unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |handle: H, value: &In| {
            let _exports = &exports;
            let raw = convert(value);
            // SAFETY: `raw` outlives the call
            ZesError::check(unsafe { f(handle.as_raw() as RawHandle, &raw) })
        }))
    }

    /// Bind `ze_result_t fn(handle)`
    fn action<H: Handle>(&self, name: &str) -> Binding<H, ()> {
        // SAFETY: prototype takes only the handle
        let f: unsafe extern "C" fn(RawHandle) -> RawResult = unsafe { self.symbol(name)? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |handle: H| {
            let _exports = &exports;
            // SAFETY: no pointers are passed
            ZesError::check(unsafe { f(handle.as_raw() as RawHandle) })
        }))
    }

    fn table(&self) -> CapabilityTable {
        let mut t = CapabilityTable::default();

        self.bind_driver(&mut t);
        self.bind_device(&mut t);
        self.bind_overclock(&mut t);
        self.bind_diagnostics(&mut t);

        t.engine.get_properties =
            self.getter("zesEngineGetProperties", |raw: RawEngineProperties| {
                EngineProperties {
                    group: engine_group(raw.group),
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                }
            });
        t.engine.get_activity = self.getter("zesEngineGetActivity", |raw: RawCounterPair| {
            EngineStats {
                active_time: raw.first,
                timestamp: raw.timestamp,
            }
        });

        self.bind_fabric_port(&mut t);
        self.bind_fan(&mut t);

        t.firmware.get_properties =
            self.getter("zesFirmwareGetProperties", |raw: RawFirmwareProperties| {
                FirmwareProperties {
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                    can_control: flag(raw.can_control),
                    name: c_string(&raw.name),
                    version: c_string(&raw.version),
                }
            });
        t.firmware.flash = self.firmware_flash();
        t.firmware_exp.get_flash_progress =
            self.getter("zesFirmwareGetFlashProgress", |raw: u32| raw);

        self.bind_frequency(&mut t);
        self.bind_led(&mut t);
        self.bind_memory(&mut t);

        t.performance_factor.get_properties =
            self.getter("zesPerformanceFactorGetProperties", |raw: RawPerfProperties| {
                PerfProperties {
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                    engines: raw.engines,
                }
            });
        t.performance_factor.get_config =
            self.getter("zesPerformanceFactorGetConfig", |raw: f64| raw);
        t.performance_factor.set_config =
            self.setter("zesPerformanceFactorSetConfig", |factor: f64| factor);

        self.bind_power(&mut t);

        t.psu.get_properties = self.getter("zesPsuGetProperties", |raw: RawPsuProperties| {
            PsuProperties {
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                have_fan: flag(raw.have_fan),
                amp_limit: raw.amp_limit,
            }
        });
        t.psu.get_state = self.getter("zesPsuGetState", |raw: RawPsuState| PsuState {
            voltage_status: match raw.voltage_status {
                1 => PsuVoltageStatus::Normal,
                2 => PsuVoltageStatus::OverVoltage,
                3 => PsuVoltageStatus::UnderVoltage,
                _ => PsuVoltageStatus::Unknown,
            },
            fan_failed: flag(raw.fan_failed),
            temperature: raw.temperature,
            current: raw.current,
        });

        self.bind_ras(&mut t);
        self.bind_scheduler(&mut t);

        t.standby.get_properties =
            self.getter("zesStandbyGetProperties", |raw: RawStandbyProperties| {
                StandbyProperties {
                    standby_type: StandbyType::Global,
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                }
            });
        t.standby.get_mode = self.standby_get_mode();
        t.standby.set_mode =
            self.setter("zesStandbySetMode", |mode: StandbyPromoMode| mode as u32);

        self.bind_temperature(&mut t);
        self.bind_experimental(&mut t);

        t
    }

    fn bind_driver(&self, t: &mut CapabilityTable) {
        // SAFETY: ze_result_t zesDriverGet(uint32_t*, zes_driver_handle_t*)
        let driver_get: Option<unsafe extern "C" fn(*mut u32, *mut RawHandle) -> RawResult> =
            unsafe { self.symbol("zesDriverGet") };
        if let Some(f) = driver_get {
            let exports = Arc::clone(&self.exports);
            t.driver.get = Some(Box::new(
                move |count: &mut u32, out: Option<&mut [DriverHandle]>| {
                    let _exports = &exports;
                    let ptr = match out {
                        Some(buf) => {
                            clamp_count(count, buf.len());
                            buf.as_mut_ptr().cast::<RawHandle>()
                        }
                        None => std::ptr::null_mut(),
                    };
                    // SAFETY: buffer holds at least `*count` handles
                    ZesError::check(unsafe { f(count, ptr) })
                },
            ));
        }

        t.driver.get_extension_properties = self.list(
            "zesDriverGetExtensionProperties",
            |raw: &RawExtensionProperties| {
                Ok(DriverExtensionProperties {
                    name: c_string(&raw.name),
                    version: raw.version,
                })
            },
        );

        // SAFETY: ze_result_t (zes_driver_handle_t, const char*, void**)
        let address: Option<
            unsafe extern "C" fn(RawHandle, *const c_char, *mut *mut c_void) -> RawResult,
        > = unsafe { self.symbol("zesDriverGetExtensionFunctionAddress") };
        if let Some(f) = address {
            let exports = Arc::clone(&self.exports);
            t.driver.get_extension_function_address =
                Some(Box::new(move |driver: DriverHandle, name: &str| {
                    let _exports = &exports;
                    let name = CString::new(name).map_err(|_| ZesError::InvalidArgument)?;
                    let mut func: *mut c_void = std::ptr::null_mut();
                    // SAFETY: `name` is NUL-terminated and `func` is writable
                    ZesError::check(unsafe {
                        f(driver.as_raw() as RawHandle, name.as_ptr(), &mut func)
                    })?;
                    Ok(func as usize)
                }));
        }
    }

    fn bind_device(&self, t: &mut CapabilityTable) {
        let d = &mut t.device;

        d.get = self.enumeration("zesDeviceGet");
        d.get_properties = self.getter("zesDeviceGetProperties", |raw: RawDeviceProperties| {
            DeviceProperties {
                device_type: device_type(raw.core.device_type),
                uuid: DeviceUuid(raw.core.uuid),
                name: c_string(&raw.core.name),
                vendor_name: c_string(&raw.vendor_name),
                serial_number: c_string(&raw.serial_number),
                driver_version: c_string(&raw.driver_version),
                num_subdevices: raw.num_subdevices,
            }
        });
        d.get_state = self.getter("zesDeviceGetState", |raw: RawDeviceState| DeviceState {
            reset_required: ResetReasons {
                wedged: raw.reset & (1 << 0) != 0,
                repair: raw.reset & (1 << 1) != 0,
            },
            // ZES_REPAIR_STATUS_PERFORMED
            repaired: raw.repaired == 2,
        });
        d.reset = self.setter("zesDeviceReset", ze_bool);
        d.process_get_state = self.list("zesDeviceProcessesGetState", |raw: &RawProcessState| {
            Ok(ProcessUsage {
                process_id: raw.process_id,
                mem_size: raw.mem_size,
                shared_size: raw.shared_size,
                engines: raw.engines,
            })
        });
        d.pci_get_properties =
            self.getter("zesDevicePciGetProperties", |raw: RawPciProperties| {
                PciProperties {
                    address: pci_address(raw.address),
                    max_gen: raw.gen,
                    max_width: raw.width,
                }
            });
        d.ecc_available = self.getter("zesDeviceEccAvailable", flag);
        d.get_card_power_domain = self.getter("zesDeviceGetCardPowerDomain", |raw: usize| {
            PowerHandle::from_raw(raw)
        });

        d.enum_diagnostic_test_suites = self.enumeration("zesDeviceEnumDiagnosticTestSuites");
        d.enum_engine_groups = self.enumeration("zesDeviceEnumEngineGroups");
        d.enum_fabric_ports = self.enumeration("zesDeviceEnumFabricPorts");
        d.enum_fans = self.enumeration("zesDeviceEnumFans");
        d.enum_firmwares = self.enumeration("zesDeviceEnumFirmwares");
        d.enum_frequency_domains = self.enumeration("zesDeviceEnumFrequencyDomains");
        d.enum_leds = self.enumeration("zesDeviceEnumLeds");
        d.enum_memory_modules = self.enumeration("zesDeviceEnumMemoryModules");
        d.enum_performance_factor_domains =
            self.enumeration("zesDeviceEnumPerformanceFactorDomains");
        d.enum_power_domains = self.enumeration("zesDeviceEnumPowerDomains");
        d.enum_psus = self.enumeration("zesDeviceEnumPsus");
        d.enum_ras_error_sets = self.enumeration("zesDeviceEnumRasErrorSets");
        d.enum_schedulers = self.enumeration("zesDeviceEnumSchedulers");
        d.enum_standby_domains = self.enumeration("zesDeviceEnumStandbyDomains");
        d.enum_temperature_sensors = self.enumeration("zesDeviceEnumTemperatureSensors");
    }

    fn bind_overclock(&self, t: &mut CapabilityTable) {
        let o = &mut t.overclock;

        o.enum_domains = self.enumeration("zesDeviceEnumOverclockDomains");
        o.reset_settings = self.setter("zesDeviceResetOverclockSettings", ze_bool);
        o.get_domain_properties = self.getter(
            "zesOverclockGetDomainProperties",
            |raw: RawOverclockProperties| OverclockDomainProperties {
                domain: overclock_domain(raw.domain),
                available_controls: raw.available_controls,
            },
        );
        o.get_control_current_value = self.overclock_current_value();
        o.set_control_user_value = self.overclock_set_user_value();
    }

    fn bind_diagnostics(&self, t: &mut CapabilityTable) {
        t.diagnostics.get_properties =
            self.getter("zesDiagnosticsGetProperties", |raw: RawDiagProperties| {
                DiagnosticsProperties {
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                    name: c_string(&raw.name),
                    have_tests: flag(raw.have_tests),
                }
            });
        t.diagnostics.get_tests = self.list("zesDiagnosticsGetTests", |raw: &RawDiagTest| {
            Ok(DiagnosticsTest {
                index: raw.index,
                name: c_string(&raw.name),
            })
        });
        t.diagnostics.run_tests = self.diagnostics_run_tests();
    }

    fn bind_fabric_port(&self, t: &mut CapabilityTable) {
        let p = &mut t.fabric_port;

        p.get_properties = self.getter(
            "zesFabricPortGetProperties",
            |raw: RawFabricPortProperties| FabricPortProperties {
                model: c_string(&raw.model),
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                port_id: fabric_port_id(raw.port_id),
                max_rx_speed: raw.max_rx_speed.bit_rate,
                max_tx_speed: raw.max_tx_speed.bit_rate,
            },
        );
        p.get_config = self.getter("zesFabricPortGetConfig", |raw: RawFabricPortConfig| {
            FabricPortConfig {
                enabled: flag(raw.enabled),
                beaconing: flag(raw.beaconing),
            }
        });
        p.set_config =
            self.setter_ref("zesFabricPortSetConfig", |config: &FabricPortConfig| {
                RawFabricPortConfig {
                    enabled: ze_bool(config.enabled),
                    beaconing: ze_bool(config.beaconing),
                    ..RawFabricPortConfig::default()
                }
            });
        p.get_state = self.getter("zesFabricPortGetState", |raw: RawFabricPortState| {
            let status = fabric_port_status(raw.status);
            // The remote port is only reported for connected ports
            let connected = matches!(
                status,
                FabricPortStatus::Healthy | FabricPortStatus::Degraded
            );
            FabricPortState {
                status,
                remote_port_id: connected.then(|| fabric_port_id(raw.remote_port_id)),
            }
        });
        p.get_throughput =
            self.getter("zesFabricPortGetThroughput", |raw: RawPortThroughput| {
                FabricPortThroughput {
                    timestamp: raw.timestamp,
                    rx_counter: raw.rx_counter,
                    tx_counter: raw.tx_counter,
                }
            });
    }

    fn bind_fan(&self, t: &mut CapabilityTable) {
        let f = &mut t.fan;

        f.get_properties = self.getter("zesFanGetProperties", |raw: RawFanProperties| {
            FanProperties {
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                can_control: flag(raw.can_control),
                supported_modes: raw.supported_modes,
                supported_units: raw.supported_units,
                max_rpm: raw.max_rpm,
                max_points: raw.max_points,
            }
        });
        f.get_config = self.getter("zesFanGetConfig", fan_config);
        f.set_default_mode = self.action("zesFanSetDefaultMode");
        f.set_fixed_speed_mode = self.setter_ref("zesFanSetFixedSpeedMode", raw_fan_speed);
        f.get_state = self.fan_get_state();
    }

    fn bind_frequency(&self, t: &mut CapabilityTable) {
        let f = &mut t.frequency;

        f.get_properties = self.getter("zesFrequencyGetProperties", |raw: RawFreqProperties| {
            FreqProperties {
                domain: frequency_domain(raw.domain),
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                can_control: flag(raw.can_control),
                is_throttle_event_supported: flag(raw.is_throttle_event_supported),
                min: raw.min,
                max: raw.max,
            }
        });
        f.get_available_clocks = self.frequency_available_clocks();
        f.get_range = self.getter("zesFrequencyGetRange", |raw: RawFreqRange| FreqRange {
            min: raw.min,
            max: raw.max,
        });
        f.set_range = self.setter_ref("zesFrequencySetRange", |range: &FreqRange| {
            RawFreqRange {
                min: range.min,
                max: range.max,
            }
        });
        f.get_state = self.getter("zesFrequencyGetState", |raw: RawFreqState| FreqState {
            current_voltage: raw.current_voltage,
            request: raw.request,
            tdp: raw.tdp,
            efficient: raw.efficient,
            actual: raw.actual,
            throttle_reasons: ThrottleReasons::from_bits(raw.throttle_reasons),
        });
        f.get_throttle_time =
            self.getter("zesFrequencyGetThrottleTime", |raw: RawCounterPair| {
                FreqThrottleTime {
                    throttle_time: raw.first,
                    timestamp: raw.timestamp,
                }
            });
    }

    fn bind_led(&self, t: &mut CapabilityTable) {
        let l = &mut t.led;

        l.get_properties = self.getter("zesLedGetProperties", |raw: RawLedProperties| {
            LedProperties {
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                can_control: flag(raw.can_control),
                have_rgb: flag(raw.have_rgb),
            }
        });
        l.get_state = self.getter("zesLedGetState", |raw: RawLedState| LedState {
            is_on: flag(raw.is_on),
            color: LedColor {
                red: raw.color.red,
                green: raw.color.green,
                blue: raw.color.blue,
            },
        });
        l.set_state = self.setter("zesLedSetState", ze_bool);
        l.set_color = self.setter_ref("zesLedSetColor", |color: &LedColor| RawLedColor {
            red: color.red,
            green: color.green,
            blue: color.blue,
        });
    }

    fn bind_memory(&self, t: &mut CapabilityTable) {
        let m = &mut t.memory;

        m.get_properties = self.getter("zesMemoryGetProperties", |raw: RawMemProperties| {
            MemProperties {
                mem_type: mem_type(raw.mem_type),
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                location: mem_location(raw.location),
                physical_size: raw.physical_size,
                bus_width: raw.bus_width,
                num_channels: raw.num_channels,
            }
        });
        m.get_state = self.getter("zesMemoryGetState", |raw: RawMemState| MemState {
            health: mem_health(raw.health),
            free: raw.free,
            size: raw.size,
        });
        m.get_bandwidth = self.getter("zesMemoryGetBandwidth", |raw: RawMemBandwidth| {
            MemBandwidth {
                read_counter: raw.read_counter,
                write_counter: raw.write_counter,
                max_bandwidth: raw.max_bandwidth,
                timestamp: raw.timestamp,
            }
        });
    }

    fn bind_power(&self, t: &mut CapabilityTable) {
        let p = &mut t.power;

        p.get_properties = self.getter("zesPowerGetProperties", |raw: RawPowerProperties| {
            PowerProperties {
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                can_control: flag(raw.can_control),
                is_energy_threshold_supported: flag(raw.is_energy_threshold_supported),
                default_limit: raw.default_limit,
                min_limit: raw.min_limit,
                max_limit: raw.max_limit,
            }
        });
        p.get_energy_counter =
            self.getter("zesPowerGetEnergyCounter", |raw: RawEnergyCounter| {
                PowerEnergyCounter {
                    energy: raw.energy,
                    timestamp: raw.timestamp,
                }
            });
        p.get_limits_ext = self.list("zesPowerGetLimitsExt", power_limit);
        p.set_limits_ext = self.power_set_limits_ext();
        p.get_energy_threshold =
            self.getter("zesPowerGetEnergyThreshold", |raw: RawEnergyThreshold| {
                EnergyThreshold {
                    enable: flag(raw.enable),
                    threshold: raw.threshold,
                    process_id: raw.process_id,
                }
            });
        p.set_energy_threshold =
            self.setter("zesPowerSetEnergyThreshold", |joules: f64| joules);
    }

    fn bind_ras(&self, t: &mut CapabilityTable) {
        t.ras.get_properties = self.getter("zesRasGetProperties", |raw: RawRasProperties| {
            RasProperties {
                error_type: match raw.error_type {
                    1 => RasErrorType::Uncorrectable,
                    _ => RasErrorType::Correctable,
                },
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
            }
        });
        t.ras.get_config = self.getter("zesRasGetConfig", |raw: RawRasConfig| RasConfig {
            total_threshold: raw.total_threshold,
            detailed_thresholds: raw.detailed_thresholds.category,
        });
        t.ras.set_config = self.setter_ref("zesRasSetConfig", |config: &RasConfig| {
            let mut raw = RawRasConfig {
                total_threshold: config.total_threshold,
                ..RawRasConfig::default()
            };
            raw.detailed_thresholds.category = config.detailed_thresholds;
            raw
        });
        t.ras.get_state = self.ras_get_state();

        t.ras_exp.get_state_exp = self.list("zesRasGetStateExp", |raw: &RawRasStateExp| {
            Ok(RasStateExp {
                category: ras_category(raw.category)?,
                error_counter: raw.error_counter,
            })
        });
        t.ras_exp.clear_state_exp =
            self.setter("zesRasClearStateExp", |category: RasErrorCategoryExp| {
                category as u32
            });
    }

    fn bind_scheduler(&self, t: &mut CapabilityTable) {
        let s = &mut t.scheduler;

        s.get_properties = self.getter("zesSchedulerGetProperties", |raw: RawSchedProperties| {
            SchedProperties {
                on_subdevice: flag(raw.on_subdevice),
                subdevice_id: raw.subdevice_id,
                can_control: flag(raw.can_control),
                engines: raw.engines,
                supported_modes: raw.supported_modes,
            }
        });
        s.get_current_mode = self.scheduler_current_mode();
        s.set_timeout_mode = self.scheduler_set_timeout_mode();
        s.set_exclusive_mode = self.getter("zesSchedulerSetExclusiveMode", flag);
    }

    fn bind_temperature(&self, t: &mut CapabilityTable) {
        let p = &mut t.temperature;

        p.get_properties =
            self.getter("zesTemperatureGetProperties", |raw: RawTempProperties| {
                TempProperties {
                    sensor: temp_sensor(raw.sensor),
                    on_subdevice: flag(raw.on_subdevice),
                    subdevice_id: raw.subdevice_id,
                    max_temperature: raw.max_temperature,
                    is_critical_temp_supported: flag(raw.is_critical_temp_supported),
                    is_threshold1_supported: flag(raw.is_threshold1_supported),
                    is_threshold2_supported: flag(raw.is_threshold2_supported),
                }
            });
        p.get_config = self.getter("zesTemperatureGetConfig", |raw: RawTempConfig| {
            TempConfig {
                enable_critical: flag(raw.enable_critical),
                threshold1: temp_threshold(raw.threshold1),
                threshold2: temp_threshold(raw.threshold2),
            }
        });
        p.set_config = self.setter_ref("zesTemperatureSetConfig", |config: &TempConfig| {
            RawTempConfig {
                enable_critical: ze_bool(config.enable_critical),
                threshold1: raw_temp_threshold(&config.threshold1),
                threshold2: raw_temp_threshold(&config.threshold2),
                ..RawTempConfig::default()
            }
        });
        p.get_state = self.getter("zesTemperatureGetState", |raw: f64| raw);
    }

    fn bind_experimental(&self, t: &mut CapabilityTable) {
        t.device_exp.get_sub_device_properties_exp = self.list(
            "zesDeviceGetSubDevicePropertiesExp",
            |raw: &RawSubdeviceProperties| {
                Ok(SubdeviceProperties {
                    subdevice_id: raw.subdevice_id,
                    uuid: DeviceUuid(raw.uuid.id),
                })
            },
        );
        t.device_exp.enum_active_vf_exp = self.enumeration("zesDeviceEnumActiveVFExp");

        t.driver_exp.get_device_by_uuid_exp = self.device_by_uuid();

        let v = &mut t.vf_management_exp;
        v.get_vf_properties_exp =
            self.getter("zesVFManagementGetVFPropertiesExp", |raw: RawVfProperties| {
                VfProperties {
                    address: pci_address(raw.address),
                    uuid: DeviceUuid(raw.uuid.id),
                    flags: raw.flags,
                }
            });
        v.get_vf_memory_util_exp = self.list(
            "zesVFManagementGetVFMemoryUtilizationExp",
            |raw: &RawVfUtilMem| {
                Ok(VfMemoryUtil {
                    location: mem_location(raw.location),
                    free: raw.free,
                })
            },
        );
        v.get_vf_engine_util_exp = self.list(
            "zesVFManagementGetVFEngineUtilizationExp",
            |raw: &RawVfUtilEngine| {
                Ok(VfEngineUtil {
                    group: engine_group(raw.group),
                    active_counter_value: raw.active_counter_value,
                    sampling_counter_value: raw.sampling_counter_value,
                    timestamp: raw.timestamp,
                })
            },
        );
        v.set_vf_telemetry_mode_exp = self.vf_set_telemetry_mode();
    }

    fn overclock_current_value(&self) -> Binding2<OverclockHandle, OverclockControl, f64> {
        // SAFETY: ze_result_t (zes_overclock_handle_t, zes_overclock_control_t, double*)
        let f: unsafe extern "C" fn(RawHandle, u32, *mut f64) -> RawResult =
            unsafe { self.symbol("zesOverclockGetControlCurrentValue")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |overclock: OverclockHandle, control: OverclockControl| {
                let _exports = &exports;
                let mut value = 0.0;
                // SAFETY: `value` is writable
                ZesError::check(unsafe {
                    f(overclock.as_raw() as RawHandle, control as u32, &mut value)
                })?;
                Ok(value)
            },
        ))
    }

    fn overclock_set_user_value(
        &self,
    ) -> Option<
        Box<
            dyn Fn(OverclockHandle, OverclockControl, f64) -> ZeResult<PendingAction>
                + Send
                + Sync,
        >,
    > {
        // SAFETY: ze_result_t (zes_overclock_handle_t, zes_overclock_control_t,
        // double, zes_pending_action_t*)
        let f: unsafe extern "C" fn(RawHandle, u32, f64, *mut u32) -> RawResult =
            unsafe { self.symbol("zesOverclockSetControlUserValue")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |overclock: OverclockHandle, control: OverclockControl, value: f64| {
                let _exports = &exports;
                let mut action = 0u32;
                // SAFETY: `action` is writable
                ZesError::check(unsafe {
                    f(
                        overclock.as_raw() as RawHandle,
                        control as u32,
                        value,
                        &mut action,
                    )
                })?;
                Ok(pending_action(action))
            },
        ))
    }

    fn diagnostics_run_tests(
        &self,
    ) -> Option<Box<dyn Fn(DiagnosticsHandle, u32, u32) -> ZeResult<DiagnosticsResult> + Send + Sync>>
    {
        // SAFETY: ze_result_t (zes_diag_handle_t, uint32_t, uint32_t, zes_diag_result_t*)
        let f: unsafe extern "C" fn(RawHandle, u32, u32, *mut u32) -> RawResult =
            unsafe { self.symbol("zesDiagnosticsRunTests")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |diagnostics: DiagnosticsHandle, start: u32, end: u32| {
                let _exports = &exports;
                let mut raw = 0u32;
                // SAFETY: `raw` is writable
                ZesError::check(unsafe {
                    f(diagnostics.as_raw() as RawHandle, start, end, &mut raw)
                })?;
                DiagnosticsResult::from_raw(raw).ok_or(ZesError::Unknown)
            },
        ))
    }

    fn fan_get_state(&self) -> Binding2<FanHandle, FanSpeedUnits, i32> {
        // SAFETY: ze_result_t (zes_fan_handle_t, zes_fan_speed_units_t, int32_t*)
        let f: unsafe extern "C" fn(RawHandle, u32, *mut i32) -> RawResult =
            unsafe { self.symbol("zesFanGetState")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |fan: FanHandle, units: FanSpeedUnits| {
            let _exports = &exports;
            let mut speed = -1;
            // SAFETY: `speed` is writable
            ZesError::check(unsafe { f(fan.as_raw() as RawHandle, units as u32, &mut speed) })?;
            Ok(speed)
        }))
    }

    fn firmware_flash(
        &self,
    ) -> Option<Box<dyn Fn(FirmwareHandle, &[u8]) -> ZeResult<()> + Send + Sync>> {
        // SAFETY: ze_result_t (zes_firmware_handle_t, void*, uint32_t)
        let f: unsafe extern "C" fn(RawHandle, *mut c_void, u32) -> RawResult =
            unsafe { self.symbol("zesFirmwareFlash")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |firmware: FirmwareHandle, image: &[u8]| {
            let _exports = &exports;
            let size = u32::try_from(image.len()).map_err(|_| ZesError::InvalidSize)?;
            // SAFETY: the driver only reads `size` bytes from the image
            ZesError::check(unsafe {
                f(
                    firmware.as_raw() as RawHandle,
                    image.as_ptr() as *mut c_void,
                    size,
                )
            })
        }))
    }

    fn frequency_available_clocks(&self) -> EnumBinding<FrequencyHandle, f64> {
        // SAFETY: ze_result_t (zes_freq_handle_t, uint32_t*, double*)
        let f: unsafe extern "C" fn(RawHandle, *mut u32, *mut f64) -> RawResult =
            unsafe { self.symbol("zesFrequencyGetAvailableClocks")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |frequency: FrequencyHandle, count: &mut u32, out: Option<&mut [f64]>| {
                let _exports = &exports;
                let ptr = match out {
                    Some(buf) => {
                        clamp_count(count, buf.len());
                        buf.as_mut_ptr()
                    }
                    None => std::ptr::null_mut(),
                };
                // SAFETY: buffer holds at least `*count` entries
                ZesError::check(unsafe { f(frequency.as_raw() as RawHandle, count, ptr) })
            },
        ))
    }

    fn power_set_limits_ext(
        &self,
    ) -> Option<Box<dyn Fn(PowerHandle, &[PowerLimitDescriptor]) -> ZeResult<()> + Send + Sync>>
    {
        // SAFETY: ze_result_t (zes_pwr_handle_t, uint32_t*, zes_power_limit_ext_desc_t*)
        let f: unsafe extern "C" fn(RawHandle, *mut u32, *mut RawPowerLimitExt) -> RawResult =
            unsafe { self.symbol("zesPowerSetLimitsExt")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |power: PowerHandle, limits: &[PowerLimitDescriptor]| {
                let _exports = &exports;
                let mut raw: Vec<RawPowerLimitExt> = limits.iter().map(raw_power_limit).collect();
                let mut count = u32::try_from(raw.len()).map_err(|_| ZesError::InvalidSize)?;
                // SAFETY: `raw` holds exactly `count` descriptors
                ZesError::check(unsafe {
                    f(power.as_raw() as RawHandle, &mut count, raw.as_mut_ptr())
                })
            },
        ))
    }

    fn ras_get_state(&self) -> Binding2<RasHandle, bool, RasState> {
        // SAFETY: ze_result_t (zes_ras_handle_t, ze_bool_t, zes_ras_state_t*)
        let f: unsafe extern "C" fn(RawHandle, ZeBool, *mut RawRasState) -> RawResult =
            unsafe { self.symbol("zesRasGetState")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |ras: RasHandle, clear: bool| {
            let _exports = &exports;
            let mut raw = RawRasState::default();
            // SAFETY: `raw` is writable
            ZesError::check(unsafe { f(ras.as_raw() as RawHandle, ze_bool(clear), &mut raw) })?;
            Ok(RasState {
                category: raw.category,
            })
        }))
    }

    fn scheduler_current_mode(&self) -> Binding<SchedulerHandle, SchedMode> {
        let get = self.getter("zesSchedulerGetCurrentMode", |raw: u32| raw)?;
        Some(Box::new(move |scheduler: SchedulerHandle| {
            SchedMode::from_raw(get(scheduler)?).ok_or(ZesError::Unknown)
        }))
    }

    fn scheduler_set_timeout_mode(
        &self,
    ) -> Option<
        Box<dyn Fn(SchedulerHandle, &SchedTimeoutProperties) -> ZeResult<bool> + Send + Sync>,
    > {
        // SAFETY: ze_result_t (zes_sched_handle_t, zes_sched_timeout_properties_t*, ze_bool_t*)
        let f: unsafe extern "C" fn(RawHandle, *mut RawSchedTimeoutProperties, *mut ZeBool) -> RawResult =
            unsafe { self.symbol("zesSchedulerSetTimeoutMode")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(
            move |scheduler: SchedulerHandle, properties: &SchedTimeoutProperties| {
                let _exports = &exports;
                let mut raw = RawSchedTimeoutProperties {
                    watchdog_timeout: properties.watchdog_timeout,
                    ..RawSchedTimeoutProperties::default()
                };
                let mut need_reload: ZeBool = 0;
                // SAFETY: both pointers refer to locals that outlive the call
                ZesError::check(unsafe {
                    f(scheduler.as_raw() as RawHandle, &mut raw, &mut need_reload)
                })?;
                Ok(flag(need_reload))
            },
        ))
    }

    fn standby_get_mode(&self) -> Binding<StandbyHandle, StandbyPromoMode> {
        let get = self.getter("zesStandbyGetMode", |raw: u32| raw)?;
        Some(Box::new(move |standby: StandbyHandle| {
            StandbyPromoMode::from_raw(get(standby)?).ok_or(ZesError::Unknown)
        }))
    }

    fn device_by_uuid(
        &self,
    ) -> Option<Box<dyn Fn(DriverHandle, &DeviceUuid) -> ZeResult<DeviceByUuid> + Send + Sync>>
    {
        // SAFETY: ze_result_t (zes_driver_handle_t, zes_uuid_t, zes_device_handle_t*,
        // ze_bool_t*, uint32_t*)
        let f: unsafe extern "C" fn(
            RawHandle,
            RawUuid,
            *mut RawHandle,
            *mut ZeBool,
            *mut u32,
        ) -> RawResult = unsafe { self.symbol("zesDriverGetDeviceByUuidExp")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |driver: DriverHandle, uuid: &DeviceUuid| {
            let _exports = &exports;
            let mut device: RawHandle = std::ptr::null_mut();
            let mut on_subdevice: ZeBool = 0;
            let mut subdevice_id = 0u32;
            // SAFETY: every output pointer refers to a writable local
            ZesError::check(unsafe {
                f(
                    driver.as_raw() as RawHandle,
                    RawUuid { id: uuid.0 },
                    &mut device,
                    &mut on_subdevice,
                    &mut subdevice_id,
                )
            })?;
            Ok(DeviceByUuid {
                device: DeviceHandle::from_raw(device as usize),
                on_subdevice: flag(on_subdevice),
                subdevice_id,
            })
        }))
    }

    fn vf_set_telemetry_mode(&self) -> Option<Box<dyn Fn(VfHandle, u32, bool) -> ZeResult<()> + Send + Sync>> {
        // SAFETY: ze_result_t (zes_vf_handle_t, zes_vf_info_util_exp_flags_t, ze_bool_t)
        let f: unsafe extern "C" fn(RawHandle, u32, ZeBool) -> RawResult =
            unsafe { self.symbol("zesVFManagementSetVFTelemetryModeExp")? };
        let exports = Arc::clone(&self.exports);

        Some(Box::new(move |vf: VfHandle, flags: u32, enable: bool| {
            let _exports = &exports;
            // SAFETY: scalar arguments only
            ZesError::check(unsafe { f(vf.as_raw() as RawHandle, flags, ze_bool(enable)) })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysman::{SysmanGate, OPERATIONS};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU8, Ordering};

    const SUCCESS: RawResult = ZesError::SUCCESS;

    /// In-process stand-in for the loader library
    #[derive(Default)]
    struct FakeExports(HashMap<&'static str, usize>);

    impl FakeExports {
        fn with(mut self, name: &'static str, address: usize) -> Self {
            self.0.insert(name, address);
            self
        }
    }

    impl Exports for FakeExports {
        fn address(&self, name: &str) -> Option<*mut c_void> {
            self.0.get(name).map(|&address| address as *mut c_void)
        }
    }

    /// Loader that binds [`FakeExports`] instead of opening a library
    struct FakeLoader {
        loader: LevelZeroLoader,
        exports: fn() -> FakeExports,
    }

    impl Loader for FakeLoader {
        fn name(&self) -> &str {
            "fake"
        }

        fn load(&self, flags: InitFlags) -> ZeResult<CapabilityTable> {
            self.loader.bind(Arc::new((self.exports)()), flags)
        }
    }

    extern "C" fn init_ok(_flags: u32) -> RawResult {
        SUCCESS
    }

    extern "C" fn init_device_lost(_flags: u32) -> RawResult {
        ZesError::DeviceLost.code()
    }

    const DRIVERS: [usize; 3] = [0x10, 0x20, 0x30];

    extern "C" fn driver_get(count: *mut u32, drivers: *mut RawHandle) -> RawResult {
        // SAFETY: the binding passes a valid count and a buffer of `*count` entries
        unsafe {
            if drivers.is_null() {
                *count = DRIVERS.len() as u32;
            } else {
                let n = (*count as usize).min(DRIVERS.len());
                for (i, driver) in DRIVERS.iter().take(n).enumerate() {
                    *drivers.add(i) = *driver as RawHandle;
                }
                *count = n as u32;
            }
        }
        SUCCESS
    }

    static FIXED_SPEED: AtomicI32 = AtomicI32::new(0);
    static FIXED_UNITS: AtomicU32 = AtomicU32::new(u32::MAX);

    extern "C" fn fan_set_fixed_speed_mode(_fan: RawHandle, speed: *const RawFanSpeed) -> RawResult {
        // SAFETY: the binding passes a pointer to a live RawFanSpeed
        let speed = unsafe { *speed };
        FIXED_SPEED.store(speed.speed, Ordering::SeqCst);
        FIXED_UNITS.store(speed.units, Ordering::SeqCst);
        SUCCESS
    }

    extern "C" fn frequency_get_state(_freq: RawHandle, state: *mut RawFreqState) -> RawResult {
        // SAFETY: the binding passes a writable, tagged RawFreqState
        unsafe {
            if (*state).stype != STYPE_FREQ_STATE {
                return ZesError::InvalidArgument.code();
            }
            (*state).actual = 1200.0;
            (*state).throttle_reasons = 1 << 3;
        }
        SUCCESS
    }

    extern "C" fn temperature_get_properties(
        _temp: RawHandle,
        props: *mut RawTempProperties,
    ) -> RawResult {
        // SAFETY: the binding passes a writable, tagged RawTempProperties
        unsafe {
            if (*props).stype != STYPE_TEMP_PROPERTIES {
                return ZesError::InvalidArgument.code();
            }
            (*props).sensor = 1;
            (*props).max_temperature = 105.0;
            (*props).is_critical_temp_supported = 1;
            (*props).is_threshold2_supported = 0;
        }
        SUCCESS
    }

    static RAS_CLEAR: AtomicU8 = AtomicU8::new(u8::MAX);

    extern "C" fn ras_get_state(_ras: RawHandle, clear: ZeBool, state: *mut RawRasState) -> RawResult {
        RAS_CLEAR.store(clear, Ordering::SeqCst);
        // SAFETY: the binding passes a writable RawRasState
        unsafe {
            (*state).category = [1, 0, 2, 0, 0, 0, 0];
        }
        SUCCESS
    }

    extern "C" fn diagnostics_get_tests(
        _diag: RawHandle,
        count: *mut u32,
        tests: *mut RawDiagTest,
    ) -> RawResult {
        // SAFETY: the binding passes a valid count and `*count` entries
        unsafe {
            if tests.is_null() {
                *count = 4;
                return SUCCESS;
            }
            let n = (*count).min(4);
            for i in 0..n {
                let test = &mut *tests.add(i as usize);
                test.index = i;
                test.name[0] = b'T' as c_char;
                test.name[1] = (b'0' + i as u8) as c_char;
            }
            *count = n;
        }
        SUCCESS
    }

    fn fixture() -> FakeExports {
        FakeExports::default()
            .with("zesInit", init_ok as usize)
            .with("zesDriverGet", driver_get as usize)
            .with("zesFanSetFixedSpeedMode", fan_set_fixed_speed_mode as usize)
            .with("zesFrequencyGetState", frequency_get_state as usize)
            .with("zesTemperatureGetProperties", temperature_get_properties as usize)
            .with("zesRasGetState", ras_get_state as usize)
            .with("zesDiagnosticsGetTests", diagnostics_get_tests as usize)
    }

    fn fixture_gate() -> SysmanGate {
        let gate = SysmanGate::new(FakeLoader {
            loader: LevelZeroLoader::new(),
            exports: fixture,
        });
        gate.init(InitFlags::NONE).unwrap();
        gate
    }

    #[test]
    fn test_candidates_prefer_configured_paths() {
        let loader = LevelZeroLoader::new().with_library_paths(["/opt/ze/libze_loader.so.1"]);
        let candidates = loader.candidates();
        assert_eq!(candidates[0], PathBuf::from("/opt/ze/libze_loader.so.1"));
        assert_eq!(candidates.len(), 1 + DEFAULT_LIBRARIES.len());
    }

    #[test]
    fn test_missing_library_is_uninitialized() {
        let result = open_any([PathBuf::from("/nonexistent/libze_loader.so.1")]);
        assert!(matches!(result, Err(ZesError::Uninitialized)));
    }

    #[test]
    fn test_exported_symbols_are_bound() {
        let gate = fixture_gate();
        let table = gate.table().unwrap();
        let supported = table.supported();

        assert!(supported.contains(&("driver", "driver_get")));
        assert!(supported.contains(&("fan", "fan_set_fixed_speed_mode")));
        assert!(supported.contains(&("frequency", "frequency_get_state")));
        assert!(supported.contains(&("diagnostics", "diagnostics_get_tests")));
        assert_eq!(supported.len(), 6);
        assert_eq!(table.missing().len(), OPERATIONS.len() - 6);
    }

    #[test]
    fn test_unexported_symbols_are_unsupported() {
        let gate = fixture_gate();
        assert_eq!(
            gate.fan_set_default_mode(FanHandle::from_raw(1)),
            Err(ZesError::UnsupportedFeature)
        );
        assert_eq!(
            gate.memory_get_state(MemoryHandle::from_raw(1)),
            Err(ZesError::UnsupportedFeature)
        );
    }

    #[test]
    fn test_fixed_speed_passes_struct_by_pointer() {
        let gate = fixture_gate();
        let speed = FanSpeed::percent(FanPercent::new(60).unwrap());

        gate.fan_set_fixed_speed_mode(FanHandle::from_raw(1), &speed)
            .unwrap();

        assert_eq!(FIXED_SPEED.load(Ordering::SeqCst), 60);
        assert_eq!(
            FIXED_UNITS.load(Ordering::SeqCst),
            FanSpeedUnits::Percent as u32
        );
    }

    #[test]
    fn test_getter_tags_and_converts_output() {
        let gate = fixture_gate();

        let state = gate.frequency_get_state(FrequencyHandle::from_raw(1)).unwrap();
        assert_eq!(state.actual, 1200.0);
        assert!(state.throttle_reasons.thermal_limit);
        assert!(!state.throttle_reasons.ave_pwr_cap);

        let props = gate
            .temperature_get_properties(TemperatureHandle::from_raw(1))
            .unwrap();
        assert_eq!(props.sensor, TempSensor::Gpu);
        assert_eq!(props.max_temperature, 105.0);
        assert!(props.is_critical_temp_supported);
        assert!(!props.is_threshold2_supported);
    }

    #[test]
    fn test_bool_argument_is_passed_as_ze_bool() {
        let gate = fixture_gate();

        let state = gate.ras_get_state(RasHandle::from_raw(1), true).unwrap();
        assert_eq!(state.total(), 3);
        assert_eq!(RAS_CLEAR.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_driver_get_clamps_count_to_buffer() {
        let gate = fixture_gate();

        let mut count = 0;
        gate.driver_get(&mut count, None).unwrap();
        assert_eq!(count, 3);

        let mut buf = [DriverHandle::default(); 2];
        let mut count = 5;
        gate.driver_get(&mut count, Some(&mut buf)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(buf, [DriverHandle::from_raw(0x10), DriverHandle::from_raw(0x20)]);
        assert!(gate.is_sysman_in_use());
    }

    #[test]
    fn test_struct_list_converts_entries() {
        let gate = fixture_gate();
        let diag = DiagnosticsHandle::from_raw(1);

        let tests = crate::sysman::enumerate(|count, buf| {
            gate.diagnostics_get_tests(diag, count, buf)
        })
        .unwrap();
        assert_eq!(tests.len(), 4);
        assert_eq!(tests[2].index, 2);
        assert_eq!(tests[2].name, "T2");

        let mut buf = vec![DiagnosticsTest::default(); 1];
        let mut count = 4;
        gate.diagnostics_get_tests(diag, &mut count, Some(&mut buf))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(buf[0].name, "T0");
    }

    #[test]
    fn test_disabled_operation_is_left_unbound() {
        let loader = LevelZeroLoader::new().with_disabled(["frequency_get_state"]);
        let table = loader.bind(Arc::new(fixture()), InitFlags::NONE).unwrap();

        assert!(table.frequency.get_state.is_none());
        assert!(table.fan.set_fixed_speed_mode.is_some());
    }

    #[test]
    fn test_init_failure_is_mapped() {
        let exports = FakeExports::default().with("zesInit", init_device_lost as usize);
        let result = LevelZeroLoader::new().bind(Arc::new(exports), InitFlags::NONE);
        assert!(matches!(result, Err(ZesError::DeviceLost)));
    }

    #[test]
    fn test_missing_init_symbol_is_uninitialized() {
        let exports = FakeExports::default().with("zesDriverGet", driver_get as usize);
        let result = LevelZeroLoader::new().bind(Arc::new(exports), InitFlags::NONE);
        assert!(matches!(result, Err(ZesError::Uninitialized)));
    }

    #[test]
    fn test_clamp_count() {
        let mut count = 8;
        clamp_count(&mut count, 3);
        assert_eq!(count, 3);

        let mut count = 2;
        clamp_count(&mut count, 3);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_c_string_stops_at_nul() {
        let mut buf = [0 as c_char; 8];
        for (i, b) in b"Arc".iter().enumerate() {
            buf[i] = *b as c_char;
        }
        assert_eq!(c_string(&buf), "Arc");
    }

    #[test]
    fn test_c_string_without_nul_uses_whole_buffer() {
        let buf = [b'a' as c_char; 4];
        assert_eq!(c_string(&buf), "aaaa");
    }

    #[test]
    fn test_ze_bool_round_trip() {
        assert_eq!(ze_bool(true), 1);
        assert_eq!(ze_bool(false), 0);
        assert!(flag(1));
        assert!(flag(0xff));
        assert!(!flag(0));
    }

    #[test]
    fn test_defaults_set_structure_type() {
        let raw = RawDeviceProperties::default();
        assert_eq!(raw.stype, STYPE_DEVICE_PROPERTIES);
        assert_eq!(raw.core.stype, ZE_STYPE_DEVICE_PROPERTIES);
        assert_eq!(raw.num_subdevices, 0);

        let ras = RawRasConfig::default();
        assert_eq!(ras.stype, STYPE_RAS_CONFIG);
        assert_eq!(ras.detailed_thresholds.stype, STYPE_RAS_STATE);

        assert_eq!(RawFanConfig::default().stype, STYPE_FAN_CONFIG);
        assert!(RawFanConfig::default().p_next.is_null());
    }

    #[test]
    fn test_fan_config_clamps_table_points() {
        let mut raw = RawFanConfig::default();
        raw.mode = 2;
        raw.speed_table.num_points = 40;
        raw.speed_table.table[0] = RawFanTempSpeed {
            temperature: 50,
            speed: RawFanSpeed { speed: 30, units: 1 },
        };
        let config = fan_config(raw);
        assert_eq!(config.mode, FanSpeedMode::Table);
        assert_eq!(config.speed_table.len(), FAN_TEMP_SPEED_PAIR_COUNT);
        assert_eq!(config.speed_table[0].speed.speed, 30);

        raw.speed_table.num_points = -1;
        assert!(fan_config(raw).speed_table.is_empty());
    }

    #[test]
    fn test_ras_category_rejects_unknown_values() {
        assert_eq!(ras_category(7), Ok(RasErrorCategoryExp::MemoryErrors));
        assert_eq!(ras_category(42), Err(ZesError::Unknown));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_struct_layouts_match_c() {
        use std::mem::{offset_of, size_of};

        assert_eq!(size_of::<RawCoreDeviceProperties>(), 368);
        assert_eq!(size_of::<RawDeviceProperties>(), 776);
        assert_eq!(offset_of!(RawDeviceProperties, num_subdevices), 384);
        assert_eq!(size_of::<RawPciProperties>(), 56);
        assert_eq!(size_of::<RawEnergyThreshold>(), 24);
        assert_eq!(size_of::<RawFanSpeed>(), 8);
        assert_eq!(size_of::<RawFanSpeedTable>(), 388);
        assert_eq!(size_of::<RawFanConfig>(), 416);
        assert_eq!(offset_of!(RawFanConfig, speed_table), 28);
        assert_eq!(size_of::<RawFreqState>(), 64);
        assert_eq!(offset_of!(RawFreqState, throttle_reasons), 56);
        assert_eq!(size_of::<RawMemState>(), 40);
        assert_eq!(size_of::<RawPowerProperties>(), 40);
        assert_eq!(offset_of!(RawPowerProperties, default_limit), 28);
        assert_eq!(size_of::<RawTempConfig>(), 56);
        assert_eq!(offset_of!(RawTempProperties, max_temperature), 32);
        assert_eq!(size_of::<RawRasConfig>(), 96);
    }

    #[test]
    #[ignore = "Requires a Level Zero driver"]
    fn test_level_zero_init() {
        let gate = SysmanGate::new(LevelZeroLoader::new());
        assert!(gate.init(InitFlags::NONE).is_ok());
    }
}
