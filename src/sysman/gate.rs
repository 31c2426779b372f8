//! Sysman dispatch gate
//!
//! Owns the process state every operation consults: the exactly-once
//! init guard, the teardown flag and the atomically swapped dispatch
//! table. Each forwarding method (generated in [`table`](super::table))
//! runs the same sequence:
//!
//! 1. torn down → `Uninitialized`
//! 2. no table installed → `Uninitialized`
//! 3. one atomic load of the table, look the operation up
//! 4. entry missing → `UnsupportedFeature` once initialized, else `Uninitialized`
//! 5. forward the arguments unchanged and return the result verbatim

use crate::error::{ZeResult, ZesError};
use crate::sysman::level_zero::LevelZeroLoader;
use crate::sysman::loader::Loader;
use crate::sysman::table::CapabilityTable;

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Flags accepted by [`SysmanGate::init`]
///
/// No flags are defined yet; anything but [`InitFlags::NONE`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InitFlags(u32);

impl InitFlags {
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A table that was replaced by a newer one
struct Retired(NonNull<CapabilityTable>);

// SAFETY: retired tables are never read again; they are only freed in Drop.
unsafe impl Send for Retired {}

/// Process state guarding every sysman operation
pub struct SysmanGate {
    loader: Box<dyn Loader>,
    init_once: OnceLock<ZeResult<()>>,
    initialized: AtomicBool,
    torn_down: AtomicBool,
    sysman_in_use: AtomicBool,
    table: AtomicPtr<CapabilityTable>,
    retired: Mutex<Vec<Retired>>,
}

static GLOBAL: OnceLock<SysmanGate> = OnceLock::new();

impl SysmanGate {
    /// Create a gate that bootstraps through `loader`
    pub fn new(loader: impl Loader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            init_once: OnceLock::new(),
            initialized: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            sysman_in_use: AtomicBool::new(false),
            table: AtomicPtr::new(std::ptr::null_mut()),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Process-wide gate backed by the system Level Zero loader
    pub fn global() -> &'static SysmanGate {
        Self::global_with(|| SysmanGate::new(LevelZeroLoader::default()))
    }

    /// Process-wide gate, built by `make` if it does not exist yet
    ///
    /// Only the first caller's `make` runs; later callers get the same gate.
    pub fn global_with(make: impl FnOnce() -> SysmanGate) -> &'static SysmanGate {
        GLOBAL.get_or_init(make)
    }

    /// Mark the process-wide gate as tearing down, if it exists
    pub fn teardown_global() {
        if let Some(gate) = GLOBAL.get() {
            gate.teardown();
        }
    }

    /// Initialize the subsystem
    ///
    /// The loader runs exactly once no matter how many threads call this;
    /// every caller gets the outcome of that single run.
    ///
    /// # Errors
    /// - `InvalidEnumeration` if `flags` is not empty (loader not run)
    /// - `Uninitialized` if teardown has begun
    /// - whatever the loader failed with
    pub fn init(&self, flags: InitFlags) -> ZeResult<()> {
        if !flags.is_empty() {
            log::debug!("Rejecting init flags {:#x}", flags.bits());
            return Err(ZesError::InvalidEnumeration);
        }
        if self.is_torn_down() {
            return Err(ZesError::Uninitialized);
        }

        *self.init_once.get_or_init(|| self.bootstrap(flags))
    }

    fn bootstrap(&self, flags: InitFlags) -> ZeResult<()> {
        log::debug!("Bootstrapping sysman via {}", self.loader.name());

        let table = self.loader.load(flags).map_err(|e| {
            log::warn!("Sysman bootstrap failed: {}", e);
            e
        })?;

        self.install(table);
        self.initialized.store(true, Ordering::Release);
        log::info!("Sysman initialized via {}", self.loader.name());
        Ok(())
    }

    /// Atomically install a dispatch table
    ///
    /// The previous table, if any, stays alive until the gate is dropped so
    /// calls already running against it are unaffected. Retired tables
    /// accumulate with every swap and are only freed on drop, which is
    /// bounded for a gate that lives as long as the process.
    pub fn install(&self, table: CapabilityTable) {
        log::debug!("Installing dispatch table: {:?}", table);

        let fresh = Box::into_raw(Box::new(table));
        let previous = self.table.swap(fresh, Ordering::AcqRel);

        if let Some(previous) = NonNull::new(previous) {
            self.retired
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Retired(previous));
        }
    }

    /// Begin teardown; every later operation returns `Uninitialized`
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            log::debug!("Sysman teardown started");
        }
    }

    /// Name of the backend this gate bootstraps through
    pub fn backend(&self) -> &str {
        self.loader.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Whether a driver enumeration has succeeded through this gate
    pub fn is_sysman_in_use(&self) -> bool {
        self.sysman_in_use.load(Ordering::Acquire)
    }

    /// Current dispatch table, if one is installed
    pub fn table(&self) -> Option<&CapabilityTable> {
        // SAFETY: installed tables are freed only in Drop, which needs
        // exclusive access, so the borrow cannot outlive the allocation.
        unsafe { self.table.load(Ordering::Acquire).as_ref() }
    }

    /// Lifecycle checks shared by every operation
    pub(crate) fn admit(&self) -> ZeResult<&CapabilityTable> {
        if self.is_torn_down() {
            return Err(ZesError::Uninitialized);
        }
        self.table().ok_or(ZesError::Uninitialized)
    }

    /// Error for an operation the table has no entry for
    pub(crate) fn missing(&self, operation: &'static str) -> ZesError {
        if self.is_initialized() {
            log::trace!("{} is not implemented by the backend", operation);
            ZesError::UnsupportedFeature
        } else {
            ZesError::Uninitialized
        }
    }

    pub(crate) fn mark_in_use(&self) {
        self.sysman_in_use.store(true, Ordering::Release);
    }
}

impl Drop for SysmanGate {
    fn drop(&mut self) {
        let current = *self.table.get_mut();
        if !current.is_null() {
            // SAFETY: allocated by Box::into_raw in install and no longer shared.
            drop(unsafe { Box::from_raw(current) });
        }

        let retired = self
            .retired
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for Retired(table) in retired.drain(..) {
            // SAFETY: same as above; each table was retired exactly once.
            drop(unsafe { Box::from_raw(table.as_ptr()) });
        }
    }
}

impl fmt::Debug for SysmanGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysmanGate")
            .field("loader", &self.loader.name())
            .field("initialized", &self.is_initialized())
            .field("torn_down", &self.is_torn_down())
            .field("sysman_in_use", &self.is_sysman_in_use())
            .field("table", &self.table())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceHandle, DriverHandle, PowerHandle, TemperatureHandle};
    use crate::mock::{MockLoader, MockSysman};

    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn initialized_gate() -> SysmanGate {
        let gate = SysmanGate::new(MockLoader::new(MockSysman::new()));
        gate.init(InitFlags::NONE).unwrap();
        gate
    }

    #[test]
    fn test_concurrent_init_runs_loader_once() {
        let loader = MockLoader::new(MockSysman::new());
        let calls = loader.calls();
        let gate = Arc::new(SysmanGate::new(loader));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    gate.init(InitFlags::NONE)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(gate.is_initialized());
    }

    #[test]
    fn test_failed_init_is_cached() {
        let loader = MockLoader::failing(ZesError::OutOfHostMemory);
        let calls = loader.calls();
        let gate = SysmanGate::new(loader);

        assert_eq!(gate.init(InitFlags::NONE), Err(ZesError::OutOfHostMemory));
        assert_eq!(gate.init(InitFlags::NONE), Err(ZesError::OutOfHostMemory));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!gate.is_initialized());
        assert!(gate.table().is_none());
    }

    #[test]
    fn test_invalid_flags_skip_loader() {
        let loader = MockLoader::new(MockSysman::new());
        let calls = loader.calls();
        let gate = SysmanGate::new(loader);

        assert_eq!(
            gate.init(InitFlags::from_bits(0x1)),
            Err(ZesError::InvalidEnumeration)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!gate.is_initialized());
    }

    #[test]
    fn test_teardown_rejects_every_operation() {
        let gate = initialized_gate();
        gate.teardown();

        let mut count = 0;
        assert_eq!(gate.driver_get(&mut count, None), Err(ZesError::Uninitialized));
        assert_eq!(
            gate.device_get_properties(DeviceHandle::new(1)).unwrap_err(),
            ZesError::Uninitialized
        );
        assert_eq!(
            gate.temperature_get_state(TemperatureHandle::new(1)),
            Err(ZesError::Uninitialized)
        );
        assert_eq!(gate.init(InitFlags::NONE), Err(ZesError::Uninitialized));
    }

    #[test]
    fn test_no_table_not_initialized_is_uninitialized() {
        let gate = SysmanGate::new(MockLoader::new(MockSysman::new()));
        let mut count = 0;

        assert_eq!(
            gate.device_enum_power_domains(DeviceHandle::new(1), &mut count, None),
            Err(ZesError::Uninitialized)
        );
        assert_eq!(gate.driver_get(&mut count, None), Err(ZesError::Uninitialized));
    }

    #[test]
    fn test_missing_entry_is_unsupported_once_initialized() {
        let gate = SysmanGate::new(MockLoader::new(
            MockSysman::new().without("power_get_energy_threshold"),
        ));
        gate.init(InitFlags::NONE).unwrap();

        assert_eq!(
            gate.power_get_energy_threshold(PowerHandle::new(1)),
            Err(ZesError::UnsupportedFeature)
        );
    }

    #[test]
    fn test_missing_entry_before_init_is_uninitialized() {
        let gate = SysmanGate::new(MockLoader::new(MockSysman::new()));
        gate.install(CapabilityTable::default());

        assert_eq!(
            gate.power_get_energy_threshold(PowerHandle::new(1)),
            Err(ZesError::Uninitialized)
        );
    }

    #[test]
    fn test_forwards_callee_result_verbatim() {
        let gate = initialized_gate();
        let mut table = CapabilityTable::default();
        table.device.reset = Some(Box::new(|_d: DeviceHandle, _force: bool| {
            Err(ZesError::DeviceLost)
        }));
        gate.install(table);

        assert_eq!(
            gate.device_reset(DeviceHandle::new(7), true),
            Err(ZesError::DeviceLost)
        );
    }

    #[test]
    fn test_forwards_arguments_unchanged() {
        let gate = initialized_gate();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let mut table = CapabilityTable::default();
        table.device.reset = Some(Box::new(move |device: DeviceHandle, force: bool| {
            *sink.lock().unwrap() = Some((device, force));
            Ok(())
        }));
        table.frequency.get_available_clocks = Some(Box::new(
            |_f: crate::domain::FrequencyHandle, count: &mut u32, clocks: Option<&mut [f64]>| {
                match clocks {
                    None => *count = 3,
                    Some(buf) => {
                        let n = buf.len().min(3);
                        buf[..n].copy_from_slice(&[300.0, 600.0, 900.0][..n]);
                        *count = n as u32;
                    }
                }
                Ok(())
            },
        ));
        gate.install(table);

        gate.device_reset(DeviceHandle::new(0x42), false).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            Some((DeviceHandle::new(0x42), false))
        );

        let freq = crate::domain::FrequencyHandle::new(1);
        let mut count = 0;
        gate.frequency_get_available_clocks(freq, &mut count, None)
            .unwrap();
        assert_eq!(count, 3);

        let mut clocks = vec![0.0; 2];
        count = 2;
        gate.frequency_get_available_clocks(freq, &mut count, Some(&mut clocks))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(clocks, vec![300.0, 600.0]);
    }

    #[test]
    fn test_driver_get_marks_sysman_in_use() {
        let gate = initialized_gate();
        assert!(!gate.is_sysman_in_use());

        let mut count = 0;
        gate.driver_get(&mut count, None).unwrap();
        assert_eq!(count, 1);
        assert!(gate.is_sysman_in_use());
    }

    #[test]
    fn test_failed_driver_get_leaves_in_use_unset() {
        let gate = initialized_gate();
        let mut table = CapabilityTable::default();
        table.driver.get = Some(Box::new(
            |_count: &mut u32, _drivers: Option<&mut [DriverHandle]>| Err(ZesError::NotAvailable),
        ));
        gate.install(table);

        let mut count = 0;
        assert_eq!(gate.driver_get(&mut count, None), Err(ZesError::NotAvailable));
        assert!(!gate.is_sysman_in_use());
    }

    #[test]
    fn test_table_swap_keeps_borrowed_table_alive() {
        let gate = initialized_gate();
        let before = gate.table().unwrap();

        gate.install(CapabilityTable::default());

        assert!(!before.supported().is_empty());
        assert!(gate.table().unwrap().supported().is_empty());
    }

    #[test]
    fn test_retired_tables_grow_until_drop() {
        let gate = initialized_gate();
        let retired = |gate: &SysmanGate| gate.retired.lock().unwrap().len();
        assert_eq!(retired(&gate), 0);

        for swaps in 1..=3 {
            gate.install(CapabilityTable::default());
            assert_eq!(retired(&gate), swaps);
        }
    }

    #[test]
    fn test_concurrent_dispatch_during_swap() {
        let gate = Arc::new(initialized_gate());
        let hits = Arc::new(AtomicUsize::new(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let hits = Arc::clone(&hits);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let result = gate.temperature_get_state(crate::mock::TEMP_GPU);
                        // Either the mock table or an empty replacement
                        match result {
                            Ok(_) => {
                                hits.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => assert_eq!(e, ZesError::UnsupportedFeature),
                        }
                    }
                })
            })
            .collect();

        for _ in 0..10 {
            gate.install(CapabilityTable::default());
            gate.install(MockSysman::new().into_table());
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert!(gate.table().is_some());
    }
}
