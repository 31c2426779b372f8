//! Typed sysman handles
//!
//! Each handle is an opaque driver token. They are `repr(transparent)`
//! over `usize` so slices of handles can be handed to the C API as-is.

use serde::Serialize;
use std::fmt;

/// Common behaviour of all handle types
pub trait Handle: Copy + Send + Sync + 'static {
    /// Wrap a raw driver token
    fn from_raw(raw: usize) -> Self;

    /// Raw driver token
    fn as_raw(self) -> usize;

    /// Whether this is the null handle
    fn is_null(self) -> bool {
        self.as_raw() == 0
    }
}

macro_rules! handles {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(transparent)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
            pub struct $name(usize);

            impl $name {
                pub const fn new(raw: usize) -> Self {
                    Self(raw)
                }
            }

            impl Handle for $name {
                #[inline]
                fn from_raw(raw: usize) -> Self {
                    Self(raw)
                }

                #[inline]
                fn as_raw(self) -> usize {
                    self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{:#x}", self.0)
                }
            }
        )*
    };
}

handles! {
    /// Sysman driver
    DriverHandle;
    /// Device or sub-device
    DeviceHandle;
    /// Diagnostics test suite
    DiagnosticsHandle;
    /// Engine group
    EngineHandle;
    /// Fabric port
    FabricPortHandle;
    /// Fan
    FanHandle;
    /// Firmware
    FirmwareHandle;
    /// Frequency domain
    FrequencyHandle;
    /// LED
    LedHandle;
    /// Memory module
    MemoryHandle;
    /// Overclock domain
    OverclockHandle;
    /// Performance factor domain
    PerfHandle;
    /// Power domain
    PowerHandle;
    /// Power supply
    PsuHandle;
    /// RAS error set
    RasHandle;
    /// Scheduler controller
    SchedulerHandle;
    /// Standby domain
    StandbyHandle;
    /// Temperature sensor
    TemperatureHandle;
    /// Virtual function
    VfHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        assert!(DeviceHandle::default().is_null());
        assert!(!DeviceHandle::from_raw(0x10).is_null());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(PowerHandle::from_raw(255).to_string(), "0xff");
    }

    #[test]
    fn test_handle_layout_matches_usize() {
        assert_eq!(
            std::mem::size_of::<FanHandle>(),
            std::mem::size_of::<usize>()
        );
    }
}
