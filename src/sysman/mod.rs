//! Sysman dispatch layer
//!
//! The gate, the generated capability table, the loader seam and the
//! Level Zero backend.

pub mod enumerate;
pub mod gate;
pub mod level_zero;
pub mod loader;
pub mod table;

pub use enumerate::enumerate;
pub use gate::{InitFlags, SysmanGate};
pub use level_zero::LevelZeroLoader;
pub use loader::Loader;
pub use table::{CapabilityTable, OPERATIONS};
