//! Bootstrap seam between the gate and a driver backend

use crate::error::ZeResult;
use crate::sysman::gate::InitFlags;
use crate::sysman::table::CapabilityTable;

/// Resolves a driver backend into a dispatch table
///
/// Called at most once per gate, from [`SysmanGate::init`](super::SysmanGate::init).
/// A successful load always yields a table; the gate installs it before
/// `init` returns.
pub trait Loader: Send + Sync {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Discover the backend and build its dispatch table
    fn load(&self, flags: InitFlags) -> ZeResult<CapabilityTable>;
}
