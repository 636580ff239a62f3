//! Host and process statistics attached to every report.

pub mod mock;
pub mod proc;
pub mod traits;

pub use mock::MockSystemProbe;
pub use proc::ProcSystemProbe;
pub use traits::{Cpu, CpuTimes, DiskUsage, MemInfo, PidStat, PidStatus, SystemProbe};

use std::sync::Arc;

/// Pick the probe for the current platform: procfs on Linux, mock elsewhere.
pub fn create_system_probe() -> Arc<dyn SystemProbe> {
    if cfg!(target_os = "linux") {
        Arc::new(ProcSystemProbe::new())
    } else {
        Arc::new(MockSystemProbe)
    }
}
