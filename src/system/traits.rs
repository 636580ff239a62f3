use serde::{Deserialize, Serialize};

/// Memory figures from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemInfo {
    #[serde(rename = "MemTotal")]
    pub total: u64,
    #[serde(rename = "MemFree")]
    pub free: u64,
    #[serde(rename = "MemAvailable")]
    pub available: u64,
}

/// Cumulative time one CPU spent in each mode, in clock ticks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub sys: u64,
    pub idle: u64,
    pub irq: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cpu {
    pub times: CpuTimes,
}

/// CPU accounting for a process, from `/proc/<pid>/stat`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PidStat {
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
}

/// Selected fields of `/proc/<pid>/status`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PidStatus {
    #[serde(rename = "FDSize")]
    pub fd_size: u64,
    #[serde(rename = "Threads")]
    pub threads: u64,
    #[serde(rename = "VmRSS")]
    pub vm_rss: u64,
}

/// Usage of the scratch filesystem.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskUsage {
    #[serde(rename = "totalMiB")]
    pub total_mib: f64,
    #[serde(rename = "usedMiB")]
    pub used_mib: f64,
    #[serde(rename = "usedPercentage")]
    pub used_percentage: f64,
}

/// Source of host and process statistics for reports.
///
/// Probes never fail: unreadable sources yield zeroed values so a report is
/// always produced.
pub trait SystemProbe: Send + Sync {
    fn boot_id(&self) -> String;
    fn hostname(&self) -> String;
    fn meminfo(&self) -> MemInfo;
    fn cpus(&self) -> Vec<Cpu>;
    fn pid_stat(&self) -> PidStat;
    fn pid_status(&self) -> PidStatus;
    fn disk(&self) -> DiskUsage;
    fn name(&self) -> &str;
}
