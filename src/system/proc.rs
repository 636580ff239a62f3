//! `/proc`-backed system probe for Linux hosts.

use std::path::{Path, PathBuf};

use super::traits::{Cpu, CpuTimes, DiskUsage, MemInfo, PidStat, PidStatus, SystemProbe};

const BOOT_ID_PATH: &str = "/proc/sys/kernel/random/boot_id";
const MIB: f64 = 1024.0 * 1024.0;

/// Reads statistics from procfs. The root is configurable for tests.
pub struct ProcSystemProbe {
    root: PathBuf,
    scratch_dir: PathBuf,
}

impl ProcSystemProbe {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/proc"),
            scratch_dir: PathBuf::from("/tmp"),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    fn read(&self, relative: &str) -> Option<String> {
        let path = self.root.join(relative);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                tracing::debug!(path = %path.display(), "Unable to read system file: {e}");
                None
            }
        }
    }
}

impl Default for ProcSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for ProcSystemProbe {
    fn boot_id(&self) -> String {
        let from_root = self.read("sys/kernel/random/boot_id");
        from_root
            .or_else(|| std::fs::read_to_string(BOOT_ID_PATH).ok())
            .map(|id| id.trim().to_string())
            .unwrap_or_default()
    }

    fn hostname(&self) -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn meminfo(&self) -> MemInfo {
        self.read("meminfo")
            .map(|c| parse_meminfo(&c))
            .unwrap_or_default()
    }

    fn cpus(&self) -> Vec<Cpu> {
        self.read("stat").map(|c| parse_stat(&c)).unwrap_or_default()
    }

    fn pid_stat(&self) -> PidStat {
        self.read("self/stat")
            .and_then(|c| parse_pid_stat(&c))
            .unwrap_or_default()
    }

    fn pid_status(&self) -> PidStatus {
        self.read("self/status")
            .map(|c| parse_pid_status(&c))
            .unwrap_or_default()
    }

    fn disk(&self) -> DiskUsage {
        read_disk(&self.scratch_dir).unwrap_or_default()
    }

    fn name(&self) -> &str {
        "proc"
    }
}

/// First numeric column of a `Key:   value [kB]` line.
fn keyed_value(line: &str, key: &str) -> Option<u64> {
    let rest = line.strip_prefix(key)?.strip_prefix(':')?;
    rest.split_whitespace().next()?.parse().ok()
}

pub fn parse_meminfo(contents: &str) -> MemInfo {
    let mut info = MemInfo::default();
    for line in contents.lines() {
        if let Some(v) = keyed_value(line, "MemTotal") {
            info.total = v;
        } else if let Some(v) = keyed_value(line, "MemFree") {
            info.free = v;
        } else if let Some(v) = keyed_value(line, "MemAvailable") {
            info.available = v;
        }
    }
    info
}

/// Per-CPU lines of `/proc/stat` (`cpu0`, `cpu1`, ...). The aggregate `cpu`
/// line is skipped.
pub fn parse_stat(contents: &str) -> Vec<Cpu> {
    contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let label = parts.next()?;
            let index = label.strip_prefix("cpu")?;
            if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let values: Vec<u64> = parts.filter_map(|p| p.parse().ok()).collect();
            let at = |i: usize| values.get(i).copied().unwrap_or(0);
            Some(Cpu {
                times: CpuTimes {
                    user: at(0),
                    nice: at(1),
                    sys: at(2),
                    idle: at(3),
                    irq: at(5),
                },
            })
        })
        .collect()
}

/// `/proc/<pid>/stat`. The command name may contain spaces, so fields are
/// counted from the closing parenthesis.
pub fn parse_pid_stat(contents: &str) -> Option<PidStat> {
    let after_comm = &contents[contents.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // fields[0] is the state, i.e. field 3 of the full record
    let field = |n: usize| -> Option<u64> { fields.get(n - 3)?.parse().ok() };
    Some(PidStat {
        utime: field(14)?,
        stime: field(15)?,
        cutime: field(16)?,
        cstime: field(17)?,
    })
}

pub fn parse_pid_status(contents: &str) -> PidStatus {
    let mut status = PidStatus::default();
    for line in contents.lines() {
        if let Some(v) = keyed_value(line, "FDSize") {
            status.fd_size = v;
        } else if let Some(v) = keyed_value(line, "Threads") {
            status.threads = v;
        } else if let Some(v) = keyed_value(line, "VmRSS") {
            status.vm_rss = v;
        }
    }
    status
}

pub fn disk_usage(total_bytes: u64, free_bytes: u64) -> DiskUsage {
    let total_mib = total_bytes as f64 / MIB;
    let used_mib = total_bytes.saturating_sub(free_bytes) as f64 / MIB;
    let used_percentage = if total_mib > 0.0 {
        ((used_mib / total_mib) * 10_000.0).round() / 100.0
    } else {
        0.0
    };
    DiskUsage {
        total_mib,
        used_mib,
        used_percentage,
    }
}

#[cfg(unix)]
fn read_disk(path: &Path) -> Option<DiskUsage> {
    let stat = nix::sys::statvfs::statvfs(path).ok()?;
    // Field widths differ between platforms
    #[allow(clippy::unnecessary_cast)]
    let frsize = stat.fragment_size() as u64;
    #[allow(clippy::unnecessary_cast)]
    let (blocks, free) = (stat.blocks() as u64, stat.blocks_free() as u64);
    Some(disk_usage(blocks * frsize, free * frsize))
}

#[cfg(not(unix))]
fn read_disk(_path: &Path) -> Option<DiskUsage> {
    None
}
