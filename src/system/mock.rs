//! Random plausible statistics for hosts without procfs.

use rand::Rng;

use super::proc::disk_usage;
use super::traits::{Cpu, CpuTimes, DiskUsage, MemInfo, PidStat, PidStatus, SystemProbe};

const MAX_COUNTER: u64 = 999_999_999;

pub struct MockSystemProbe;

impl SystemProbe for MockSystemProbe {
    fn boot_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn hostname(&self) -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn meminfo(&self) -> MemInfo {
        let mut rng = rand::thread_rng();
        let total = rng.gen_range(1..=MAX_COUNTER);
        let free = rng.gen_range(0..=total);
        MemInfo {
            total,
            free,
            available: rng.gen_range(free..=total),
        }
    }

    fn cpus(&self) -> Vec<Cpu> {
        let mut rng = rand::thread_rng();
        vec![Cpu {
            times: CpuTimes {
                user: rng.gen_range(0..=MAX_COUNTER),
                nice: rng.gen_range(0..=MAX_COUNTER),
                sys: rng.gen_range(0..=MAX_COUNTER),
                idle: rng.gen_range(0..=MAX_COUNTER),
                irq: rng.gen_range(0..=MAX_COUNTER),
            },
        }]
    }

    fn pid_stat(&self) -> PidStat {
        let mut rng = rand::thread_rng();
        PidStat {
            utime: rng.gen_range(0..=MAX_COUNTER),
            stime: rng.gen_range(0..=MAX_COUNTER),
            cutime: rng.gen_range(0..=MAX_COUNTER),
            cstime: rng.gen_range(0..=MAX_COUNTER),
        }
    }

    fn pid_status(&self) -> PidStatus {
        let mut rng = rand::thread_rng();
        PidStatus {
            fd_size: rng.gen_range(0..=MAX_COUNTER),
            threads: rng.gen_range(0..=99_999),
            vm_rss: rng.gen_range(0..=MAX_COUNTER),
        }
    }

    fn disk(&self) -> DiskUsage {
        let total = 500 * 1024 * 1024;
        let used = rand::thread_rng().gen_range(0..=total);
        disk_usage(total, total - used)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_values_are_internally_consistent() {
        let probe = MockSystemProbe;
        let mem = probe.meminfo();
        assert!(mem.free <= mem.total);
        assert_eq!(probe.cpus().len(), 1);
        assert_eq!(probe.boot_id().len(), 32);
        let disk = probe.disk();
        assert!((disk.total_mib - 500.0).abs() < f64::EPSILON);
        assert!((0.0..=100.0).contains(&disk.used_percentage));
    }
}
