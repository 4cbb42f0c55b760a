use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::fsutil;

use super::metric::Metric;
use super::stats::{
    BLKIO_IO_SERVICE_BYTES, BlkioOp, BlkioServiceBytes, CPUACCT_STAT, CPUSET_CPUS, CpuAcctStat,
    CpusetCpus, KeyValueStat, MEMORY_STAT, MemoryStat, SingleLineStat,
};

/// Jiffies per second assumed for `cpuacct.stat` (`USER_HZ`).
const JIFFIES_PER_SECOND: u64 = 100;

/// Most recent cumulative CPU counters. `last_user == 0` means no baseline yet.
#[derive(Debug, Default)]
struct CpuBaseline {
    last_user: u64,
    last_sys: u64,
    last_cpu_count: u64,
}

#[derive(Debug, Default)]
struct DiskCounters {
    last_read: u64,
    next_read: u64,
    last_write: u64,
    next_write: u64,
}

/// Paths of the accounting files below one cgroup directory.
#[derive(Debug, Clone)]
struct StatFiles {
    cpuacct_stat: PathBuf,
    cpuset_cpus: PathBuf,
    blkio_io_service_bytes: PathBuf,
    memory_stat: PathBuf,
}

impl StatFiles {
    fn new(cgroup: &Path) -> Self {
        Self {
            cpuacct_stat: cgroup.join(CPUACCT_STAT),
            cpuset_cpus: cgroup.join(CPUSET_CPUS),
            blkio_io_service_bytes: cgroup.join(BLKIO_IO_SERVICE_BYTES),
            memory_stat: cgroup.join(MEMORY_STAT),
        }
    }
}

/// Periodically reads the accounting files of one cgroup and turns the cumulative
/// counters into per-interval metrics.
///
/// Files are reopened on every cycle. A file that is missing or malformed yields no
/// metric for that cycle and is retried on the next one.
#[derive(Debug)]
pub struct Sampler {
    files: StatFiles,
    cpu: CpuBaseline,
    disks: HashMap<String, DiskCounters>,
}

impl Sampler {
    /// Creates a sampler for the cgroup directory at `cgroup`.
    pub fn new(cgroup: impl AsRef<Path>) -> Self {
        Self {
            files: StatFiles::new(cgroup.as_ref()),
            cpu: CpuBaseline::default(),
            disks: HashMap::new(),
        }
    }

    /// Samples until `tx` is closed, sleeping `poll` between cycles.
    ///
    /// Rates are computed against the measured time between two consecutive reads
    /// rather than the nominal interval. The first cycle uses `poll`.
    pub async fn run(mut self, tx: mpsc::Sender<String>, poll: Duration) {
        let mut elapsed = poll;
        loop {
            let started = tokio::time::Instant::now();
            let cycle = tokio::task::spawn_blocking(move || {
                let metrics = self.sample(elapsed);
                (self, metrics)
            });
            let metrics = match cycle.await {
                Ok((sampler, metrics)) => {
                    self = sampler;
                    metrics
                }
                Err(err) => {
                    log::error!("cgroup sampling task failed: {err}");
                    return;
                }
            };

            for metric in metrics {
                if tx.send(metric.to_string()).await.is_err() {
                    return;
                }
            }

            tokio::time::sleep(poll).await;
            elapsed = started.elapsed();
        }
    }

    /// Performs one sampling cycle.
    ///
    /// `elapsed` is the time since the previous cycle and is used as the divisor for
    /// CPU utilisation.
    pub fn sample(&mut self, elapsed: Duration) -> Vec<Metric> {
        let mut out = Vec::new();

        let cpus = read_stat(&self.files.cpuset_cpus, CpusetCpus::from_reader)
            .map(|cpuset| cpuset.count)
            .unwrap_or(0);
        if cpus != self.cpu.last_cpu_count {
            out.push(Metric::CpusetCpus(cpus));
        }
        self.cpu.last_cpu_count = cpus;

        self.sample_cpu(elapsed, cpus.max(1), &mut out);
        self.sample_blkio(&mut out);
        self.sample_memory(&mut out);

        out
    }

    fn sample_cpu(&mut self, elapsed: Duration, cpus: u64, out: &mut Vec<Metric>) {
        let Some(stat) = read_stat(&self.files.cpuacct_stat, CpuAcctStat::from_reader) else {
            self.cpu.last_user = 0;
            self.cpu.last_sys = 0;
            return;
        };

        if self.cpu.last_user != 0 {
            let user = stat.user.checked_sub(self.cpu.last_user);
            let sys = stat.system.checked_sub(self.cpu.last_sys);
            if let (Some(user), Some(sys)) = (user, sys) {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                out.push(Metric::CpuUser(cpu_percent(user, elapsed_ms, cpus)));
                out.push(Metric::CpuSys(cpu_percent(sys, elapsed_ms, cpus)));
            }
        }

        self.cpu.last_user = stat.user;
        self.cpu.last_sys = stat.system;
    }

    fn sample_blkio(&mut self, out: &mut Vec<Metric>) {
        let Some(stat) = read_stat(
            &self.files.blkio_io_service_bytes,
            BlkioServiceBytes::from_reader,
        ) else {
            return;
        };

        for entry in stat.entries {
            let disk = self.disks.entry(entry.device.clone()).or_default();
            let (last, next) = match entry.op {
                BlkioOp::Read => (&mut disk.last_read, &mut disk.next_read),
                BlkioOp::Write => (&mut disk.last_write, &mut disk.next_write),
            };
            *last = *next;
            *next = entry.bytes;

            if *last > 0 {
                if let Some(bytes) = next.checked_sub(*last) {
                    out.push(Metric::Blkio {
                        device: entry.device,
                        op: entry.op,
                        bytes,
                    });
                }
            }
        }
    }

    fn sample_memory(&self, out: &mut Vec<Metric>) {
        if let Some(rss) = read_stat(&self.files.memory_stat, MemoryStat::from_reader)
            .and_then(|stat| stat.rss)
        {
            out.push(Metric::MemoryRss(rss));
        }
    }
}

/// Average utilisation in percent over `elapsed_ms` across `cpus` CPUs.
///
/// Jiffies are scaled to milliseconds before dividing, so the computation is
/// `delta * 1000 / (elapsed_ms * cpus)` with integer division.
pub fn cpu_percent(delta_jiffies: u64, elapsed_ms: u64, cpus: u64) -> u64 {
    let ms_per_jiffy = 1000 / JIFFIES_PER_SECOND;
    let divisor = elapsed_ms.max(1).saturating_mul(cpus.max(1));
    delta_jiffies.saturating_mul(ms_per_jiffy * 100) / divisor
}

fn read_stat<T>(
    path: &Path,
    parse: impl FnOnce(&mut BufReader<File>) -> std::io::Result<T>,
) -> Option<T> {
    let mut reader = fsutil::open_file_reader(path).ok()?;
    parse(&mut reader).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_millis(1000);

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_cpu_percent() {
        assert_eq!(cpu_percent(50, 1000, 5), 10);
        assert_eq!(cpu_percent(100, 1000, 1), 100);
        assert_eq!(cpu_percent(7, 990, 2), 3);
        assert_eq!(cpu_percent(7, 0, 0), 7000);
    }

    #[test]
    fn test_first_cycle_only_reports_absolute_values() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUSET_CPUS, "0-3,7\n");
        write(dir.path(), CPUACCT_STAT, "user 100\nsystem 50\n");
        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 1024\n8:0 Write 2048\nTotal 3072\n");
        write(dir.path(), MEMORY_STAT, "cache 10\nrss 4096\n");

        let mut sampler = Sampler::new(dir.path());
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::CpusetCpus(5), Metric::MemoryRss(4096)]
        );
    }

    #[test]
    fn test_second_cycle_reports_deltas() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUSET_CPUS, "0-4\n");
        write(dir.path(), CPUACCT_STAT, "user 100\nsystem 50\n");
        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 1024\n8:0 Write 2048\n");
        write(dir.path(), MEMORY_STAT, "rss 4096\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);

        write(dir.path(), CPUACCT_STAT, "user 150\nsystem 70\n");
        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 1524\n8:0 Write 2048\n");
        write(dir.path(), MEMORY_STAT, "rss 8192\n");

        assert_eq!(
            sampler.sample(SECOND),
            vec![
                Metric::CpuUser(10),
                Metric::CpuSys(4),
                Metric::Blkio {
                    device: "8:0".to_string(),
                    op: BlkioOp::Read,
                    bytes: 500
                },
                Metric::Blkio {
                    device: "8:0".to_string(),
                    op: BlkioOp::Write,
                    bytes: 0
                },
                Metric::MemoryRss(8192),
            ]
        );
    }

    #[test]
    fn test_cpu_rate_uses_measured_elapsed_time() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUSET_CPUS, "0");
        write(dir.path(), CPUACCT_STAT, "user 10\nsystem 10\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);
        write(dir.path(), CPUACCT_STAT, "user 60\nsystem 20\n");

        let metrics = sampler.sample(Duration::from_millis(2000));
        assert_eq!(metrics, vec![Metric::CpuUser(25), Metric::CpuSys(5)]);
    }

    #[test]
    fn test_missing_cpuset_counts_as_one_cpu() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUACCT_STAT, "user 100\nsystem 100\n");

        let mut sampler = Sampler::new(dir.path());
        assert!(sampler.sample(SECOND).is_empty());
        write(dir.path(), CPUACCT_STAT, "user 200\nsystem 150\n");

        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::CpuUser(100), Metric::CpuSys(50)]
        );
    }

    #[test]
    fn test_cpuset_reported_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUSET_CPUS, "0-1\n");

        let mut sampler = Sampler::new(dir.path());
        assert_eq!(sampler.sample(SECOND), vec![Metric::CpusetCpus(2)]);
        assert!(sampler.sample(SECOND).is_empty());

        write(dir.path(), CPUSET_CPUS, "0-3\n");
        assert_eq!(sampler.sample(SECOND), vec![Metric::CpusetCpus(4)]);

        std::fs::remove_file(dir.path().join(CPUSET_CPUS)).unwrap();
        assert_eq!(sampler.sample(SECOND), vec![Metric::CpusetCpus(0)]);
    }

    #[test]
    fn test_zero_user_jiffies_is_not_a_baseline() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUACCT_STAT, "user 0\nsystem 5\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);
        write(dir.path(), CPUACCT_STAT, "user 10\nsystem 9\n");
        assert!(sampler.sample(SECOND).is_empty());

        write(dir.path(), CPUACCT_STAT, "user 20\nsystem 19\n");
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::CpuUser(10), Metric::CpuSys(10)]
        );
    }

    #[test]
    fn test_unreadable_cpuacct_resets_baseline() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUACCT_STAT, "user 100\nsystem 100\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);

        write(dir.path(), CPUACCT_STAT, "user garbage\nsystem 100\n");
        assert!(sampler.sample(SECOND).is_empty());

        // The next good read only re-establishes the baseline.
        write(dir.path(), CPUACCT_STAT, "user 300\nsystem 300\n");
        assert!(sampler.sample(SECOND).is_empty());

        write(dir.path(), CPUACCT_STAT, "user 400\nsystem 300\n");
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::CpuUser(100), Metric::CpuSys(0)]
        );
    }

    #[test]
    fn test_cpu_counter_reset_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUACCT_STAT, "user 500\nsystem 500\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);

        write(dir.path(), CPUACCT_STAT, "user 10\nsystem 10\n");
        assert!(sampler.sample(SECOND).is_empty());

        write(dir.path(), CPUACCT_STAT, "user 20\nsystem 10\n");
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::CpuUser(10), Metric::CpuSys(0)]
        );
    }

    #[test]
    fn test_disks_are_tracked_independently() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 100\n");

        let mut sampler = Sampler::new(dir.path());
        sampler.sample(SECOND);

        // 8:16 shows up for the first time: it only establishes its baseline.
        write(
            dir.path(),
            BLKIO_IO_SERVICE_BYTES,
            "8:0 Read 300\n8:16 Read 5000\n",
        );
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::Blkio {
                device: "8:0".to_string(),
                op: BlkioOp::Read,
                bytes: 200
            }]
        );

        write(
            dir.path(),
            BLKIO_IO_SERVICE_BYTES,
            "8:0 Read 300\n8:16 Read 5500\n",
        );
        assert_eq!(
            sampler.sample(SECOND),
            vec![
                Metric::Blkio {
                    device: "8:0".to_string(),
                    op: BlkioOp::Read,
                    bytes: 0
                },
                Metric::Blkio {
                    device: "8:16".to_string(),
                    op: BlkioOp::Read,
                    bytes: 500
                },
            ]
        );
    }

    #[test]
    fn test_malformed_disk_line_does_not_affect_other_devices() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 100\n8:16 Read 10\n");

        let mut sampler = Sampler::new(dir.path());
        assert!(sampler.sample(SECOND).is_empty());

        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 300\n8:16 Read bogus\n");
        assert_eq!(
            sampler.sample(SECOND),
            vec![Metric::Blkio {
                device: "8:0".to_string(),
                op: BlkioOp::Read,
                bytes: 200
            }]
        );

        write(dir.path(), BLKIO_IO_SERVICE_BYTES, "8:0 Read 400\n8:16 Read 20\n");
        assert_eq!(
            sampler.sample(SECOND),
            vec![
                Metric::Blkio {
                    device: "8:0".to_string(),
                    op: BlkioOp::Read,
                    bytes: 100
                },
                Metric::Blkio {
                    device: "8:16".to_string(),
                    op: BlkioOp::Read,
                    bytes: 10
                },
            ]
        );
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let mut sampler = Sampler::new("/definitely/does/not/exist");
        assert!(sampler.sample(SECOND).is_empty());
        assert!(sampler.sample(SECOND).is_empty());
    }

    #[tokio::test]
    async fn test_run_sends_lines() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), CPUSET_CPUS, "0-1\n");
        write(dir.path(), MEMORY_STAT, "rss 77\n");

        let (tx, mut rx) = mpsc::channel(1);
        let handle = tokio::spawn(Sampler::new(dir.path()).run(tx, Duration::from_millis(20)));

        assert_eq!(rx.recv().await.unwrap(), "crunchstat: cpuset.cpus 2");
        assert_eq!(rx.recv().await.unwrap(), "crunchstat: memory.stat rss 77");
        assert_eq!(rx.recv().await.unwrap(), "crunchstat: memory.stat rss 77");

        drop(rx);
        handle.await.unwrap();
    }
}
