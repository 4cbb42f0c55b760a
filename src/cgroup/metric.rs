use std::fmt;

use super::stats::{BLKIO_IO_SERVICE_BYTES, BlkioOp, CPUACCT_STAT, CPUSET_CPUS, MEMORY_STAT};

/// Tag that starts every telemetry line.
pub const TAG: &str = "crunchstat:";

/// One observation emitted by the sampler.
///
/// The [`fmt::Display`] implementation renders the telemetry line, e.g.
/// `crunchstat: cpuacct.stat user 42`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    /// Number of CPUs in the cgroup's cpuset, reported when it changes.
    CpusetCpus(u64),
    /// User CPU utilisation over the last interval, in percent of the cpuset.
    CpuUser(u64),
    /// System CPU utilisation over the last interval, in percent of the cpuset.
    CpuSys(u64),
    /// Bytes transferred on one device since the previous cycle.
    Blkio {
        device: String,
        op: BlkioOp,
        bytes: u64,
    },
    /// Current resident set size in bytes.
    MemoryRss(u64),
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::CpusetCpus(count) => write!(f, "{TAG} {CPUSET_CPUS} {count}"),
            Metric::CpuUser(pct) => write!(f, "{TAG} {CPUACCT_STAT} user {pct}"),
            Metric::CpuSys(pct) => write!(f, "{TAG} {CPUACCT_STAT} sys {pct}"),
            Metric::Blkio { device, op, bytes } => write!(
                f,
                "{TAG} {BLKIO_IO_SERVICE_BYTES} {device} {} {bytes}",
                op.as_str()
            ),
            Metric::MemoryRss(rss) => write!(f, "{TAG} {MEMORY_STAT} rss {rss}"),
        }
    }
}
