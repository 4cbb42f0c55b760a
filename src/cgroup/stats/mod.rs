//! Parsers for the cgroup v1 accounting files read by the sampler.
//!
//! # Main types
//!
//! - [`CpuAcctStat`]: cumulative user/system jiffies from `cpuacct.stat`.
//! - [`CpusetCpus`]: number of CPUs listed in `cpuset.cpus`.
//! - [`BlkioServiceBytes`]: per-device read/write byte counters from `blkio.io_service_bytes`.
//! - [`MemoryStat`]: resident set size from `memory.stat`.
//!
//! All parsers work on any [`std::io::BufRead`], which keeps them independent of the
//! filesystem and easy to test with in-memory buffers.

mod cpu;
mod cpuset;
mod error;
mod io;
mod memory;
mod parser;

pub use cpu::CpuAcctStat;
pub use cpuset::CpusetCpus;
pub use error::StatParseError;
pub use io::{BlkioEntry, BlkioOp, BlkioServiceBytes};
pub use memory::MemoryStat;
pub use parser::{KeyValueStat, SingleLineStat};

/// File name of the CPU accounting file.
pub const CPUACCT_STAT: &str = "cpuacct.stat";
/// File name of the CPU-set list.
pub const CPUSET_CPUS: &str = "cpuset.cpus";
/// File name of the block I/O byte accounting file.
pub const BLKIO_IO_SERVICE_BYTES: &str = "blkio.io_service_bytes";
/// File name of the memory accounting file.
pub const MEMORY_STAT: &str = "memory.stat";
