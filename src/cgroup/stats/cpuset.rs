//! Parsing of the cgroup v1 `cpuset.cpus` file.
//!
//! The file lists the CPUs the cgroup may run on as comma-separated entries, each either
//! a single CPU index or an inclusive `min-max` range, e.g. `0-3,7`.
//!
//! Entries that are empty or malformed (including reversed ranges) contribute nothing
//! to the count, so a missing, empty or unreadable list yields a count of zero.
//!
//! # Examples
//!
//! ```rust
//! use crunchstat::cgroup::stats::{CpusetCpus, SingleLineStat};
//!
//! let cpus = CpusetCpus::from_reader(&mut "0-3,7\n".as_bytes()).unwrap();
//! assert_eq!(cpus.count, 5);
//! ```

use std::io::BufRead;

use super::SingleLineStat;

/// Number of CPUs assigned to a cgroup, as listed in `cpuset.cpus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpusetCpus {
    pub count: u64,
}

impl CpusetCpus {
    /// Counts the CPUs in a cpuset list such as `0-3,7`.
    pub fn parse_list(list: &str) -> Self {
        let count = list.split(',').map(entry_size).sum();
        Self { count }
    }
}

fn entry_size(entry: &str) -> u64 {
    let entry = entry.trim();
    match entry.split_once('-') {
        Some((min, max)) => match (min.trim().parse::<u64>(), max.trim().parse::<u64>()) {
            (Ok(min), Ok(max)) if min <= max => max - min + 1,
            _ => 0,
        },
        None if entry.parse::<u64>().is_ok() => 1,
        None => 0,
    }
}

impl SingleLineStat for CpusetCpus {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut content = String::new();
        std::io::Read::read_to_string(buf, &mut content)?;
        Ok(Self::parse_list(&content))
    }
}
