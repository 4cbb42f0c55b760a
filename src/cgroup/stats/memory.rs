//! Parsing of the cgroup v1 `memory.stat` file.
//!
//! Only the `rss` line is of interest: the anonymous resident set size of the cgroup in
//! bytes, reported as an absolute value rather than a cumulative counter. All other
//! labels, `total_rss` included, are skipped without being parsed.
//!
//! # Examples
//!
//! ```rust
//! use crunchstat::cgroup::stats::{KeyValueStat, MemoryStat};
//!
//! let data = "cache 2000\nrss 1000\ntotal_rss 1500\n";
//! let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(stat.rss, Some(1000));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::parser::KeyValueStat;

/// Represents memory usage statistics from `memory.stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryStat {
    /// Resident set size in bytes, `None` if the file has no `rss` line.
    pub rss: Option<u64>,
}

impl MemoryStat {
    /// Sets the `rss` field.
    fn set_rss(&mut self, v: u64) {
        self.rss = Some(v);
    }
}

type Setter = fn(&mut MemoryStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(1);

    m.insert("rss", MemoryStat::set_rss);

    m
});

impl KeyValueStat for MemoryStat {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
