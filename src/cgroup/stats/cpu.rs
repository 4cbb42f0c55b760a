//! Parsing of the cgroup v1 `cpuacct.stat` file.
//!
//! The file holds the cumulative CPU time consumed by the cgroup, split into user and
//! system time and expressed in `USER_HZ` units (jiffies, normally 100 per second):
//!
//! ```text
//! user 4213
//! system 2027
//! ```
//!
//! # Examples
//!
//! ```rust
//! use crunchstat::cgroup::stats::{CpuAcctStat, KeyValueStat};
//!
//! let stat = CpuAcctStat::from_reader(&mut "user 4213\nsystem 2027\n".as_bytes()).unwrap();
//! assert_eq!(stat.user, 4213);
//! assert_eq!(stat.system, 2027);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::KeyValueStat;

/// Represents parsed data from a cgroup `cpuacct.stat` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuAcctStat {
    /// Cumulative jiffies spent in user space.
    pub user: u64,
    /// Cumulative jiffies spent in kernel space.
    pub system: u64,
}

impl CpuAcctStat {
    /// Sets the `user` field.
    fn set_user(&mut self, user: u64) {
        self.user = user;
    }

    /// Sets the `system` field.
    fn set_system(&mut self, system: u64) {
        self.system = system;
    }
}

type Setter = fn(&mut CpuAcctStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(2);

    m.insert("user", CpuAcctStat::set_user);
    m.insert("system", CpuAcctStat::set_system);

    m
});

impl KeyValueStat for CpuAcctStat {
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}
