//! Locating and sampling the cgroup of the supervised workload.
//!
//! This module finds the cgroup v1 accounting directory of the workload and turns its
//! cumulative counters into periodic telemetry lines.
//!
//! # Key Components
//!
//! - [`CgroupSource`] — Resolves the cgroup directory from a direct path, a parent
//!   prefix and/or a container id file that is populated asynchronously.
//! - [`Sampler`] — Reads the accounting files every poll interval and keeps the
//!   baselines needed to report per-interval deltas and rates.
//! - [`Metric`] — One observation, rendered as a `crunchstat:` line.
//!
//! # Supported Stats
//!
//! - `cpuset.cpus` — number of CPUs, reported on change
//! - `cpuacct.stat` — user and system CPU utilisation in percent
//! - `blkio.io_service_bytes` — bytes read and written per device
//! - `memory.stat` — resident set size
mod error;
mod metric;
mod resolve;
mod sampler;
pub mod stats;

pub use error::{Error, Result};
pub use metric::{Metric, TAG};
pub use resolve::{CID_POLL_INTERVAL, CgroupSource};
pub use sampler::{Sampler, cpu_percent};
