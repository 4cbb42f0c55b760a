use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cgroup::{self, CgroupSource};

/// Run a command and report the CPU, disk I/O and memory usage of its cgroup.
///
/// Telemetry lines start with `crunchstat:` and are written to stderr, interleaved
/// with the command's own stderr. The command's stdout is passed through unchanged.
#[derive(Debug, Clone, Parser)]
#[command(name = "crunchstat", version)]
pub struct Config {
    /// Direct path to cgroup
    #[arg(long, value_name = "PATH")]
    pub cgroup_path: Option<String>,

    /// Path to parent cgroup
    #[arg(long, value_name = "PATH")]
    pub cgroup_parent: Option<String>,

    /// Path to container id file
    #[arg(long = "cgroup-cid", value_name = "FILE")]
    pub cgroup_cid: Option<PathBuf>,

    /// Maximum time (in seconds) to wait for cid file to show up
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub wait: u64,

    /// Polling frequency, in milliseconds
    #[arg(
        long,
        value_name = "MILLIS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll: u64,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Config {
    /// Builds the cgroup resolver input. Empty strings count as not given.
    ///
    /// # Errors
    ///
    /// Returns [`cgroup::Error::MissingSource`] if neither `--cgroup-path` nor
    /// `--cgroup-cid` is given.
    pub fn cgroup_source(&self) -> cgroup::Result<CgroupSource> {
        CgroupSource::new(
            non_empty(self.cgroup_path.as_deref()).map(str::to_owned),
            non_empty(self.cgroup_parent.as_deref()).map(str::to_owned),
            self.cgroup_cid
                .clone()
                .filter(|path| !path.as_os_str().is_empty()),
            Duration::from_secs(self.wait),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
