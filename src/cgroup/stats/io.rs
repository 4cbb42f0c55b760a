//! Parsing of the cgroup v1 `blkio.io_service_bytes` file.
//!
//! Each line reports a cumulative byte count for one device and one operation type:
//!
//! ```text
//! 8:0 Read 1048576
//! 8:0 Write 4096
//! 8:0 Sync 4096
//! 8:0 Async 1048576
//! 8:0 Total 1052672
//! Total 1052672
//! ```
//!
//! Only `Read` and `Write` entries are kept, in file order. Other operation types and the
//! trailing grand `Total` line are skipped.
//!
//! # Example
//!
//! ```rust
//! use crunchstat::cgroup::stats::{BlkioOp, BlkioServiceBytes};
//!
//! let data = "8:0 Read 1024\n8:0 Write 2048\n8:0 Total 3072\nTotal 3072\n";
//! let stat = BlkioServiceBytes::from_reader(&mut data.as_bytes()).unwrap();
//!
//! assert_eq!(stat.entries.len(), 2);
//! assert_eq!(stat.entries[0].device, "8:0");
//! assert_eq!(stat.entries[0].op, BlkioOp::Read);
//! assert_eq!(stat.entries[1].bytes, 2048);
//! ```

use std::io::BufRead;

/// Direction of a block I/O byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlkioOp {
    Read,
    Write,
}

impl BlkioOp {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Read" => Some(Self::Read),
            "Write" => Some(Self::Write),
            _ => None,
        }
    }

    /// The lowercase name used in telemetry lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// One `<device> <Read|Write> <bytes>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlkioEntry {
    /// Device identifier, usually `major:minor`.
    pub device: String,
    pub op: BlkioOp,
    /// Cumulative bytes transferred.
    pub bytes: u64,
}

/// Parsed content of `blkio.io_service_bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlkioServiceBytes {
    pub entries: Vec<BlkioEntry>,
}

impl BlkioServiceBytes {
    /// Reads every device line of the file.
    ///
    /// A `Read` or `Write` line whose byte count is not a `u64` is skipped, so one bad
    /// device line never hides the others.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading from `buf` fails.
    pub fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let mut line = String::new();
        let mut lineno = 0;

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if let (Some(device), Some(label), Some(value)) =
                (parts.next(), parts.next(), parts.next())
            {
                if let Some(op) = BlkioOp::from_label(label) {
                    match value.parse::<u64>() {
                        Ok(bytes) => stat.entries.push(BlkioEntry {
                            device: device.to_string(),
                            op,
                            bytes,
                        }),
                        Err(err) => log::trace!(
                            "skipping blkio line {lineno} for {device} {}: '{value}': {err}",
                            op.as_str()
                        ),
                    }
                }
            }
            line.clear();
        }

        Ok(stat)
    }
}
