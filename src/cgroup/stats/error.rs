//! Errors raised while parsing cgroup accounting files.
//!
//! Parsers return a plain [`std::io::Result`]. A [`StatParseError`] is carried inside the
//! returned [`std::io::Error`] with kind `InvalidData`.
//!
//! # Example
//!
//! ```rust
//! use crunchstat::cgroup::stats::{CpuAcctStat, KeyValueStat};
//!
//! let err = CpuAcctStat::from_reader(&mut "user many\nsystem 1\n".as_bytes()).unwrap_err();
//! assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
//! assert!(err.to_string().contains("'user'"));
//! ```

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

/// Recovers the [`StatParseError`] wrapped in a parser's `io::Error`. Panics otherwise.
#[cfg(test)]
pub(super) fn extract_stat_parse_error(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
