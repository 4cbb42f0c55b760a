//! Generic traits for parsing cgroup v1 accounting files into structured types.
//!
//! Two shapes of file are covered:
//!
//! - [`KeyValueStat`]: multi-line `label value` files such as `cpuacct.stat` or
//!   `memory.stat`. Implementors register the labels they care about; every
//!   other label is skipped without its value being parsed.
//! - [`SingleLineStat`]: files whose whole content is one logical value, such
//!   as the `cpuset.cpus` list.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use crunchstat::cgroup::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct Throttling {
//!     nr_throttled: u64,
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut Throttling, u64)>> =
//!     LazyLock::new(|| {
//!         let mut m: HashMap<&'static str, fn(&mut Throttling, u64)> = HashMap::new();
//!         m.insert("nr_throttled", |s: &mut Throttling, v: u64| s.nr_throttled = v);
//!         m
//!     });
//!
//! impl KeyValueStat for Throttling {
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let stat = Throttling::from_reader(&mut "nr_periods 3\nnr_throttled 2\n".as_bytes()).unwrap();
//! assert_eq!(stat.nr_throttled, 2);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// A trait for parsing `label value` accounting files like `cpuacct.stat` and `memory.stat`.
///
/// Each line holds exactly one label followed by one unsigned integer, separated by
/// whitespace. Lines with fewer than two fields are ignored. A registered label may
/// appear only once, and parsing stops as soon as every registered label has been seen.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// Returns the registered labels and the handlers that store their values.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses a whole accounting file.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails, or a [`StatParseError`] wrapped in
    /// `io::Error` (kind `InvalidData`) if a registered label carries a malformed value.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let field_count = handlers.len();
        let mut seen_keys = HashSet::with_capacity(field_count);

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                Self::parse_and_set(key, val, &mut stat, lineno, handlers, &mut seen_keys)?;
            }
            if seen_keys.len() == field_count {
                break;
            }

            line.clear();
        }

        Ok(stat)
    }

    /// Parses a single label/value pair and hands it to the registered handler.
    ///
    /// # Errors
    ///
    /// [`StatParseError::InvalidKeyValue`] if the value is not a `u64`, or
    /// [`StatParseError::DuplicateField`] if the label was already seen.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &HashMap<&'static str, fn(&mut Self, u64)>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((k, handler)) = handlers.get_key_value(key) else {
            return Ok(());
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            }
            .into());
        }
        handler(stat, parsed);
        Ok(())
    }
}

/// A trait for files that hold a single logical value, such as `cpuset.cpus`.
pub trait SingleLineStat: Sized + Default {
    /// Parses the value from the provided buffered reader.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}
