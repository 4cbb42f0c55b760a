use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fsutil;

use super::{Error, Result};

/// Delay between two attempts at reading the container id file.
pub const CID_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Describes where the cgroup accounting directory of the workload can be found.
///
/// A source always carries a direct path, a container id file, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupSource {
    path: Option<String>,
    parent: Option<String>,
    cid_file: Option<PathBuf>,
    wait: Duration,
}

impl CgroupSource {
    /// Constructs a [`CgroupSource`].
    ///
    /// # Arguments
    ///
    /// * `path` - Direct cgroup directory, or leaf below `parent`.
    /// * `parent` - Prefix joined in front of the resolved leaf.
    /// * `cid_file` - File expected to eventually hold a container id.
    /// * `wait` - Maximum time to wait for `cid_file` to be populated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSource`] if neither `path` nor `cid_file` is given.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use crunchstat::cgroup::CgroupSource;
    /// let source = CgroupSource::new(None, None, None, Duration::from_secs(5));
    /// assert!(source.is_err());
    /// ```
    pub fn new(
        path: Option<String>,
        parent: Option<String>,
        cid_file: Option<PathBuf>,
        wait: Duration,
    ) -> Result<Self> {
        if path.is_none() && cid_file.is_none() {
            return Err(Error::MissingSource);
        }

        Ok(Self {
            path,
            parent,
            cid_file,
            wait,
        })
    }

    /// Resolves the cgroup directory.
    ///
    /// If a cid file is configured, it is polled every [`CID_POLL_INTERVAL`] until it has
    /// non-empty content or the wait ceiling elapses. The trimmed content then replaces the
    /// direct path as the leaf. A timeout is only reported as a warning, and the leaf falls
    /// back to the direct path (or nothing). The result may therefore name a directory that
    /// does not exist.
    pub async fn resolve(&self) -> PathBuf {
        let mut leaf = self.path.clone().unwrap_or_default();

        if let Some(cid_file) = &self.cid_file {
            match wait_for_cid(cid_file, self.wait).await {
                Some(cid) => leaf = cid,
                None => log::warn!("Could not read cid file {}", cid_file.display()),
            }
        }

        match &self.parent {
            Some(parent) => PathBuf::from(format!("{parent}/{leaf}")),
            None => PathBuf::from(leaf),
        }
    }
}

async fn wait_for_cid(path: &Path, wait: Duration) -> Option<String> {
    let mut waited = Duration::ZERO;
    while waited < wait {
        let file = path.to_path_buf();
        match tokio::task::spawn_blocking(move || fsutil::read_trimmed(file)).await {
            Ok(Ok(cid)) if !cid.is_empty() => return Some(cid),
            Ok(Ok(_)) => log::trace!("cid file `{}` is still empty", path.display()),
            Ok(Err(err)) => log::trace!("{err}"),
            Err(err) => log::error!("cid file read task failed: {err}"),
        }
        tokio::time::sleep(CID_POLL_INTERVAL).await;
        waited += CID_POLL_INTERVAL;
    }

    None
}
