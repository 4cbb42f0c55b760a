use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when reading an already opened file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Open(#[from] FileOpenError),
    #[error(transparent)]
    Read(#[from] FileReadError),
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use crunchstat::fsutil;
/// let reader = fsutil::open_file_reader("/sys/fs/cgroup/cpuacct/cpuacct.stat")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads the whole file and returns its content with surrounding whitespace removed.
///
/// # Errors
///
/// Returns a [`ReadError`] if the file cannot be opened or read.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<String, ReadError> {
    let path = path.as_ref();
    let mut reader = open_file_reader(path)?;
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|source| FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content.trim().to_owned())
}
