#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("must provide either a cgroup path or a cgroup cid file")]
    MissingSource,
}

pub type Result<T> = std::result::Result<T, Error>;
