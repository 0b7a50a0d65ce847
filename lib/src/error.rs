use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("system error: {0}")]
    System(#[source] io::Error),
    #[error("failed to open dump store at {0}")]
    StoreOpen(String),
    #[error("dump store write failed")]
    StoreWrite(#[source] io::Error),
    #[error("dump store flush failed")]
    StoreFlush(#[source] io::Error),
    #[error("failed to map dump store chunk at offset {0}")]
    StoreMap(u64, #[source] io::Error),
    #[error("record holds no data to dump")]
    EmptyRecord,
    #[error("record was never written to the dump store")]
    MissingFileOffset,
    #[error("failed to open process: {0}")]
    OpenProcess(u32),
    #[error("bad region state: {0}")]
    BadRegionState(u32),
    #[error("bad region type: {0}")]
    BadRegionType(u32),
}

impl Error {
    /// Get last system error.
    pub fn last_system_error() -> Self {
        Self::System(io::Error::last_os_error())
    }

    /// Access the underlying raw OS error.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::System(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::System(error)
    }
}
