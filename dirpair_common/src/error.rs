use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirPairError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DirPairError>;

/// Failure to produce a directory listing.
///
/// Both variants carry the path that was being read so the caller can
/// report it without extra bookkeeping.
#[derive(Error, Debug)]
pub enum DirReadError {
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DirReadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            DirReadError::Open { path, .. } | DirReadError::Read { path, .. } => path,
        }
    }

    pub fn io_error(&self) -> &std::io::Error {
        match self {
            DirReadError::Open { source, .. } | DirReadError::Read { source, .. } => source,
        }
    }
}
