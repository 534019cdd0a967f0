use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure converting a single file. Reported by the walker, never fatal to a run.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("malformed filename `{name}`")]
    MalformedFilename { name: String },

    #[error("`{token}` is not a hexadecimal byte string")]
    InvalidHex { token: String },

    #[error("{what} is not valid {encoding}")]
    Encoding {
        what: String,
        encoding: &'static str,
    },

    #[error("failed to decompress {}: {source}", path.display())]
    Decompression { path: PathBuf, source: io::Error },

    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl ConversionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Pre-flight failure on the source or destination tree. Aborts the run.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("{} is not a PukiWiki data directory (missing {})", root.display(), missing.join(", "))]
    InvalidSourceTree { root: PathBuf, missing: Vec<String> },

    #[error("{} is not empty", root.display())]
    NonEmptyDestination { root: PathBuf },

    #[error("failed to prepare {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}
