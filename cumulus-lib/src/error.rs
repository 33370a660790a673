//! Defines custom error types for the library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout `cumulus-lib`.
pub type Result<T> = std::result::Result<T, CumulusError>;

#[derive(Error, Debug)]
/// Error type returned when formatting or injecting a cloud-config fails.
pub enum CumulusError {
    #[error("Failed to read source file {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write destination file {}: {source}", .path.display())]
    DestinationWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {name} line number '{value}': expected a positive integer")]
    InvalidLineNumber { name: &'static str, value: String },

    #[error("Invalid line range [{start}:{end}]: {reason}")]
    InvalidRange {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("{} is not a valid cloud-config: {message}", .path.display())]
    InvalidCloudConfig { path: PathBuf, message: String },
}

impl CumulusError {
    pub(crate) fn source_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn destination_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DestinationWrite {
            path: path.into(),
            source,
        }
    }
}
