//! Error types for checkpoint reading and writing.

use std::error::Error;
use std::fmt;
use std::io;

use hydroute_core::NodeId;

/// Errors that can occur while writing or restoring a checkpoint.
#[derive(Debug)]
pub enum CheckpointError {
    /// An I/O error occurred, including a truncated file.
    Io(io::Error),
    /// The file does not start with `b"HRCK"`.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// A header value differs from the domain being restored.
    HeaderMismatch {
        /// Which header field.
        field: &'static str,
        /// Value of the current domain.
        expected: u64,
        /// Value in the file.
        found: u64,
    },
    /// The file has a reservoir where the domain has none, or the other
    /// way round.
    ReservoirMismatch {
        /// The cell concerned.
        node: NodeId,
    },
    /// A value could not be decoded.
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"HRCK\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported checkpoint version {found}")
            }
            Self::HeaderMismatch {
                field,
                expected,
                found,
            } => write!(f, "checkpoint {field} is {found}, domain has {expected}"),
            Self::ReservoirMismatch { node } => {
                write!(f, "reservoir presence at node {node} differs from checkpoint")
            }
            Self::Malformed { detail } => write!(f, "malformed checkpoint: {detail}"),
        }
    }
}

impl Error for CheckpointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
