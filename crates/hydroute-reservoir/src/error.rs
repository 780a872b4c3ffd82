//! Reservoir error types.

use std::error::Error;
use std::fmt;

use hydroute_core::NodeId;

/// Fatal errors from reservoir setup.
#[derive(Clone, Debug, PartialEq)]
pub enum ReservoirError {
    /// The input record cannot describe a real reservoir.
    Malformed {
        /// Cell carrying the record.
        cell: NodeId,
        /// What is wrong with it.
        reason: String,
    },
    /// Operating parameters are out of range.
    InvalidParams {
        /// What is wrong with them.
        reason: String,
    },
}

impl fmt::Display for ReservoirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { cell, reason } => {
                write!(f, "malformed reservoir record in cell {cell}: {reason}")
            }
            Self::InvalidParams { reason } => write!(f, "invalid reservoir parameters: {reason}"),
        }
    }
}

impl Error for ReservoirError {}
