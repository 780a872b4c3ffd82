//! Error types for network construction.

use std::error::Error;
use std::fmt;

use hydroute_core::{GridCoord, NodeId};
use hydroute_queue::TransferError;

/// Fatal errors raised while building a drainage or irrigation network.
///
/// Every per-cell variant names the cell, its grid coordinate when one
/// was supplied, and the raw input value.
#[derive(Clone, Debug, PartialEq)]
pub enum TopologyError {
    /// A target index is neither the sink marker nor a valid cell.
    InvalidDownstream {
        /// Cell whose record is broken.
        cell: NodeId,
        /// Coordinate of the cell.
        coord: Option<GridCoord>,
        /// The raw target index.
        raw: i64,
    },
    /// The index translation table has no entry for the target.
    UntranslatedIndex {
        /// Cell whose record is broken.
        cell: NodeId,
        /// Coordinate of the cell.
        coord: Option<GridCoord>,
        /// The raw target index.
        raw: i64,
    },
    /// Following downstream links from this cell never reaches a sink.
    Cycle {
        /// Lowest-indexed cell on the cycle.
        cell: NodeId,
        /// Coordinate of the cell.
        coord: Option<GridCoord>,
    },
    /// A reach length is negative, NaN, or infinite.
    InvalidReachLength {
        /// Cell whose record is broken.
        cell: NodeId,
        /// Coordinate of the cell.
        coord: Option<GridCoord>,
        /// The raw length in metres.
        length: f64,
    },
    /// The transfer strategy rejected a reach.
    Transfer {
        /// Cell whose reach was rejected.
        cell: NodeId,
        /// The strategy's error.
        source: TransferError,
    },
    /// Two per-cell inputs disagree on the number of cells.
    LengthMismatch {
        /// Which input was malformed.
        what: &'static str,
        /// Number of cells.
        expected: usize,
        /// Length supplied.
        found: usize,
    },
    /// A partition cannot be formed.
    InvalidPartition {
        /// What went wrong.
        reason: String,
    },
}

struct At(Option<GridCoord>);

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(c) => write!(f, " ({c})"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDownstream { cell, coord, raw } => write!(
                f,
                "invalid downstream index {raw} in cell {cell}{}",
                At(*coord)
            ),
            Self::UntranslatedIndex { cell, coord, raw } => write!(
                f,
                "downstream index {raw} of cell {cell}{} has no grid translation",
                At(*coord)
            ),
            Self::Cycle { cell, coord } => {
                write!(f, "drainage cycle through cell {cell}{}", At(*coord))
            }
            Self::InvalidReachLength { cell, coord, length } => write!(
                f,
                "invalid reach length {length} m in cell {cell}{}",
                At(*coord)
            ),
            Self::Transfer { cell, source } => {
                write!(f, "transfer function of cell {cell}: {source}")
            }
            Self::LengthMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected} entries, got {found}"),
            Self::InvalidPartition { reason } => write!(f, "invalid partition: {reason}"),
        }
    }
}

impl Error for TopologyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transfer { source, .. } => Some(source),
            _ => None,
        }
    }
}
