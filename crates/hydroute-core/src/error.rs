//! Error types shared across the routing subsystems.
//!
//! Construction-time errors (topology, reservoir records, configuration)
//! live next to the code that validates them. This module holds the
//! errors of the per-step hot path: the exchange fabric and the routing
//! step itself. Both are fatal for the run; nothing in the routing layer
//! retries.

use std::error::Error;
use std::fmt;

use crate::id::{NodeId, WorkerRank};

/// Failures of the communication fabric behind the exchange layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeError {
    /// The fabric could not be set up (wrong number of endpoints,
    /// plans built for different partitions, ...).
    FabricInit {
        /// Description of what went wrong.
        reason: String,
    },
    /// A peer hung up before delivering its packet for the current round.
    Disconnected {
        /// The peer whose channel closed.
        peer: WorkerRank,
    },
    /// A peer delivered a packet for an unexpected round.
    RoundMismatch {
        /// The sending peer.
        peer: WorkerRank,
        /// Round this worker is waiting on.
        expected: u64,
        /// Round stamped on the packet.
        found: u64,
    },
    /// No packet arrived from a peer within the fabric timeout.
    Timeout {
        /// The silent peer.
        peer: WorkerRank,
        /// Round this worker is waiting on.
        round: u64,
    },
    /// A buffer had the wrong number of values.
    LengthMismatch {
        /// The peer that sent the packet, or `None` for a local buffer.
        peer: Option<WorkerRank>,
        /// Expected number of values.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FabricInit { reason } => write!(f, "exchange fabric init failed: {reason}"),
            Self::Disconnected { peer } => write!(f, "worker {peer} disconnected"),
            Self::RoundMismatch {
                peer,
                expected,
                found,
            } => write!(
                f,
                "worker {peer} sent round {found} while waiting for round {expected}"
            ),
            Self::Timeout { peer, round } => {
                write!(f, "timed out waiting for worker {peer} in round {round}")
            }
            Self::LengthMismatch {
                peer: Some(peer),
                expected,
                found,
            } => write!(
                f,
                "worker {peer} sent {found} values, expected {expected}"
            ),
            Self::LengthMismatch {
                peer: None,
                expected,
                found,
            } => write!(f, "local buffer holds {found} values, expected {expected}"),
        }
    }
}

impl Error for ExchangeError {}

/// Errors from a routing step.
#[derive(Clone, Debug, PartialEq)]
pub enum RoutingError {
    /// The exchange collective failed. The run must abort: partial state
    /// inside a sub-daily iteration has no safe resumption point.
    Exchange(ExchangeError),
    /// A per-cell input slice does not match the number of owned cells.
    InputLength {
        /// Which input was malformed.
        what: &'static str,
        /// Number of locally owned cells.
        expected: usize,
        /// Length supplied.
        found: usize,
    },
    /// The node is not owned by this worker.
    NotOwned {
        /// The offending node.
        node: NodeId,
    },
    /// The node has no reservoir.
    NoReservoir {
        /// The offending node.
        node: NodeId,
    },
    /// A forcing value was negative, NaN or infinite.
    InvalidInput {
        /// Which input was malformed.
        what: &'static str,
        /// Node carrying the value.
        node: NodeId,
        /// The value.
        value: f64,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exchange(e) => write!(f, "exchange failed: {e}"),
            Self::InputLength {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected} values, got {found}"),
            Self::NotOwned { node } => write!(f, "node {node} is not owned by this worker"),
            Self::NoReservoir { node } => write!(f, "node {node} has no reservoir"),
            Self::InvalidInput { what, node, value } => {
                write!(f, "{what} at node {node} must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for RoutingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exchange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ExchangeError> for RoutingError {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_error_is_source_of_routing_error() {
        let e = RoutingError::from(ExchangeError::Disconnected {
            peer: WorkerRank(2),
        });
        assert!(e.source().is_some());
        assert_eq!(e.to_string(), "exchange failed: worker 2 disconnected");
    }

    #[test]
    fn length_mismatch_display_distinguishes_local() {
        let local = ExchangeError::LengthMismatch {
            peer: None,
            expected: 4,
            found: 3,
        };
        assert!(local.to_string().starts_with("local buffer"));
    }
}
