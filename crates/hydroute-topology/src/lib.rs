//! Network construction for river routing.
//!
//! Turns per-cell drainage records into a validated, acyclic
//! [`RiverNetwork`], builds the [`IrrigationNetwork`] that lets a cell
//! draw water from a neighbour, and splits the cells into contiguous
//! per-worker ranges with [`Partition`].
//!
//! All validation happens here, once, before the first routing step.
//! Downstream code indexes by [`NodeId`](hydroute_core::NodeId) handles
//! without re-checking.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod links;
pub mod network;
pub mod partition;

pub use error::TopologyError;
pub use links::LinkTable;
pub use network::{DrainageRecord, IndexTranslation, IrrigationNetwork, RiverNetwork, SINK_INDEX};
pub use partition::Partition;
