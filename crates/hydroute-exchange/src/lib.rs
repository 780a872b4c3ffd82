//! Flow exchange between partitions.
//!
//! Each worker owns a contiguous range of nodes. Once per sub-daily
//! iteration every worker publishes one outflow value per owned node and
//! receives, per owned node, the sum of values sent to it along the
//! graph's edges. [`ExchangePlan`] precompiles who sends what to whom;
//! an [`Exchange`] transport executes a round.
//!
//! Sums are always formed in ascending source order, so the result is
//! bit-identical no matter how the nodes are partitioned.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod plan;
pub mod transport;

pub use plan::ExchangePlan;
pub use transport::{
    ChannelExchange, ChannelFabric, Exchange, LocalExchange, DEFAULT_PEER_TIMEOUT,
};
