//! Checkpoint and restart for hydroute routing domains.
//!
//! [`write_checkpoint`] serializes everything a [`RoutingDomain`] needs
//! to continue a run: storages, delay queues, withdrawal and output
//! accumulators, and reservoir histories. [`read_checkpoint`] restores it
//! into a domain built from the same network and configuration.
//! [`state_hash`] fingerprints the same state for restart checks.
//!
//! # Format
//!
//! Little-endian binary, no compression, no padding. See [`state`] for
//! the layout.
//!
//! [`RoutingDomain`]: hydroute_engine::RoutingDomain

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod state;

pub use error::CheckpointError;
pub use hash::state_hash;
pub use state::{read_checkpoint, write_checkpoint, RestoreReport};

/// Magic bytes at the start of every checkpoint.
pub const MAGIC: [u8; 4] = *b"HRCK";

/// Current checkpoint format version.
pub const FORMAT_VERSION: u8 = 1;
