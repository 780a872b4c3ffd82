//! Core types and invariants for the hydroute river routing engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental vocabulary used throughout the workspace: node and
//! worker handles, the downstream target of a cell, the model calendar,
//! shared error types, and the storage invariant checks applied after
//! every routing update.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod error;
pub mod id;
pub mod invariant;

pub use calendar::{Month, DAYS_PER_YEAR, NMONTH};
pub use error::{ExchangeError, RoutingError};
pub use id::{Downstream, GridCoord, NodeId, WorkerRank};
pub use invariant::{settle_river, settle_storage, StorageKind};

/// Seconds per day, used to convert daily volumes into rates.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Litres per cubic metre.
pub const LITRES_PER_M3: f64 = 1_000.0;
