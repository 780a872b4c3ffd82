//! Travel-time delay along river reaches.
//!
//! Each river reach carries a discretised unit hydrograph (a
//! [`TransferFunction`]) and a fixed-length [`DelayQueue`] of past inflow
//! contributions. Once per sub-daily iteration the reach releases the
//! weighted sum of its queue and accepts one new contribution:
//!
//! ```text
//! push(v_t)           slots: [v_t, v_t-1, ..., v_t-n+1]   (newest first)
//! weighted_sum()      Σ w[i] · slot[i]
//! ```
//!
//! Because the weights sum to one, every unit pushed leaves the reach
//! exactly once, spread over `ncoeff` iterations.
//!
//! The curve shape is pluggable through [`TransferStrategy`]; the only
//! hard contract is "non-negative, sums to one, at least one weight".

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod delay;
pub mod strategy;
pub mod transfer;

pub use delay::{DelayQueue, QueueRestore};
pub use strategy::{Instantaneous, LinearSplit, StorageCascade, TransferStrategy};
pub use transfer::{TransferError, TransferFunction};
