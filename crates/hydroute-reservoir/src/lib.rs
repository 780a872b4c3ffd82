//! Reservoir operation.
//!
//! A [`Reservoir`] sits in one cell, intercepts that cell's runoff and
//! routed inflow, and releases water by the Hanasaki rules. Irrigation
//! reservoirs additionally park part of each release in a short buffer
//! from which irrigation demand is served.
//!
//! Call order per model day: [`Reservoir::fill`] and
//! [`Reservoir::record_inflow`] for every inflow, one
//! [`Reservoir::daily_release`], then optionally
//! [`Reservoir::supply_irrigation`] and [`Reservoir::update_surface`].
//! At the end of each month [`Reservoir::update_monthly`], at the end of
//! each year [`Reservoir::update_annual`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod history;
pub mod operation;
pub mod params;
pub mod record;

pub use error::ReservoirError;
pub use history::History;
pub use operation::{Release, Reservoir, ReservoirState, SurfaceFlux};
pub use params::{OperationalYearStart, ReservoirParams};
pub use record::{Purpose, PurposeSet, ReservoirRecord, NPURPOSE};
