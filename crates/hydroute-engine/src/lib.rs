//! Daily lateral water routing.
//!
//! A [`RoutingDomain`] holds the state of one worker's cells and advances
//! it one model day at a time with [`RoutingDomain::drain_day`]. Water
//! crosses between cells, and between workers, only through an
//! [`Exchange`](hydroute_exchange::Exchange) round.
//!
//! Two drivers are provided:
//!
//! - [`SerialRouter`]: one domain, in-process exchange.
//! - [`run_parallel`]: one scoped thread per worker, channel exchange.
//!
//! Both produce bit-identical discharge for the same inputs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod drain;
pub mod driver;
pub mod output;

pub use config::{ConfigError, RoutingConfig};
pub use domain::{CellParams, CellState, RoutingDomain};
pub use driver::{
    run_days, run_parallel, step_day, Forcing, ParallelRun, RunError, SerialRouter, WorkerLinks,
    WorkerOutput,
};
pub use output::{litres_per_day_to_m3s, DayReport, MonthAccumulator, MonthlyOutput, StorageTotals};
