//! Hydroute: daily lateral river routing on a global grid.
//!
//! This facade re-exports the public API of the hydroute sub-crates. Most
//! users only need `hydroute` as a single dependency.
//!
//! # Quick start
//!
//! ```rust
//! use hydroute::prelude::*;
//!
//! // Three cells draining 0 → 1 → 2 → sink, 50 km reaches.
//! let records: Vec<DrainageRecord> = (0..3i64)
//!     .map(|i| DrainageRecord {
//!         downstream: if i < 2 { i + 1 } else { SINK_INDEX },
//!         reach_length: 50_000.0,
//!     })
//!     .collect();
//! let network = RiverNetwork::build(&records, &[], None).unwrap();
//! let irrigation = IrrigationNetwork::disconnected(3);
//! let cells = vec![
//!     CellParams { area: 1e6, lake_capacity: 0.0, reservoir: None };
//!     3
//! ];
//!
//! let mut router =
//!     SerialRouter::new(&network, &irrigation, &cells, &RoutingConfig::default()).unwrap();
//! let forcing = Forcing {
//!     first_year: 2000,
//!     runoff: vec![vec![1.0; 3]; 10],
//!     demand: None,
//! };
//! let out = router.run(&forcing, 0..10).unwrap();
//! assert_eq!(out.discharge.len(), 10);
//! assert!(out.sink_outflow.iter().sum::<f64>() > 0.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `hydroute-core` | IDs, calendar, errors, storage settling |
//! | [`queue`] | `hydroute-queue` | Transfer functions and delay queues |
//! | [`topology`] | `hydroute-topology` | River and irrigation graphs, partitions |
//! | [`exchange`] | `hydroute-exchange` | Cross-worker value exchange |
//! | [`reservoir`] | `hydroute-reservoir` | Hanasaki reservoir operation |
//! | [`engine`] | `hydroute-engine` | Daily drain step and run drivers |
//! | [`checkpoint`] | `hydroute-checkpoint` | Restart files and state hashing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`hydroute-core`).
pub use hydroute_core as types;

/// Transfer functions and delay queues (`hydroute-queue`).
///
/// Pick a [`queue::TransferStrategy`] for [`engine::RoutingConfig::transfer`].
pub use hydroute_queue as queue;

/// Drainage and irrigation graphs (`hydroute-topology`).
pub use hydroute_topology as topology;

/// Value exchange between workers (`hydroute-exchange`).
///
/// [`exchange::LocalExchange`] for one worker, [`exchange::ChannelFabric`]
/// for threads.
pub use hydroute_exchange as exchange;

/// Reservoir operation (`hydroute-reservoir`).
pub use hydroute_reservoir as reservoir;

/// Routing engine (`hydroute-engine`).
pub use hydroute_engine as engine;

/// Checkpoints (`hydroute-checkpoint`).
pub use hydroute_checkpoint as checkpoint;

/// Common imports for typical hydroute usage.
///
/// ```rust
/// use hydroute::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use hydroute_core::{Downstream, Month, NodeId, RoutingError, WorkerRank};

    // Transfer
    pub use hydroute_queue::{Instantaneous, LinearSplit, StorageCascade, TransferStrategy};

    // Topology
    pub use hydroute_topology::{
        DrainageRecord, IrrigationNetwork, Partition, RiverNetwork, TopologyError, SINK_INDEX,
    };

    // Exchange
    pub use hydroute_exchange::Exchange;

    // Reservoirs
    pub use hydroute_reservoir::{OperationalYearStart, ReservoirRecord};

    // Engine
    pub use hydroute_engine::{
        run_parallel, CellParams, ConfigError, DayReport, Forcing, MonthlyOutput, RoutingConfig,
        RoutingDomain, RunError, SerialRouter,
    };

    // Checkpoints
    pub use hydroute_checkpoint::{read_checkpoint, state_hash, write_checkpoint, CheckpointError};
}
