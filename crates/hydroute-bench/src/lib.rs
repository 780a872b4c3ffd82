//! Benchmark profiles for the hydroute routing crates.
//!
//! - [`basin_profile`]: a 10K-cell drainage forest with lakes, dams and
//!   irrigation neighbours
//! - [`stress_profile`]: the same layout at 100K cells

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use hydroute_engine::{CellParams, Forcing};
use hydroute_test_utils::fixtures::{dam, random_forest, random_neighbours, random_runoff};
use hydroute_topology::{IrrigationNetwork, RiverNetwork, TopologyError};

/// Everything needed to build a router and drive it.
pub struct BasinProfile {
    /// Drainage network.
    pub network: RiverNetwork,
    /// Irrigation neighbours.
    pub irrigation: IrrigationNetwork,
    /// Per-cell parameters.
    pub cells: Vec<CellParams>,
    /// Daily runoff and demand.
    pub forcing: Forcing,
}

/// Build a basin of `n` cells with `days` of forcing.
///
/// Every tenth cell has a lake, every fiftieth a dam commissioned before
/// the forcing starts. Reaches are up to 100 km long.
pub fn profile(seed: u64, n: usize, days: usize) -> Result<BasinProfile, TopologyError> {
    let network = RiverNetwork::build(&random_forest(seed, n, 0.05, 100_000.0), &[], None)?;
    let irrigation = IrrigationNetwork::build(&random_neighbours(seed, n, 0.2), &[], None)?;
    let cells = (0..n)
        .map(|i| CellParams {
            area: 2.5e9,
            lake_capacity: if i % 10 == 0 { 5e11 } else { 0.0 },
            reservoir: (i % 50 == 7).then(|| dam(1950, 1e12, if i % 100 == 7 { 2 } else { 1 })),
        })
        .collect();
    let forcing = Forcing {
        first_year: 2000,
        runoff: random_runoff(seed, days, n, 0.3, 20.0),
        demand: Some(random_runoff(seed ^ 0x5eed, days, n, 0.1, 5e9)),
    };
    Ok(BasinProfile {
        network,
        irrigation,
        cells,
        forcing,
    })
}

/// 10K cells, 30 days.
pub fn basin_profile(seed: u64) -> Result<BasinProfile, TopologyError> {
    profile(seed, 10_000, 30)
}

/// 100K cells, 5 days.
pub fn stress_profile(seed: u64) -> Result<BasinProfile, TopologyError> {
    profile(seed, 100_000, 5)
}
