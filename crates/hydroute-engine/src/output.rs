//! Daily reports and monthly output records.

use hydroute_core::{Month, NodeId, LITRES_PER_M3, SECONDS_PER_DAY};

/// Convert a daily volume in litres to a mean rate in m³/s.
pub fn litres_per_day_to_m3s(volume: f64) -> f64 {
    volume / LITRES_PER_M3 / SECONDS_PER_DAY
}

/// Water held in each pool, summed over the owned cells (litres).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StorageTotals {
    /// River channels, including water in delay queues.
    pub river: f64,
    /// Lakes.
    pub lake: f64,
    /// Reservoirs, including their irrigation buffers.
    pub reservoir: f64,
}

impl StorageTotals {
    /// All pools together.
    pub fn total(&self) -> f64 {
        self.river + self.lake + self.reservoir
    }
}

/// Result of one [`drain_day`](crate::RoutingDomain::drain_day).
///
/// Volumes are litres per day over the owned cells. Per-cell vectors are
/// indexed by local cell (global node minus the first owned node).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayReport {
    /// Water that left the network through sink cells.
    pub sink_outflow: f64,
    /// Water withdrawn from rivers and lakes.
    pub withdrawal: f64,
    /// Withdrawal demand that could not be met.
    pub unmet_demand: f64,
    /// Storage after the day.
    pub storage: StorageTotals,
    /// Routed inflow arriving at each cell.
    pub discharge: Vec<f64>,
    /// Water each cell released into its downstream reach.
    pub outflow: Vec<f64>,
}

impl DayReport {
    /// Discharge of local cell `i` in m³/s.
    pub fn discharge_m3s(&self, i: usize) -> f64 {
        litres_per_day_to_m3s(self.discharge[i])
    }
}

/// Running sums of one cell over the current month.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonthAccumulator {
    /// Runoff plus routed inflow (litres).
    pub inflow: f64,
    /// Release into the downstream reach (litres).
    pub outflow: f64,
    /// Routed inflow (litres).
    pub discharge: f64,
    /// Sum of daily mean storage (litres).
    pub storage: f64,
    /// Water withdrawn in the cell itself (litres).
    pub local_withdrawal: f64,
    /// Water received from the irrigation neighbour (litres).
    pub neighbour_withdrawal: f64,
    /// Water supplied by the cell's reservoir (litres).
    pub reservoir_supply: f64,
    /// Days accumulated.
    pub days: u32,
}

/// Monthly output of one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyOutput {
    /// The cell.
    pub node: NodeId,
    /// Model year.
    pub year: i32,
    /// Month closed.
    pub month: Month,
    /// Runoff plus routed inflow (litres).
    pub inflow: f64,
    /// Release into the downstream reach (litres).
    pub outflow: f64,
    /// Mean routed inflow (m³/s).
    pub discharge: f64,
    /// Mean river plus lake storage (litres).
    pub mean_storage: f64,
    /// Local withdrawal per unit cell area (mm).
    pub local_withdrawal_mm: f64,
    /// Water received from the neighbour per unit cell area (mm).
    pub neighbour_withdrawal_mm: f64,
    /// Reservoir irrigation supply per unit cell area (mm).
    pub reservoir_supply_mm: f64,
    /// Reservoir storage at month end, for cells with an operating dam.
    pub reservoir_storage: Option<f64>,
}

impl MonthlyOutput {
    pub(crate) fn close(
        node: NodeId,
        year: i32,
        month: Month,
        area: f64,
        acc: &MonthAccumulator,
        reservoir_storage: Option<f64>,
    ) -> Self {
        let days = f64::from(acc.days.max(1));
        let per_area = |v: f64| if area > 0.0 { v / area } else { 0.0 };
        Self {
            node,
            year,
            month,
            inflow: acc.inflow,
            outflow: acc.outflow,
            discharge: litres_per_day_to_m3s(acc.discharge / days),
            mean_storage: acc.storage / days,
            local_withdrawal_mm: per_area(acc.local_withdrawal),
            neighbour_withdrawal_mm: per_area(acc.neighbour_withdrawal),
            reservoir_supply_mm: per_area(acc.reservoir_supply),
            reservoir_storage,
        }
    }
}
