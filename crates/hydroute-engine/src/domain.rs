//! Per-worker routing state.
//!
//! A [`RoutingDomain`] owns one contiguous range of cells: their river and
//! lake storage, delay queues, reservoirs, withdrawal bookkeeping and
//! output accumulators. Domains share nothing; every interaction between
//! them goes through an [`Exchange`].

use std::ops::Range;

use hydroute_core::{Downstream, Month, NodeId, RoutingError, WorkerRank};
use hydroute_exchange::Exchange;
use hydroute_queue::DelayQueue;
use hydroute_reservoir::{Reservoir, ReservoirParams, ReservoirRecord, SurfaceFlux};
use hydroute_topology::{IrrigationNetwork, Partition, RiverNetwork, TopologyError};

use crate::config::{ConfigError, RoutingConfig};
use crate::output::{MonthAccumulator, MonthlyOutput, StorageTotals};

/// Static description of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellParams {
    /// Cell area in m².
    pub area: f64,
    /// Lake capacity in litres. Zero for cells without a lake.
    pub lake_capacity: f64,
    /// Dam in this cell, if any.
    pub reservoir: Option<ReservoirRecord>,
}

/// Mutable state of one owned cell.
///
/// Volumes are in litres, daily quantities in litres per day.
#[derive(Clone, Debug, PartialEq)]
pub struct CellState {
    /// Cell area in m².
    pub area: f64,
    /// Where the cell drains.
    pub downstream: Downstream,
    /// Water in the river channel.
    pub river: f64,
    /// Water in the lake.
    pub lake: f64,
    /// Lake capacity.
    pub lake_max: f64,
    /// Travel-time queue of the reach leaving this cell.
    pub queue: DelayQueue,
    /// Dam in this cell.
    pub reservoir: Option<Reservoir>,
    /// `true` if the cell may draw water from an irrigation neighbour.
    pub has_neighbour: bool,
    /// Withdrawal demand served in this cell, including neighbour
    /// requests.
    pub demand: f64,
    /// Part of `demand` requested by other cells.
    pub neighbour_demand: f64,
    /// Part of this cell's own demand passed on to its neighbour.
    pub deficit: f64,
    /// Water withdrawn today.
    pub withdrawal: f64,
    /// Yesterday's release into the downstream reach.
    pub outflow_yesterday: f64,
    /// Running monthly sums.
    pub month: MonthAccumulator,
}

impl CellState {
    /// River, lake and reservoir water in this cell.
    pub fn total_water(&self) -> f64 {
        self.river + self.lake + self.reservoir.as_ref().map_or(0.0, Reservoir::total_water)
    }
}

/// Routing state of the cells owned by one worker.
#[derive(Clone, Debug)]
pub struct RoutingDomain {
    rank: WorkerRank,
    first: usize,
    pub(crate) cells: Vec<CellState>,
    substeps: u32,
    lake_outflow_coefficient: f64,
    epsilon: f64,
    reservoir_params: ReservoirParams,
    year: Option<i32>,
    pub(crate) outflow: Vec<f64>,
    pub(crate) inflow: Vec<f64>,
}

impl RoutingDomain {
    /// Set up the cells `partition` assigns to `rank`.
    ///
    /// `cells` describes every cell of the network, indexed by node.
    pub fn new(
        network: &RiverNetwork,
        irrigation: &IrrigationNetwork,
        partition: &Partition,
        rank: WorkerRank,
        cells: &[CellParams],
        config: &RoutingConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = network.len();
        for (what, found) in [
            ("cell parameters", cells.len()),
            ("irrigation network", irrigation.len()),
            ("partition", partition.len()),
        ] {
            if found != n {
                return Err(ConfigError::CellCount {
                    what,
                    expected: n,
                    found,
                });
            }
        }
        if rank.index() >= partition.workers() {
            return Err(TopologyError::InvalidPartition {
                reason: format!(
                    "rank {rank} outside partition of {} workers",
                    partition.workers()
                ),
            }
            .into());
        }

        let params = config.reservoir_params();
        let range = partition.range(rank);
        let mut owned = Vec::with_capacity(range.len());
        let transfers = network.transfer_functions(
            config.transfer.as_ref(),
            config.substeps_per_day,
            range.clone(),
        )?;
        let mut dams = 0usize;
        for (index, transfer) in range.clone().zip(transfers) {
            let node = NodeId::new(index as u32);
            let cell = &cells[index];
            if !(cell.area.is_finite() && cell.area >= 0.0) {
                return Err(ConfigError::InvalidCell {
                    cell: node,
                    reason: format!("area {} is not a non-negative number", cell.area),
                });
            }
            if !(cell.lake_capacity.is_finite() && cell.lake_capacity >= 0.0) {
                return Err(ConfigError::InvalidCell {
                    cell: node,
                    reason: format!(
                        "lake capacity {} is not a non-negative number",
                        cell.lake_capacity
                    ),
                });
            }
            let reservoir = match &cell.reservoir {
                Some(record) if record.has_dam() => {
                    dams += 1;
                    Some(Reservoir::from_record(node, record, &params)?)
                }
                _ => None,
            };
            owned.push(CellState {
                area: cell.area,
                downstream: network.downstream(node),
                river: 0.0,
                lake: 0.0,
                lake_max: cell.lake_capacity,
                queue: DelayQueue::new(transfer),
                reservoir,
                has_neighbour: irrigation.neighbour(node).is_some(),
                demand: 0.0,
                neighbour_demand: 0.0,
                deficit: 0.0,
                withdrawal: 0.0,
                outflow_yesterday: 0.0,
                month: MonthAccumulator::default(),
            });
        }
        log::debug!(
            "worker {rank}: cells {}..{}, {dams} reservoirs",
            range.start,
            range.end
        );
        let len = owned.len();
        Ok(Self {
            rank,
            first: range.start,
            cells: owned,
            substeps: config.substeps_per_day,
            lake_outflow_coefficient: config.lake_outflow_coefficient,
            epsilon: config.epsilon,
            reservoir_params: params,
            year: None,
            outflow: vec![0.0; len],
            inflow: vec![0.0; len],
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Worker owning this domain.
    pub fn rank(&self) -> WorkerRank {
        self.rank
    }

    /// Global indices of the owned cells.
    pub fn range(&self) -> Range<usize> {
        self.first..self.first + self.cells.len()
    }

    /// Number of owned cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` if the worker owns no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// State of every owned cell, in node order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Mutable cell state, for restoring checkpoints.
    pub fn cells_mut(&mut self) -> &mut [CellState] {
        &mut self.cells
    }

    /// State of `node`, if owned.
    pub fn cell(&self, node: NodeId) -> Option<&CellState> {
        self.local(node).ok().map(|i| &self.cells[i])
    }

    /// Sub-daily iterations per [`drain_day`](Self::drain_day).
    pub fn substeps_per_day(&self) -> u32 {
        self.substeps
    }

    /// Operating rules shared by every reservoir.
    pub fn reservoir_params(&self) -> &ReservoirParams {
        &self.reservoir_params
    }

    pub(crate) fn lake_outflow_coefficient(&self) -> f64 {
        self.lake_outflow_coefficient
    }

    pub(crate) fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Current model year, once [`begin_year`](Self::begin_year) ran.
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Restore the model year from a checkpoint.
    pub fn set_year(&mut self, year: Option<i32>) {
        self.year = year;
    }

    /// Storage summed over the owned cells.
    pub fn storage(&self) -> StorageTotals {
        let mut totals = StorageTotals::default();
        for cell in &self.cells {
            totals.river += cell.river;
            totals.lake += cell.lake;
            if let Some(r) = &cell.reservoir {
                totals.reservoir += r.total_water();
            }
        }
        totals
    }

    /// All water held by the owned cells.
    pub fn total_water(&self) -> f64 {
        self.cells.iter().map(CellState::total_water).sum()
    }

    pub(crate) fn local(&self, node: NodeId) -> Result<usize, RoutingError> {
        let i = node.index().wrapping_sub(self.first);
        if i < self.cells.len() {
            Ok(i)
        } else {
            Err(RoutingError::NotOwned { node })
        }
    }

    pub(crate) fn node(&self, local: usize) -> NodeId {
        NodeId::new((self.first + local) as u32)
    }

    /// Reject per-cell inputs of the wrong length or with negative or
    /// non-finite values.
    pub(crate) fn check_input(&self, what: &'static str, values: &[f64]) -> Result<(), RoutingError> {
        if values.len() != self.cells.len() {
            return Err(RoutingError::InputLength {
                what,
                expected: self.cells.len(),
                found: values.len(),
            });
        }
        match values.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
            Some(i) => Err(RoutingError::InvalidInput {
                what,
                node: self.node(i),
                value: values[i],
            }),
            None => Ok(()),
        }
    }

    /// `true` if the cell's dam operates in the current year.
    pub(crate) fn dam_active(year: Option<i32>, reservoir: &Reservoir) -> bool {
        year.is_none_or(|y| reservoir.is_commissioned(y))
    }

    // ── Calendar ────────────────────────────────────────────────

    /// Start model year `year`. Dams commissioned after `year` stay idle;
    /// until the first call every dam operates.
    pub fn begin_year(&mut self, year: i32) {
        let before = self.year;
        self.year = Some(year);
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(r) = &cell.reservoir {
                let was = Self::dam_active(before, r);
                if !was && r.is_commissioned(year) {
                    log::info!("reservoir at node {} starts operating in {year}", self.node(i));
                }
            }
        }
    }

    /// Close `month` of `year`: update reservoir statistics and return the
    /// month's output for every owned cell.
    pub fn end_of_month(&mut self, month: Month, year: i32) -> Vec<MonthlyOutput> {
        let current = self.year;
        let first = self.first;
        self.cells
            .iter_mut()
            .enumerate()
            .map(|(i, cell)| {
                let storage = match &mut cell.reservoir {
                    Some(r) if Self::dam_active(current, r) => {
                        r.update_monthly(month, year);
                        Some(r.storage())
                    }
                    _ => None,
                };
                let node = NodeId::new((first + i) as u32);
                let out = MonthlyOutput::close(node, year, month, cell.area, &cell.month, storage);
                cell.month = MonthAccumulator::default();
                out
            })
            .collect()
    }

    /// Close model year `year`: annual reservoir update.
    pub fn end_of_year(&mut self, year: i32) {
        let current = self.year.or(Some(year));
        for cell in &mut self.cells {
            if let Some(r) = &mut cell.reservoir {
                if Self::dam_active(current, r) {
                    r.update_annual();
                }
            }
        }
    }

    // ── Withdrawal ──────────────────────────────────────────────

    /// Set today's withdrawal demand per owned cell, served locally only.
    pub fn set_withdrawal_demand(&mut self, demand: &[f64]) -> Result<(), RoutingError> {
        self.check_input("withdrawal demand", demand)?;
        for (cell, &d) in self.cells.iter_mut().zip(demand) {
            cell.demand = d;
            cell.neighbour_demand = 0.0;
            cell.deficit = 0.0;
        }
        Ok(())
    }

    /// Set today's demand, passing the part a cell's own river is not
    /// expected to cover on to its irrigation neighbour.
    ///
    /// A cell covers up to yesterday's outflow itself. `exchange` must run
    /// the irrigation request graph (requester to neighbour). Afterwards
    /// each cell's demand is its local share plus everything its
    /// requesters asked for.
    pub fn request_neighbour_water(
        &mut self,
        demand: &[f64],
        exchange: &mut dyn Exchange,
    ) -> Result<(), RoutingError> {
        self.check_input("withdrawal demand", demand)?;
        for ((cell, &d), request) in self.cells.iter_mut().zip(demand).zip(&mut self.outflow) {
            cell.deficit = if cell.has_neighbour {
                (d - cell.outflow_yesterday).max(0.0)
            } else {
                0.0
            };
            cell.demand = d - cell.deficit;
            *request = cell.deficit;
        }
        exchange.exchange(&self.outflow, &mut self.inflow)?;
        for (cell, &requested) in self.cells.iter_mut().zip(&self.inflow) {
            cell.neighbour_demand = requested;
            cell.demand += requested;
        }
        Ok(())
    }

    /// After [`drain_day`](Self::drain_day), hand water withdrawn on
    /// behalf of requesters back to them.
    ///
    /// `exchange` must run the mirrored irrigation graph (neighbour to
    /// requester). Returns the water each owned cell received. A neighbour
    /// that could not meet all requests shares what it has in proportion
    /// to each request.
    pub fn deliver_neighbour_water(
        &mut self,
        exchange: &mut dyn Exchange,
    ) -> Result<Vec<f64>, RoutingError> {
        for (cell, fraction) in self.cells.iter_mut().zip(&mut self.outflow) {
            let local_part = cell.demand - cell.neighbour_demand;
            let surplus = (cell.withdrawal - local_part).max(0.0);
            *fraction = if cell.neighbour_demand > 0.0 {
                cell.withdrawal -= surplus;
                cell.month.local_withdrawal -= surplus;
                (surplus / cell.neighbour_demand).min(1.0)
            } else {
                0.0
            };
        }
        exchange.exchange(&self.outflow, &mut self.inflow)?;
        let received: Vec<f64> = self
            .cells
            .iter_mut()
            .zip(&self.inflow)
            .map(|(cell, &fraction)| {
                let water = fraction * cell.deficit;
                cell.withdrawal += water;
                cell.month.neighbour_withdrawal += water;
                water
            })
            .collect();
        Ok(received)
    }

    // ── Reservoirs ──────────────────────────────────────────────

    /// Serve irrigation `demand` (litres) at `node` from its reservoir's
    /// irrigation buffer. Returns the volume delivered.
    pub fn supply_from_reservoir(&mut self, node: NodeId, demand: f64) -> Result<f64, RoutingError> {
        let i = self.local(node)?;
        if !(demand.is_finite() && demand >= 0.0) {
            return Err(RoutingError::InvalidInput {
                what: "reservoir demand",
                node,
                value: demand,
            });
        }
        let year = self.year;
        let cell = &mut self.cells[i];
        match &mut cell.reservoir {
            Some(r) if Self::dam_active(year, r) => {
                let delivered = r.supply_irrigation(demand);
                cell.month.reservoir_supply += delivered;
                Ok(delivered)
            }
            _ => Err(RoutingError::NoReservoir { node }),
        }
    }

    /// Apply daily precipitation and evaporation depths (mm) to every
    /// operating reservoir surface. Spill goes to the cell's lake.
    pub fn update_reservoir_surface(
        &mut self,
        precip_mm: &[f64],
        evap_mm: &[f64],
    ) -> Result<SurfaceFlux, RoutingError> {
        self.check_input("precipitation", precip_mm)?;
        self.check_input("evaporation", evap_mm)?;
        let year = self.year;
        let mut total = SurfaceFlux::default();
        for ((cell, &p), &e) in self.cells.iter_mut().zip(precip_mm).zip(evap_mm) {
            if let Some(r) = &mut cell.reservoir {
                if Self::dam_active(year, r) {
                    let flux = r.update_surface(p, e);
                    cell.lake += flux.spill;
                    total.precipitation += flux.precipitation;
                    total.evaporation += flux.evaporation;
                    total.spill += flux.spill;
                }
            }
        }
        Ok(total)
    }
}
