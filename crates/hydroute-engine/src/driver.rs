//! Drivers: run a sequence of days on one thread or one thread per
//! worker.

use std::error::Error;
use std::fmt;
use std::ops::Range;
use std::thread;

use hydroute_core::{Month, RoutingError, WorkerRank, DAYS_PER_YEAR};
use hydroute_exchange::{ChannelExchange, ChannelFabric, Exchange, ExchangePlan, LocalExchange};
use hydroute_topology::{IrrigationNetwork, LinkTable, Partition, RiverNetwork};

use crate::config::{ConfigError, RoutingConfig};
use crate::domain::{CellParams, RoutingDomain};
use crate::output::{DayReport, MonthlyOutput};

// ── Forcing ────────────────────────────────────────────────────────

/// Daily inputs for a run. Day `d` falls in year `first_year + d / 365`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Forcing {
    /// Calendar year of day 0.
    pub first_year: i32,
    /// Runoff per day and cell (mm).
    pub runoff: Vec<Vec<f64>>,
    /// Withdrawal demand per day and cell (litres), routed through the
    /// irrigation network when present.
    pub demand: Option<Vec<Vec<f64>>>,
}

impl Forcing {
    /// Number of days covered.
    pub fn days(&self) -> usize {
        self.runoff.len()
    }

    /// Check every day has one value per cell.
    pub fn validate(&self, cells: usize) -> Result<(), ConfigError> {
        let demand_days = self.demand.as_ref().map_or(0, Vec::len);
        if self.demand.is_some() && demand_days != self.days() {
            return Err(ConfigError::CellCount {
                what: "demand forcing days",
                expected: self.days(),
                found: demand_days,
            });
        }
        let rows = self.runoff.iter().map(|r| ("runoff forcing", r));
        let demand = self.demand.iter().flatten().map(|r| ("demand forcing", r));
        for (what, row) in rows.chain(demand) {
            if row.len() != cells {
                return Err(ConfigError::CellCount {
                    what,
                    expected: cells,
                    found: row.len(),
                });
            }
        }
        Ok(())
    }

    /// Year and zero-based day of year of day `day`.
    pub fn calendar(&self, day: usize) -> (i32, u32) {
        let per_year = DAYS_PER_YEAR as usize;
        (
            self.first_year + (day / per_year) as i32,
            (day % per_year) as u32,
        )
    }
}

// ── Worker plumbing ────────────────────────────────────────────────

/// The three exchanges a worker takes part in every day.
#[derive(Debug)]
pub struct WorkerLinks<E> {
    /// River graph, one round per sub-daily iteration.
    pub river: E,
    /// Irrigation requests, requester to neighbour.
    pub request: E,
    /// Irrigation deliveries, neighbour to requester.
    pub deliver: E,
}

/// What one worker produced over a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkerOutput {
    /// Routed inflow per day and owned cell (litres).
    pub discharge: Vec<Vec<f64>>,
    /// Daily water leaving through sinks.
    pub sink_outflow: Vec<f64>,
    /// Daily withdrawal.
    pub withdrawal: Vec<f64>,
    /// Monthly records, in month then node order.
    pub monthly: Vec<MonthlyOutput>,
}

/// The owned part of one day's per-cell input.
fn owned_slice<'a>(
    what: &'static str,
    rows: &'a [Vec<f64>],
    day: usize,
    range: &Range<usize>,
) -> Result<&'a [f64], RoutingError> {
    let row = rows.get(day).map_or(&[][..], Vec::as_slice);
    row.get(range.clone()).ok_or(RoutingError::InputLength {
        what,
        expected: range.end,
        found: row.len(),
    })
}

/// Route one day and apply the neighbour-withdrawal rounds around it.
pub fn step_day<E: Exchange>(
    domain: &mut RoutingDomain,
    links: &mut WorkerLinks<E>,
    forcing: &Forcing,
    day: usize,
) -> Result<DayReport, RoutingError> {
    let (year, doy) = forcing.calendar(day);
    if doy == 0 {
        domain.begin_year(year);
    }
    let range = domain.range();
    let demand = match &forcing.demand {
        Some(rows) => Some(owned_slice("demand forcing", rows, day, &range)?),
        None => None,
    };
    if let Some(demand) = demand {
        domain.request_neighbour_water(demand, &mut links.request)?;
    }
    let runoff = owned_slice("runoff forcing", &forcing.runoff, day, &range)?;
    let report = domain.drain_day(runoff, Month::of_day(doy), &mut links.river)?;
    if demand.is_some() {
        domain.deliver_neighbour_water(&mut links.deliver)?;
    }
    Ok(report)
}

/// Route `days` of `forcing`, closing months and years as they end.
pub fn run_days<E: Exchange>(
    domain: &mut RoutingDomain,
    links: &mut WorkerLinks<E>,
    forcing: &Forcing,
    days: Range<usize>,
) -> Result<WorkerOutput, RoutingError> {
    let mut out = WorkerOutput::default();
    for day in days {
        let report = step_day(domain, links, forcing, day)?;
        out.sink_outflow.push(report.sink_outflow);
        out.withdrawal.push(report.withdrawal);
        out.discharge.push(report.discharge);

        let (year, doy) = forcing.calendar(day);
        let month = Month::of_day(doy);
        if Month::of_day(doy + 1) != month {
            out.monthly.extend(domain.end_of_month(month, year));
        }
        if doy + 1 == DAYS_PER_YEAR {
            domain.end_of_year(year);
        }
    }
    Ok(out)
}

fn plans(
    links: &LinkTable,
    partition: &Partition,
) -> Result<Vec<ExchangePlan>, ConfigError> {
    partition
        .ranks()
        .map(|rank| ExchangePlan::new(links, partition, rank).map_err(ConfigError::from))
        .collect()
}

// ── SerialRouter ───────────────────────────────────────────────────

/// Single-threaded router owning every cell.
#[derive(Debug)]
pub struct SerialRouter {
    domain: RoutingDomain,
    links: WorkerLinks<LocalExchange>,
}

impl SerialRouter {
    /// Set up one domain for the whole network.
    pub fn new(
        network: &RiverNetwork,
        irrigation: &IrrigationNetwork,
        cells: &[CellParams],
        config: &RoutingConfig,
    ) -> Result<Self, ConfigError> {
        let partition = Partition::contiguous(network.len(), 1)?;
        let rank = WorkerRank(0);
        let domain = RoutingDomain::new(network, irrigation, &partition, rank, cells, config)?;
        let local = |links: &LinkTable| -> Result<LocalExchange, ConfigError> {
            Ok(LocalExchange::new(ExchangePlan::new(links, &partition, rank)?)?)
        };
        let links = WorkerLinks {
            river: local(network.links())?,
            request: local(irrigation.forward())?,
            deliver: local(irrigation.back())?,
        };
        Ok(Self { domain, links })
    }

    /// The routing state.
    pub fn domain(&self) -> &RoutingDomain {
        &self.domain
    }

    /// Mutable routing state, for restoring checkpoints.
    pub fn domain_mut(&mut self) -> &mut RoutingDomain {
        &mut self.domain
    }

    /// Route a single day.
    pub fn step(&mut self, forcing: &Forcing, day: usize) -> Result<DayReport, RoutingError> {
        step_day(&mut self.domain, &mut self.links, forcing, day)
    }

    /// Route `days` of `forcing`.
    pub fn run(&mut self, forcing: &Forcing, days: Range<usize>) -> Result<WorkerOutput, RoutingError> {
        run_days(&mut self.domain, &mut self.links, forcing, days)
    }
}

// ── Parallel run ───────────────────────────────────────────────────

/// Failure of a multi-worker run.
#[derive(Debug)]
pub enum RunError {
    /// Setup failed before any worker started.
    Config(ConfigError),
    /// A worker's routing step failed.
    Routing {
        /// The failing worker.
        rank: WorkerRank,
        /// What went wrong.
        source: RoutingError,
    },
    /// A worker thread panicked.
    WorkerPanicked {
        /// The failing worker.
        rank: WorkerRank,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Routing { rank, source } => write!(f, "worker {rank}: {source}"),
            Self::WorkerPanicked { rank } => write!(f, "worker {rank} panicked"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Routing { source, .. } => Some(source),
            Self::WorkerPanicked { .. } => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Result of [`run_parallel`].
#[derive(Debug)]
pub struct ParallelRun {
    /// Routed inflow per day and cell (litres), in node order.
    pub discharge: Vec<Vec<f64>>,
    /// Monthly records from every worker, in rank order.
    pub monthly: Vec<MonthlyOutput>,
    /// Final state of each worker's domain, in rank order.
    pub domains: Vec<RoutingDomain>,
}

/// Route every day of `forcing` with `workers` threads, each owning a
/// contiguous range of cells.
///
/// Discharge is bit-identical to a [`SerialRouter`] run over the same
/// inputs.
pub fn run_parallel(
    network: &RiverNetwork,
    irrigation: &IrrigationNetwork,
    cells: &[CellParams],
    config: &RoutingConfig,
    workers: usize,
    forcing: &Forcing,
) -> Result<ParallelRun, RunError> {
    forcing.validate(network.len())?;
    let partition = Partition::contiguous(network.len(), workers).map_err(ConfigError::from)?;
    let mut domains = partition
        .ranks()
        .map(|rank| RoutingDomain::new(network, irrigation, &partition, rank, cells, config))
        .collect::<Result<Vec<_>, _>>()?;
    let river = ChannelFabric::connect(plans(network.links(), &partition)?).map_err(ConfigError::from)?;
    let request =
        ChannelFabric::connect(plans(irrigation.forward(), &partition)?).map_err(ConfigError::from)?;
    let deliver =
        ChannelFabric::connect(plans(irrigation.back(), &partition)?).map_err(ConfigError::from)?;
    log::debug!("running {} days on {workers} workers", forcing.days());

    let days = 0..forcing.days();
    let results: Vec<(WorkerRank, thread::Result<Result<WorkerOutput, RoutingError>>)> =
        thread::scope(|s| {
            let handles: Vec<_> = domains
                .iter_mut()
                .zip(river.into_iter().zip(request).zip(deliver))
                .map(|(domain, ((river, request), deliver))| {
                    let rank = domain.rank();
                    let mut links: WorkerLinks<ChannelExchange> = WorkerLinks {
                        river,
                        request,
                        deliver,
                    };
                    let days = days.clone();
                    let handle = s.spawn(move || run_days(domain, &mut links, forcing, days));
                    (rank, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(rank, h)| (rank, h.join()))
                .collect()
        });

    let mut outputs = Vec::with_capacity(results.len());
    let mut failure: Option<RunError> = None;
    for (rank, result) in results {
        match result {
            Ok(Ok(out)) => outputs.push(out),
            Ok(Err(source)) => {
                // Peers of a failed worker see it disconnect; keep the
                // error that is not a consequence of another.
                let secondary = matches!(source, RoutingError::Exchange(_));
                let replace = match &failure {
                    None => true,
                    Some(RunError::Routing { source: prev, .. }) => {
                        matches!(prev, RoutingError::Exchange(_)) && !secondary
                    }
                    Some(_) => false,
                };
                if replace {
                    failure = Some(RunError::Routing { rank, source });
                }
            }
            Err(_) => {
                if !matches!(failure, Some(RunError::WorkerPanicked { .. })) {
                    failure = Some(RunError::WorkerPanicked { rank });
                }
            }
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let mut discharge = vec![Vec::with_capacity(network.len()); forcing.days()];
    let mut monthly = Vec::new();
    for out in outputs {
        for (day, values) in out.discharge.into_iter().enumerate() {
            discharge[day].extend(values);
        }
        monthly.extend(out.monthly);
    }
    Ok(ParallelRun {
        discharge,
        monthly,
        domains,
    })
}
