//! Daily, monthly and annual reservoir operation.
//!
//! Release follows Hanasaki et al. (2006): a monthly target release `r_m`
//! derived from mean inflow (and, for irrigation reservoirs, mean demand)
//! is scaled by a release coefficient `k_rls` fixed at the start of each
//! operational year. Reservoirs that are small relative to their inflow
//! (`c < 0.5`) blend the target with the natural monthly inflow.
//!
//! Irrigation reservoirs hold released water above the environmental
//! flow in a buffer of `irrigation_days` days. Unused water returns to the
//! river when it falls out of the buffer.

use hydroute_core::{settle_storage, Month, NodeId, StorageKind, DAYS_PER_YEAR, NMONTH};

use crate::error::ReservoirError;
use crate::history::History;
use crate::params::{OperationalYearStart, ReservoirParams};
use crate::record::{PurposeSet, ReservoirRecord};

/// Capacity-to-inflow ratio above which release ignores natural inflow.
const LARGE_RESERVOIR_RATIO: f64 = 0.5;

/// Square metres per km².
const M2_PER_KM2: f64 = 1e6;

/// Rounding tolerance for buffer and storage bookkeeping.
const EPSILON: f64 = 1e-9;

/// Today's release decision.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Release {
    /// Water sent to the river (environmental flow plus expired buffer).
    pub to_river: f64,
    /// Water put into the newest irrigation-buffer day.
    pub to_irrigation: f64,
}

/// Water exchanged with the atmosphere over the reservoir surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceFlux {
    /// Precipitation added to storage (litres).
    pub precipitation: f64,
    /// Evaporation taken from storage (litres).
    pub evaporation: f64,
    /// Excess over capacity that left the reservoir (litres).
    pub spill: f64,
}

/// Mutable state of one reservoir.
///
/// All volumes are in litres, all rates in litres per day.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservoirState {
    /// Water currently stored.
    pub storage: f64,
    /// Today's release to the river.
    pub release_to_river: f64,
    /// Today's release into the irrigation buffer.
    pub release_to_irrigation: f64,
    /// Irrigation buffer, oldest day first.
    pub buffer: Vec<f64>,
    /// Irrigation demand placed today.
    pub demand_today: f64,
    /// Fraction of today's demand that was met.
    pub demand_fraction: f64,
    /// Inflow so far this month.
    pub month_inflow: f64,
    /// Demand so far this month.
    pub month_demand: f64,
    /// Days released so far this month.
    pub month_days: u32,
    /// Monthly history.
    pub history: History,
    /// Mean inflow per calendar month (litres per month).
    pub mean_inflow_month: [f64; NMONTH],
    /// Mean demand per calendar month (litres per month).
    pub mean_demand_month: [f64; NMONTH],
    /// Mean end-of-month storage per calendar month.
    pub mean_level_month: [f64; NMONTH],
    /// Mean inflow rate.
    pub mean_inflow: f64,
    /// Mean demand rate.
    pub mean_demand: f64,
    /// Mean storage.
    pub mean_volume: f64,
    /// Capacity over mean annual inflow.
    pub c: f64,
    /// Target release for the current operational year.
    pub target_release_year: f64,
    /// Target release rate per calendar month.
    pub target_release_month: [f64; NMONTH],
    /// Release coefficient for the current operational year.
    pub k_rls: f64,
    /// First month of the operational year.
    pub operational_start: Month,
}

impl ReservoirState {
    fn new(params: &ReservoirParams) -> Self {
        Self {
            storage: 0.0,
            release_to_river: 0.0,
            release_to_irrigation: 0.0,
            buffer: vec![0.0; params.irrigation_days],
            demand_today: 0.0,
            demand_fraction: 0.0,
            month_inflow: 0.0,
            month_demand: 0.0,
            month_days: 0,
            history: History::new(params.hist_years),
            mean_inflow_month: [0.0; NMONTH],
            mean_demand_month: [0.0; NMONTH],
            mean_level_month: [0.0; NMONTH],
            mean_inflow: 0.0,
            mean_demand: 0.0,
            mean_volume: 0.0,
            c: 1.0,
            target_release_year: 0.0,
            target_release_month: [0.0; NMONTH],
            k_rls: 1.0,
            operational_start: match params.operational_year {
                OperationalYearStart::Fixed(m) => m,
                OperationalYearStart::Auto => Month::JANUARY,
            },
        }
    }
}

/// A dam and its operating state.
#[derive(Clone, Debug, PartialEq)]
pub struct Reservoir {
    cell: NodeId,
    record: ReservoirRecord,
    purposes: PurposeSet,
    params: ReservoirParams,
    state: ReservoirState,
    cold_start_warned: bool,
}

impl Reservoir {
    /// Validate a record and set up an empty reservoir.
    pub fn from_record(
        cell: NodeId,
        record: &ReservoirRecord,
        params: &ReservoirParams,
    ) -> Result<Self, ReservoirError> {
        params.validate()?;
        let malformed = |reason: String| ReservoirError::Malformed { cell, reason };
        if !record.has_dam() {
            return Err(malformed(format!(
                "commission year {} does not describe a dam",
                record.commission_year
            )));
        }
        if !(record.capacity.is_finite() && record.capacity > 0.0) {
            return Err(malformed(format!("capacity {} is not positive", record.capacity)));
        }
        if !(record.surface_area.is_finite() && record.surface_area >= 0.0) {
            return Err(malformed(format!(
                "surface area {} is negative",
                record.surface_area
            )));
        }
        if record.height < 0 || record.installed_capacity < 0 {
            return Err(malformed(format!(
                "height {} / installed capacity {} is negative",
                record.height, record.installed_capacity
            )));
        }
        let purposes = PurposeSet::from_record(cell, &record.purpose)?;
        Ok(Self {
            cell,
            record: *record,
            purposes,
            params: *params,
            state: ReservoirState::new(params),
            cold_start_warned: false,
        })
    }

    /// Cell the dam sits in.
    pub fn cell(&self) -> NodeId {
        self.cell
    }

    /// The input record.
    pub fn record(&self) -> &ReservoirRecord {
        &self.record
    }

    /// Operating purposes.
    pub fn purposes(&self) -> PurposeSet {
        self.purposes
    }

    /// Operating parameters.
    pub fn params(&self) -> &ReservoirParams {
        &self.params
    }

    /// Maximum storage.
    pub fn capacity(&self) -> f64 {
        self.record.capacity
    }

    /// Current storage.
    pub fn storage(&self) -> f64 {
        self.state.storage
    }

    /// Water waiting in the irrigation buffer.
    pub fn buffered(&self) -> f64 {
        self.state.buffer.iter().sum()
    }

    /// Storage plus buffer.
    pub fn total_water(&self) -> f64 {
        self.state.storage + self.buffered()
    }

    /// `true` for reservoirs with an irrigation buffer in use.
    pub fn is_irrigation(&self) -> bool {
        self.purposes.is_irrigation()
    }

    /// `true` once the dam operates in `year`.
    pub fn is_commissioned(&self, year: i32) -> bool {
        year >= self.record.commission_year
    }

    /// Full operating state.
    pub fn state(&self) -> &ReservoirState {
        &self.state
    }

    /// Mutable operating state, for restoring checkpoints.
    pub fn state_mut(&mut self) -> &mut ReservoirState {
        &mut self.state
    }

    // ── Daily ───────────────────────────────────────────────────

    /// Add `inflow` to storage; returns the part that did not fit.
    pub fn fill(&mut self, inflow: f64) -> f64 {
        self.state.storage += inflow;
        if self.state.storage > self.record.capacity {
            let spill = self.state.storage - self.record.capacity;
            self.state.storage = self.record.capacity;
            spill
        } else {
            0.0
        }
    }

    /// Count `volume` towards this month's inflow statistics.
    pub fn record_inflow(&mut self, volume: f64) {
        self.state.month_inflow += volume;
    }

    fn warn_cold_start(&mut self) {
        if !self.cold_start_warned {
            self.cold_start_warned = true;
            log::warn!(
                "reservoir in cell {} has no inflow history; releasing current-month mean inflow",
                self.cell
            );
        }
    }

    /// Decide and take today's release from storage.
    pub fn daily_release(&mut self, month: Month) -> Release {
        self.state.month_days += 1;
        let days = f64::from(month.days());
        let m = month.index();
        let (target, inflow_rate) = if self.state.history.is_empty() {
            self.warn_cold_start();
            let rate = self.state.month_inflow / f64::from(self.state.month_days);
            (rate, rate)
        } else {
            (
                self.state.target_release_month[m],
                self.state.mean_inflow_month[m] / days,
            )
        };

        let s = &mut self.state;
        let managed = s.k_rls * target;
        let wanted = if s.c >= LARGE_RESERVOIR_RATIO {
            managed
        } else {
            let w = (s.c / LARGE_RESERVOIR_RATIO).powi(2);
            w * managed + (1.0 - w) * inflow_rate
        };
        let release = wanted.max(0.0).min(s.storage);
        s.storage -= release;
        let env_flow = self.params.env_flow * inflow_rate;
        self.route_release(release, env_flow)
    }

    /// Today's step for a dam on a cell without a downstream neighbour.
    ///
    /// Storage is held back. An irrigation reservoir still ages its
    /// buffer, and the expired day is returned as `to_river`.
    pub fn hold_release(&mut self) -> Release {
        self.state.month_days += 1;
        self.route_release(0.0, 0.0)
    }

    /// Split `release` between the river and the irrigation buffer.
    fn route_release(&mut self, release: f64, env_flow: f64) -> Release {
        let s = &mut self.state;
        let mut to_river = release;
        let mut to_irrigation = 0.0;
        if self.purposes.is_irrigation() {
            let expired = s.buffer[0];
            s.buffer.rotate_left(1);
            let last = s.buffer.len() - 1;
            s.buffer[last] = 0.0;
            if release > env_flow {
                to_irrigation = release - env_flow;
                s.buffer[last] = to_irrigation;
                to_river = env_flow;
            }
            to_river += expired;
        }
        s.release_to_river = to_river;
        s.release_to_irrigation = to_irrigation;
        Release {
            to_river,
            to_irrigation,
        }
    }

    /// Serve `demand` from the irrigation buffer, oldest water first.
    /// Returns the volume delivered.
    pub fn supply_irrigation(&mut self, demand: f64) -> f64 {
        let s = &mut self.state;
        if !(demand > 0.0) || !demand.is_finite() {
            s.demand_today = 0.0;
            s.demand_fraction = 0.0;
            return 0.0;
        }
        s.demand_today = demand;
        s.month_demand += demand;
        let available: f64 = s.buffer.iter().sum::<f64>().max(0.0);
        let fraction = (available / demand).min(1.0);
        let delivered = fraction * demand;
        let mut remaining = delivered;
        for day in s.buffer.iter_mut() {
            let take = remaining.min(*day);
            *day -= take;
            remaining -= take;
            *day = settle_storage(
                *day,
                f64::INFINITY,
                delivered,
                EPSILON,
                StorageKind::IrrigationBuffer,
                self.cell,
            );
        }
        s.demand_fraction = fraction;
        delivered - remaining.max(0.0)
    }

    /// Precipitation on and evaporation from the water surface.
    ///
    /// `precip_mm` and `evap_mm` are daily depths; evaporation is capped
    /// at storage and any excess over capacity is returned as spill.
    pub fn update_surface(&mut self, precip_mm: f64, evap_mm: f64) -> SurfaceFlux {
        let area = self.record.surface_area * M2_PER_KM2;
        let s = &mut self.state;
        let precipitation = precip_mm.max(0.0) * area;
        s.storage += precipitation;
        let evaporation = (evap_mm.max(0.0) * area).min(s.storage);
        s.storage -= evaporation;
        let spill = (s.storage - self.record.capacity).max(0.0);
        if spill > 0.0 {
            s.storage = self.record.capacity;
        }
        SurfaceFlux {
            precipitation,
            evaporation,
            spill,
        }
    }

    // ── Monthly / annual ────────────────────────────────────────

    /// Close `month` of `year`: store statistics, refresh means and
    /// targets, and reset `k_rls` when the operational year begins.
    pub fn update_monthly(&mut self, month: Month, year: i32) {
        let s = &mut self.state;
        s.history
            .record(year, month, s.month_inflow, s.month_demand, s.storage);
        s.month_inflow = 0.0;
        s.month_demand = 0.0;
        s.month_days = 0;
        self.refresh_means();
        self.refresh_targets();
        if month.next() == self.state.operational_start
            && self.state.history.complete_years() > 0
        {
            let s = &mut self.state;
            s.k_rls = s.storage / (self.params.alpha * self.record.capacity);
            s.target_release_year = s.mean_inflow;
            log::debug!(
                "reservoir in cell {}: operational year starts, k_rls {:.3}",
                self.cell,
                s.k_rls
            );
        }
    }

    /// Yearly update: capacity ratio and operational-year start.
    pub fn update_annual(&mut self) {
        self.refresh_means();
        if self.state.history.complete_years() == 0 {
            return;
        }
        let s = &mut self.state;
        s.c = if s.mean_inflow > 0.0 {
            self.record.capacity / (s.mean_inflow * f64::from(DAYS_PER_YEAR))
        } else {
            f64::INFINITY
        };
        s.operational_start = match self.params.operational_year {
            OperationalYearStart::Fixed(m) => m,
            OperationalYearStart::Auto => wet_season_end(&s.mean_inflow_month, s.mean_inflow),
        };
    }

    /// Monthly and overall means over complete history years, or over
    /// whatever months exist while no year is complete.
    fn refresh_means(&mut self) {
        let s = &mut self.state;
        let h = &s.history;
        let complete: Vec<bool> = (0..h.years()).map(|r| h.is_complete(r)).collect();
        let any_complete = complete.iter().any(|&c| c);

        let mut covered_days = 0.0;
        let mut covered_months = 0usize;
        let (mut inflow_sum, mut demand_sum, mut level_sum) = (0.0, 0.0, 0.0);
        for month in Month::all() {
            let j = month.index();
            let rows = (0..h.years()).filter(|&r| {
                if any_complete {
                    complete[r]
                } else {
                    h.recorded[r][j]
                }
            });
            let (mut n, mut inflow, mut demand, mut level) = (0usize, 0.0, 0.0, 0.0);
            for r in rows {
                n += 1;
                inflow += h.inflow[r][j];
                demand += h.demand[r][j];
                level += h.level[r][j];
            }
            if n == 0 {
                s.mean_inflow_month[j] = 0.0;
                s.mean_demand_month[j] = 0.0;
                s.mean_level_month[j] = 0.0;
                continue;
            }
            let n = n as f64;
            s.mean_inflow_month[j] = inflow / n;
            s.mean_demand_month[j] = demand / n;
            s.mean_level_month[j] = level / n;
            covered_days += f64::from(month.days());
            covered_months += 1;
            inflow_sum += s.mean_inflow_month[j];
            demand_sum += s.mean_demand_month[j];
            level_sum += s.mean_level_month[j];
        }
        if covered_months == 0 {
            s.mean_inflow = 0.0;
            s.mean_demand = 0.0;
            s.mean_volume = 0.0;
        } else {
            s.mean_inflow = inflow_sum / covered_days;
            s.mean_demand = demand_sum / covered_days;
            s.mean_volume = level_sum / covered_months as f64;
        }
    }

    /// Hanasaki monthly target release.
    fn refresh_targets(&mut self) {
        let irrigation = self.purposes.is_irrigation();
        let s = &mut self.state;
        let i_mean = s.mean_inflow;
        let d_mean = s.mean_demand;
        for month in Month::all() {
            let j = month.index();
            let d_m = s.mean_demand_month[j] / f64::from(month.days());
            let r = if !irrigation {
                i_mean
            } else if d_mean >= 0.5 * i_mean {
                if d_mean > 0.0 {
                    i_mean / 2.0 * (1.0 + d_m / d_mean)
                } else {
                    i_mean
                }
            } else {
                i_mean + d_m - d_mean
            };
            s.target_release_month[j] = r.max(0.0);
        }
    }
}

/// First month after the longest run of wet months, scanning the year
/// twice so a run may wrap past December.
fn wet_season_end(mean_inflow_month: &[f64; NMONTH], mean_inflow: f64) -> Month {
    let wet: Vec<bool> = Month::all()
        .map(|m| mean_inflow_month[m.index()] / f64::from(m.days()) >= mean_inflow)
        .collect();
    let mut start = 0usize;
    let mut run = 0usize;
    let mut longest = 0usize;
    for _pass in 0..2 {
        for (j, &is_wet) in wet.iter().enumerate() {
            if is_wet {
                run += 1;
            } else {
                if run > longest {
                    longest = run;
                    start = j;
                }
                run = 0;
            }
        }
    }
    Month::wrapping(start.min(NMONTH - 1))
}
