//! FNV-1a hash of routing state.
//!
//! Used to check that a restarted run is in exactly the state of an
//! uninterrupted one. Every f64 is hashed by bit pattern, so `0.0` and
//! `-0.0` differ. Not cryptographically secure.

use hydroute_engine::{CellState, RoutingDomain};
use hydroute_reservoir::ReservoirState;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[derive(Clone, Copy)]
struct Fnv(u64);

impl Fnv {
    #[inline]
    fn byte(self, byte: u8) -> Self {
        Self((self.0 ^ byte as u64).wrapping_mul(FNV_PRIME))
    }

    #[inline]
    fn u64(self, v: u64) -> Self {
        v.to_le_bytes().into_iter().fold(self, Self::byte)
    }

    #[inline]
    fn f64(self, v: f64) -> Self {
        self.u64(v.to_bits())
    }

    fn f64s(self, values: impl IntoIterator<Item = f64>) -> Self {
        values.into_iter().fold(self, Self::f64)
    }
}

/// Hash every piece of state a checkpoint carries.
pub fn state_hash(domain: &RoutingDomain) -> u64 {
    let mut h = Fnv(FNV_OFFSET)
        .u64(domain.range().start as u64)
        .u64(domain.len() as u64);
    h = match domain.year() {
        Some(year) => h.byte(1).u64(year as u64),
        None => h.byte(0),
    };
    domain.cells().iter().fold(h, hash_cell).0
}

fn hash_cell(h: Fnv, cell: &CellState) -> Fnv {
    let m = &cell.month;
    let h = h
        .f64s([
            cell.river,
            cell.lake,
            cell.lake_max,
            cell.demand,
            cell.neighbour_demand,
            cell.deficit,
            cell.withdrawal,
            cell.outflow_yesterday,
        ])
        .f64s([
            m.inflow,
            m.outflow,
            m.discharge,
            m.storage,
            m.local_withdrawal,
            m.neighbour_withdrawal,
            m.reservoir_supply,
        ])
        .u64(u64::from(m.days))
        .u64(cell.queue.len() as u64)
        .f64s(cell.queue.iter());
    match &cell.reservoir {
        Some(r) => hash_reservoir(h.byte(1), r.state()),
        None => h.byte(0),
    }
}

fn hash_reservoir(h: Fnv, s: &ReservoirState) -> Fnv {
    let mut h = h
        .f64s([
            s.storage,
            s.release_to_river,
            s.release_to_irrigation,
            s.demand_today,
            s.demand_fraction,
            s.month_inflow,
            s.month_demand,
        ])
        .u64(u64::from(s.month_days))
        .f64s(s.buffer.iter().copied());
    let hist = &s.history;
    for row in 0..hist.years() {
        h = h.u64(hist.year[row] as u64);
        h = hist.recorded[row].iter().fold(h, |h, &r| h.byte(r as u8));
        h = h
            .f64s(hist.inflow[row])
            .f64s(hist.demand[row])
            .f64s(hist.level[row]);
    }
    h.f64s(s.mean_inflow_month)
        .f64s(s.mean_demand_month)
        .f64s(s.mean_level_month)
        .f64s(s.target_release_month)
        .f64s([
            s.mean_inflow,
            s.mean_demand,
            s.mean_volume,
            s.c,
            s.target_release_year,
            s.k_rls,
        ])
        .byte(s.operational_start.index() as u8)
}
