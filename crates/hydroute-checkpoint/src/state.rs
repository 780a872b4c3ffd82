//! Writing and restoring a domain's routing state.
//!
//! ```text
//! [MAGIC "HRCK"] [VERSION u8]
//! [first node u64] [cells u64] [hist years u32] [irrigation days u32]
//! [year flag u8] [year i32]?
//! [Cell 1] ... [Cell N]
//! ```
//!
//! Each cell holds storages, withdrawal bookkeeping, monthly sums, the
//! delay queue (newest slot first) and, behind a presence flag, the full
//! reservoir state.

use std::io::{Read, Write};

use hydroute_core::{Month, NodeId, NMONTH};
use hydroute_engine::{CellState, MonthAccumulator, RoutingDomain};
use hydroute_queue::QueueRestore;
use hydroute_reservoir::ReservoirState;

use crate::codec::*;
use crate::error::CheckpointError;
use crate::{FORMAT_VERSION, MAGIC};

/// Outcome of [`read_checkpoint`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestoreReport {
    /// Cells whose saved queue length did not match the current transfer
    /// function. Their queues and river storage restart empty.
    pub queue_resets: Vec<NodeId>,
    /// River water discarded so that river storage again equals what the
    /// delay queues still hold (litres). Negative if the restored queues
    /// owe more than the saved river storage.
    pub river_discarded: f64,
}

// ── Write ───────────────────────────────────────────────────────

/// Write the complete routing state of `domain`.
///
/// Writing the same state twice produces identical bytes.
pub fn write_checkpoint(w: &mut dyn Write, domain: &RoutingDomain) -> Result<(), CheckpointError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    let params = domain.reservoir_params();
    write_u64_le(w, domain.range().start as u64)?;
    write_u64_le(w, domain.len() as u64)?;
    write_u32_le(w, params.hist_years as u32)?;
    write_u32_le(w, params.irrigation_days as u32)?;
    match domain.year() {
        Some(year) => {
            write_u8(w, 1)?;
            write_i32_le(w, year)?;
        }
        None => write_u8(w, 0)?,
    }
    for cell in domain.cells() {
        write_cell(w, cell)?;
    }
    Ok(())
}

fn write_cell(w: &mut dyn Write, cell: &CellState) -> Result<(), CheckpointError> {
    write_f64_array(
        w,
        &[
            cell.river,
            cell.lake,
            cell.lake_max,
            cell.demand,
            cell.neighbour_demand,
            cell.deficit,
            cell.withdrawal,
            cell.outflow_yesterday,
        ],
    )?;
    write_month(w, &cell.month)?;
    let queue: Vec<f64> = cell.queue.iter().collect();
    write_f64_seq(w, &queue)?;
    match &cell.reservoir {
        Some(r) => {
            write_u8(w, 1)?;
            write_reservoir(w, r.state())?;
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

fn write_month(w: &mut dyn Write, m: &MonthAccumulator) -> Result<(), CheckpointError> {
    write_f64_array(
        w,
        &[
            m.inflow,
            m.outflow,
            m.discharge,
            m.storage,
            m.local_withdrawal,
            m.neighbour_withdrawal,
            m.reservoir_supply,
        ],
    )?;
    write_u32_le(w, m.days)
}

fn write_reservoir(w: &mut dyn Write, s: &ReservoirState) -> Result<(), CheckpointError> {
    write_f64_array(
        w,
        &[
            s.storage,
            s.release_to_river,
            s.release_to_irrigation,
            s.demand_today,
            s.demand_fraction,
            s.month_inflow,
            s.month_demand,
        ],
    )?;
    write_u32_le(w, s.month_days)?;
    write_f64_seq(w, &s.buffer)?;

    let h = &s.history;
    for row in 0..h.years() {
        write_i32_le(w, h.year[row])?;
        let mask = h.recorded[row]
            .iter()
            .enumerate()
            .fold(0u16, |m, (j, &r)| if r { m | (1 << j) } else { m });
        write_u16_le(w, mask)?;
        write_f64_array(w, &h.inflow[row])?;
        write_f64_array(w, &h.demand[row])?;
        write_f64_array(w, &h.level[row])?;
    }

    write_f64_array(w, &s.mean_inflow_month)?;
    write_f64_array(w, &s.mean_demand_month)?;
    write_f64_array(w, &s.mean_level_month)?;
    write_f64_array(w, &s.target_release_month)?;
    write_f64_array(
        w,
        &[
            s.mean_inflow,
            s.mean_demand,
            s.mean_volume,
            s.c,
            s.target_release_year,
            s.k_rls,
        ],
    )?;
    write_u8(w, s.operational_start.index() as u8)
}

// ── Read ────────────────────────────────────────────────────────

fn expect_header(field: &'static str, expected: u64, found: u64) -> Result<(), CheckpointError> {
    if expected == found {
        Ok(())
    } else {
        Err(CheckpointError::HeaderMismatch {
            field,
            expected,
            found,
        })
    }
}

/// Restore `domain` from a checkpoint written for the same cells and
/// reservoir parameters.
///
/// Nothing in `domain` changes unless the whole checkpoint decodes. A
/// queue whose saved length differs from its current transfer function
/// is reset to empty with a warning; every other mismatch is an error.
pub fn read_checkpoint(
    r: &mut dyn Read,
    domain: &mut RoutingDomain,
) -> Result<RestoreReport, CheckpointError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }
    let params = *domain.reservoir_params();
    expect_header("first node", domain.range().start as u64, read_u64_le(r)?)?;
    expect_header("cell count", domain.len() as u64, read_u64_le(r)?)?;
    expect_header(
        "history years",
        params.hist_years as u64,
        u64::from(read_u32_le(r)?),
    )?;
    expect_header(
        "irrigation days",
        params.irrigation_days as u64,
        u64::from(read_u32_le(r)?),
    )?;
    let year = match read_u8(r)? {
        0 => None,
        1 => Some(read_i32_le(r)?),
        flag => {
            return Err(CheckpointError::Malformed {
                detail: format!("year flag {flag}"),
            })
        }
    };

    let first = domain.range().start;
    let mut cells = domain.cells().to_vec();
    let mut report = RestoreReport::default();
    for (i, cell) in cells.iter_mut().enumerate() {
        let node = NodeId::new((first + i) as u32);
        let restored = read_cell(r, cell, node)?;
        if restored.reset {
            report.queue_resets.push(node);
        }
        report.river_discarded += restored.discarded;
    }

    domain.cells_mut().clone_from_slice(&cells);
    domain.set_year(year);
    if !report.queue_resets.is_empty() || report.river_discarded != 0.0 {
        log::warn!(
            "{} delay queues reset on restart, {} l of river water discarded: transfer functions changed",
            report.queue_resets.len(),
            report.river_discarded
        );
    }
    Ok(report)
}

/// Relative difference between saved river storage and restored queue
/// contents still treated as rounding.
const RIVER_TOLERANCE: f64 = 1e-9;

struct CellRestore {
    reset: bool,
    discarded: f64,
}

fn read_cell(
    r: &mut dyn Read,
    cell: &mut CellState,
    node: NodeId,
) -> Result<CellRestore, CheckpointError> {
    let mut v = [0.0; 8];
    read_f64_array(r, &mut v)?;
    [
        cell.river,
        cell.lake,
        cell.lake_max,
        cell.demand,
        cell.neighbour_demand,
        cell.deficit,
        cell.withdrawal,
        cell.outflow_yesterday,
    ] = v;
    cell.month = read_month(r)?;

    let saved = read_f64_seq(r)?;
    let reset = match cell.queue.restore(&saved) {
        QueueRestore::Restored => false,
        QueueRestore::Reset { expected, found } => {
            log::warn!(
                "node {node}: saved queue has {found} slots, reach needs {expected}; \
                 reset, dropping {} l of river water",
                cell.river
            );
            true
        }
    };
    // River storage is exactly the water the queue still owes.
    let queued = cell.queue.in_transit();
    let mut discarded = 0.0;
    let tolerance = RIVER_TOLERANCE * 1.0f64.max(cell.river.abs()).max(queued.abs());
    if reset || (cell.river - queued).abs() > tolerance {
        if !reset {
            log::warn!(
                "node {node}: river storage {} l does not match queued {queued} l; using the queue",
                cell.river
            );
        }
        discarded = cell.river - queued;
        cell.river = queued;
    }

    match (read_u8(r)?, &mut cell.reservoir) {
        (0, None) => {}
        (1, Some(res)) => read_reservoir(r, res.state_mut())?,
        (0 | 1, _) => return Err(CheckpointError::ReservoirMismatch { node }),
        (flag, _) => {
            return Err(CheckpointError::Malformed {
                detail: format!("reservoir flag {flag} at node {node}"),
            })
        }
    }
    Ok(CellRestore { reset, discarded })
}

fn read_month(r: &mut dyn Read) -> Result<MonthAccumulator, CheckpointError> {
    let mut v = [0.0; 7];
    read_f64_array(r, &mut v)?;
    let [inflow, outflow, discharge, storage, local_withdrawal, neighbour_withdrawal, reservoir_supply] =
        v;
    Ok(MonthAccumulator {
        inflow,
        outflow,
        discharge,
        storage,
        local_withdrawal,
        neighbour_withdrawal,
        reservoir_supply,
        days: read_u32_le(r)?,
    })
}

fn read_reservoir(r: &mut dyn Read, s: &mut ReservoirState) -> Result<(), CheckpointError> {
    let mut v = [0.0; 7];
    read_f64_array(r, &mut v)?;
    [
        s.storage,
        s.release_to_river,
        s.release_to_irrigation,
        s.demand_today,
        s.demand_fraction,
        s.month_inflow,
        s.month_demand,
    ] = v;
    s.month_days = read_u32_le(r)?;
    let buffer = read_f64_seq(r)?;
    if buffer.len() != s.buffer.len() {
        return Err(CheckpointError::Malformed {
            detail: format!(
                "irrigation buffer of {} days, expected {}",
                buffer.len(),
                s.buffer.len()
            ),
        });
    }
    s.buffer = buffer;

    let h = &mut s.history;
    for row in 0..h.years() {
        h.year[row] = read_i32_le(r)?;
        let mask = read_u16_le(r)?;
        for (j, recorded) in h.recorded[row].iter_mut().enumerate() {
            *recorded = mask & (1 << j) != 0;
        }
        read_f64_array(r, &mut h.inflow[row])?;
        read_f64_array(r, &mut h.demand[row])?;
        read_f64_array(r, &mut h.level[row])?;
    }

    read_f64_array(r, &mut s.mean_inflow_month)?;
    read_f64_array(r, &mut s.mean_demand_month)?;
    read_f64_array(r, &mut s.mean_level_month)?;
    read_f64_array(r, &mut s.target_release_month)?;
    let mut v = [0.0; 6];
    read_f64_array(r, &mut v)?;
    [
        s.mean_inflow,
        s.mean_demand,
        s.mean_volume,
        s.c,
        s.target_release_year,
        s.k_rls,
    ] = v;
    let month = read_u8(r)?;
    s.operational_start =
        Month::new(usize::from(month)).ok_or_else(|| CheckpointError::Malformed {
            detail: format!("operational month {month} outside 0..{NMONTH}"),
        })?;
    Ok(())
}
