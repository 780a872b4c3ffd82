//! Storage invariant checks.
//!
//! Every storage pool must stay within `[0, capacity]`. Floating-point
//! rounding legitimately pushes values a hair outside that range; such
//! drift (relative to the volumes involved) is clamped silently. Anything
//! larger is a logic error: it trips a debug assertion, and in release
//! builds is clamped with a warning so a long run is not lost to it.

use std::fmt;

use crate::id::NodeId;

/// The storage pool being checked, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Water in transit in the river channel.
    River,
    /// Lake storage.
    Lake,
    /// Reservoir storage.
    Reservoir,
    /// A day of the reservoir irrigation buffer.
    IrrigationBuffer,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::River => "river",
            Self::Lake => "lake",
            Self::Reservoir => "reservoir",
            Self::IrrigationBuffer => "irrigation buffer",
        })
    }
}

/// Bring `value` back into `[0, capacity]`.
///
/// `reference` is the magnitude of the volumes that produced `value`
/// (e.g. the inflow just added); drift up to `epsilon * max(1, reference,
/// capacity)` counts as rounding. Pass `f64::INFINITY` as `capacity` for
/// unbounded pools.
pub fn settle_storage(
    value: f64,
    capacity: f64,
    reference: f64,
    epsilon: f64,
    kind: StorageKind,
    node: NodeId,
) -> f64 {
    if value >= 0.0 && value <= capacity {
        return value;
    }
    let finite_cap = if capacity.is_finite() { capacity } else { 0.0 };
    let tolerance = epsilon * 1.0f64.max(reference.abs()).max(finite_cap);
    let excess = if value < 0.0 {
        -value
    } else {
        value - capacity
    };
    if excess > tolerance || value.is_nan() {
        debug_assert!(
            false,
            "{kind} storage at node {node} out of range: {value} (capacity {capacity})"
        );
        log::warn!(
            "clamping {kind} storage at node {node}: {value} outside [0, {capacity}]"
        );
    }
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, capacity)
}

/// Check river storage against the volume its delay queue still owes.
///
/// `in_transit` is `DelayQueue::in_transit` of the same reach and is the
/// value kept, so rounding never accumulates in `river`. `reference` is
/// the magnitude of the volumes just routed; a mismatch beyond `epsilon`
/// of it trips a debug assertion, and in release builds is logged.
pub fn settle_river(
    river: f64,
    in_transit: f64,
    reference: f64,
    epsilon: f64,
    node: NodeId,
) -> f64 {
    let tolerance = epsilon
        * 1.0f64
            .max(reference.abs())
            .max(river.abs())
            .max(in_transit.abs());
    if (river - in_transit).abs() > tolerance || river.is_nan() {
        debug_assert!(
            false,
            "river storage at node {node} does not match its queue: {river} vs {in_transit}"
        );
        log::warn!(
            "river storage at node {node} ({river}) differs from queued volume ({in_transit}); using the queue"
        );
    }
    in_transit.max(0.0)
}
