//! Pluggable transfer-function shapes.
//!
//! A [`TransferStrategy`] maps the length of a river reach to the
//! convolution weights of its delay queue. Strategies are stateless and
//! shared between workers, hence the `Send + Sync` bound.

use std::fmt;

use crate::transfer::{TransferError, TransferFunction};

/// Upper bound on queue length when a strategy does not set its own.
pub const DEFAULT_MAX_COEFF: usize = 256;

/// Derives the transfer function of a reach from its length.
pub trait TransferStrategy: fmt::Debug + Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Weights for a reach of `reach_length` metres, one per routing
    /// sub-step of a day split into `substeps_per_day` iterations.
    ///
    /// Longer reaches must never produce fewer coefficients than
    /// shorter ones.
    fn coefficients(
        &self,
        reach_length: f64,
        substeps_per_day: u32,
    ) -> Result<TransferFunction, TransferError>;
}

fn check_inputs(reach_length: f64, substeps_per_day: u32) -> Result<(), TransferError> {
    if !(reach_length.is_finite() && reach_length >= 0.0) {
        return Err(TransferError::InvalidReachLength {
            length: reach_length,
        });
    }
    if substeps_per_day == 0 {
        return Err(TransferError::ZeroSubsteps);
    }
    Ok(())
}

// ── Instantaneous ───────────────────────────────────────────────

/// Every pulse leaves the reach at the next iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Instantaneous;

impl TransferStrategy for Instantaneous {
    fn name(&self) -> &str {
        "instantaneous"
    }

    fn coefficients(
        &self,
        reach_length: f64,
        substeps_per_day: u32,
    ) -> Result<TransferFunction, TransferError> {
        check_inputs(reach_length, substeps_per_day)?;
        Ok(TransferFunction::unit())
    }
}

// ── LinearSplit ─────────────────────────────────────────────────

/// Pure translation at constant velocity.
///
/// Travel time in sub-steps is `τ = len / (velocity / substeps_per_day)`,
/// with the sub-step count supplied by the routing configuration.
/// The pulse is split linearly between slots `⌊τ⌋` and `⌊τ⌋ + 1`, so the
/// mean delay varies continuously with reach length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearSplit {
    /// Flow velocity in m/day.
    pub velocity: f64,
    /// Longest queue this strategy will produce.
    pub max_coeff: usize,
}

impl Default for LinearSplit {
    fn default() -> Self {
        Self {
            velocity: 86_400.0,
            max_coeff: DEFAULT_MAX_COEFF,
        }
    }
}

impl TransferStrategy for LinearSplit {
    fn name(&self) -> &str {
        "linear-split"
    }

    fn coefficients(
        &self,
        reach_length: f64,
        substeps_per_day: u32,
    ) -> Result<TransferFunction, TransferError> {
        check_inputs(reach_length, substeps_per_day)?;
        let step_length = self.velocity / f64::from(substeps_per_day);
        let tau = reach_length / step_length;
        let max_coeff = self.max_coeff.max(1);
        if !tau.is_finite() || tau >= (max_coeff - 1) as f64 {
            let mut weights = vec![0.0; max_coeff];
            weights[max_coeff - 1] = 1.0;
            return TransferFunction::normalized(weights);
        }
        let slot = tau.floor() as usize;
        let frac = tau - tau.floor();
        let mut weights = vec![0.0; slot + 2];
        weights[slot] = 1.0 - frac;
        weights[slot + 1] = frac;
        TransferFunction::normalized(weights)
    }
}

// ── StorageCascade ──────────────────────────────────────────────

/// A Nash cascade of identical linear storages.
///
/// The reach is cut into `len / segment_length` segments (at least one),
/// each a linear reservoir with time constant `segment_length / velocity`.
/// The impulse response is an Erlang density, integrated over each
/// sub-step, truncated once the remaining mass drops below `1e-6` or at
/// `max_coeff`, then renormalised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StorageCascade {
    /// Length of river treated as a single storage, in metres.
    pub segment_length: f64,
    /// Flow velocity in m/day.
    pub velocity: f64,
    /// Longest queue this strategy will produce.
    pub max_coeff: usize,
}

impl Default for StorageCascade {
    fn default() -> Self {
        Self {
            segment_length: 10_000.0,
            velocity: 86_400.0,
            max_coeff: DEFAULT_MAX_COEFF,
        }
    }
}

/// Erlang(n, 1) cumulative distribution at `x`.
fn erlang_cdf(n: u32, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let mut term = 1.0;
    let mut sum = 1.0;
    for j in 1..n {
        term *= x / f64::from(j);
        sum += term;
    }
    (1.0 - (-x).exp() * sum).clamp(0.0, 1.0)
}

impl TransferStrategy for StorageCascade {
    fn name(&self) -> &str {
        "storage-cascade"
    }

    fn coefficients(
        &self,
        reach_length: f64,
        substeps_per_day: u32,
    ) -> Result<TransferFunction, TransferError> {
        check_inputs(reach_length, substeps_per_day)?;
        let storages = (reach_length / self.segment_length).round().max(1.0) as u32;
        // Time constant of one storage, in sub-steps.
        let k = self.segment_length / self.velocity * f64::from(substeps_per_day);
        let max_coeff = self.max_coeff.max(1);
        let mut weights = Vec::with_capacity(max_coeff.min(64));
        let mut previous = 0.0;
        for i in 0..max_coeff {
            let cdf = erlang_cdf(storages, (i + 1) as f64 / k).max(previous);
            weights.push(cdf - previous);
            previous = cdf;
            if 1.0 - cdf < 1e-6 {
                break;
            }
        }
        TransferFunction::normalized(weights)
    }
}
