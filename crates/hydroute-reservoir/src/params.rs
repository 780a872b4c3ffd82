//! Operating parameters shared by every reservoir of a run.

use hydroute_core::Month;

use crate::error::ReservoirError;

/// How the start of the operational year is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationalYearStart {
    /// Always the given month.
    Fixed(Month),
    /// The month ending the longest run of wet months, re-detected each
    /// year from the inflow history.
    Auto,
}

/// Reservoir operating rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReservoirParams {
    /// Years of monthly history kept for the release rules.
    pub hist_years: usize,
    /// Days water reserved for irrigation waits before returning to the
    /// river.
    pub irrigation_days: usize,
    /// Fraction of mean monthly inflow always released to the river.
    pub env_flow: f64,
    /// Target storage fraction at the start of the operational year.
    pub alpha: f64,
    /// Start of the operational year.
    pub operational_year: OperationalYearStart,
}

impl Default for ReservoirParams {
    fn default() -> Self {
        Self {
            hist_years: 20,
            irrigation_days: 5,
            env_flow: 0.1,
            alpha: 0.85,
            operational_year: OperationalYearStart::Auto,
        }
    }
}

impl ReservoirParams {
    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ReservoirError> {
        let fail = |reason: String| Err(ReservoirError::InvalidParams { reason });
        if self.hist_years == 0 {
            return fail("hist_years must be at least 1".into());
        }
        if self.irrigation_days == 0 {
            return fail("irrigation_days must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.env_flow) {
            return fail(format!("env_flow must be in [0, 1], got {}", self.env_flow));
        }
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return fail(format!("alpha must be positive, got {}", self.alpha));
        }
        Ok(())
    }
}
