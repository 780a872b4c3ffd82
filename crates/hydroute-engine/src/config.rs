//! Routing configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use hydroute_core::{ExchangeError, NodeId};
use hydroute_queue::{LinearSplit, TransferStrategy};
use hydroute_reservoir::{OperationalYearStart, ReservoirError, ReservoirParams};
use hydroute_topology::TopologyError;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while setting up a routing run.
///
/// All of these are fatal: the run cannot start.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `substeps_per_day` is zero.
    ZeroSubsteps,
    /// A numeric parameter is outside its valid range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A per-cell input has the wrong number of entries.
    CellCount {
        /// Which input.
        what: &'static str,
        /// Number of cells in the network.
        expected: usize,
        /// Number of entries supplied.
        found: usize,
    },
    /// A cell's static parameters are unusable.
    InvalidCell {
        /// The offending cell.
        cell: NodeId,
        /// What is wrong with it.
        reason: String,
    },
    /// Network construction failed.
    Topology(TopologyError),
    /// A reservoir record or the reservoir parameters were rejected.
    Reservoir(ReservoirError),
    /// The exchange fabric could not be set up.
    Exchange(ExchangeError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSubsteps => write!(f, "substeps_per_day must be at least 1"),
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value for {name}: {value}")
            }
            Self::CellCount {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected} cells, got {found}"),
            Self::InvalidCell { cell, reason } => write!(f, "cell {cell}: {reason}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::Reservoir(e) => write!(f, "reservoir: {e}"),
            Self::Exchange(e) => write!(f, "exchange setup: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Topology(e) => Some(e),
            Self::Reservoir(e) => Some(e),
            Self::Exchange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TopologyError> for ConfigError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<ReservoirError> for ConfigError {
    fn from(e: ReservoirError) -> Self {
        Self::Reservoir(e)
    }
}

impl From<ExchangeError> for ConfigError {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}

// ── RoutingConfig ──────────────────────────────────────────────────

/// Parameters of a routing run.
///
/// Shared by every worker; each worker builds its
/// [`RoutingDomain`](crate::RoutingDomain) from the same value.
#[derive(Clone, Debug)]
pub struct RoutingConfig {
    /// Sub-daily routing iterations. Default: 8.
    pub substeps_per_day: u32,
    /// Fraction of mean inflow irrigation reservoirs always release to the
    /// river. Default: 0.1.
    pub env_flow: f64,
    /// Years of reservoir history kept. Default: 20.
    pub hist_years: usize,
    /// Days irrigation water is held before returning to the river.
    /// Default: 5.
    pub irrigation_days: usize,
    /// Start of the reservoir operational year. Default: detected from
    /// inflow history.
    pub operational_year: OperationalYearStart,
    /// Lake outflow coefficient in 1/day. Default: 0.001.
    pub lake_outflow_coefficient: f64,
    /// Shape of the per-reach travel-time distribution. Default:
    /// [`LinearSplit`] at 1 m/s.
    ///
    /// Coefficients are derived at `substeps_per_day`.
    pub transfer: Arc<dyn TransferStrategy>,
    /// Relative tolerance for storage rounding. Default: 1e-6.
    pub epsilon: f64,
    /// Target storage fraction at the start of the operational year.
    /// Default: 0.85.
    pub release_alpha: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            substeps_per_day: 8,
            env_flow: 0.1,
            hist_years: 20,
            irrigation_days: 5,
            operational_year: OperationalYearStart::Auto,
            lake_outflow_coefficient: 0.001,
            transfer: Arc::new(LinearSplit::default()),
            epsilon: 1e-6,
            release_alpha: 0.85,
        }
    }
}

impl RoutingConfig {
    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.substeps_per_day == 0 {
            return Err(ConfigError::ZeroSubsteps);
        }
        let kr = self.lake_outflow_coefficient;
        if !kr.is_finite() || kr < 0.0 || kr > f64::from(self.substeps_per_day) {
            return Err(ConfigError::InvalidParameter {
                name: "lake_outflow_coefficient",
                value: kr,
            });
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 || self.epsilon >= 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "epsilon",
                value: self.epsilon,
            });
        }
        self.reservoir_params().validate()?;
        Ok(())
    }

    /// Reservoir operating rules implied by this configuration.
    pub fn reservoir_params(&self) -> ReservoirParams {
        ReservoirParams {
            hist_years: self.hist_years,
            irrigation_days: self.irrigation_days,
            env_flow: self.env_flow,
            alpha: self.release_alpha,
            operational_year: self.operational_year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RoutingConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_substeps_rejected() {
        let cfg = RoutingConfig {
            substeps_per_day: 0,
            ..RoutingConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSubsteps));
    }

    #[test]
    fn negative_lake_coefficient_rejected() {
        let cfg = RoutingConfig {
            lake_outflow_coefficient: -0.1,
            ..RoutingConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidParameter {
                name: "lake_outflow_coefficient",
                ..
            })
        ));
    }

    #[test]
    fn travel_time_follows_configured_substeps() {
        // 43.2 km at 1 m/s is half a day: 4 sub-steps at 8 per day, 2 at 4.
        for (substeps, ncoeff) in [(8, 5), (4, 3)] {
            let cfg = RoutingConfig {
                substeps_per_day: substeps,
                ..RoutingConfig::default()
            };
            assert!(cfg.validate().is_ok());
            let tf = cfg.transfer.coefficients(43_200.0, cfg.substeps_per_day).unwrap();
            assert_eq!(tf.ncoeff(), ncoeff);
            assert_eq!(tf.weights()[ncoeff - 1], 1.0);
        }
    }

    #[test]
    fn reservoir_params_are_checked() {
        let cfg = RoutingConfig {
            hist_years: 0,
            ..RoutingConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Reservoir(_)));
        assert!(err.source().is_some());
    }
}
