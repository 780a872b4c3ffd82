//! The [`TransferFunction`] type and its contract.

use std::error::Error;
use std::fmt;

use smallvec::SmallVec;

/// Tolerance on `Σ w = 1` accepted by [`TransferFunction::new`].
pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// Errors raised when a weight vector violates the transfer contract.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferError {
    /// No weights were supplied.
    Empty,
    /// A weight is negative, NaN, or infinite.
    InvalidWeight {
        /// Position of the weight.
        index: usize,
        /// The weight.
        value: f64,
    },
    /// The weights do not sum to one.
    NotNormalized {
        /// The actual sum.
        sum: f64,
    },
    /// A reach length was negative, NaN, or infinite.
    InvalidReachLength {
        /// The offending length in metres.
        length: f64,
    },
    /// A strategy was asked for weights with zero sub-steps per day.
    ZeroSubsteps,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "transfer function has no weights"),
            Self::InvalidWeight { index, value } => {
                write!(f, "transfer weight {index} is invalid: {value}")
            }
            Self::NotNormalized { sum } => {
                write!(f, "transfer weights sum to {sum}, expected 1")
            }
            Self::InvalidReachLength { length } => {
                write!(f, "reach length {length} m is not a finite non-negative value")
            }
            Self::ZeroSubsteps => write!(f, "substeps_per_day must be at least 1"),
        }
    }
}

impl Error for TransferError {}

/// Convolution weights of one river reach.
///
/// `weights()[i]` is the fraction of a pulse pushed into the reach that
/// leaves it `i + 1` sub-daily iterations later.
#[derive(Clone, Debug, PartialEq)]
pub struct TransferFunction {
    weights: SmallVec<[f64; 8]>,
}

impl TransferFunction {
    /// Validate and wrap a weight vector.
    pub fn new(weights: impl IntoIterator<Item = f64>) -> Result<Self, TransferError> {
        let weights: SmallVec<[f64; 8]> = weights.into_iter().collect();
        if weights.is_empty() {
            return Err(TransferError::Empty);
        }
        for (index, &value) in weights.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(TransferError::InvalidWeight { index, value });
            }
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > NORMALIZATION_TOLERANCE {
            return Err(TransferError::NotNormalized { sum });
        }
        Ok(Self { weights })
    }

    /// Scale raw non-negative weights so they sum to one.
    ///
    /// Trailing zero weights are dropped so the queue is no longer than
    /// the hydrograph actually needs.
    pub fn normalized(raw: impl IntoIterator<Item = f64>) -> Result<Self, TransferError> {
        let mut weights: SmallVec<[f64; 8]> = raw.into_iter().collect();
        while weights.len() > 1 && weights.last() == Some(&0.0) {
            weights.pop();
        }
        let sum: f64 = weights.iter().sum();
        if !(sum > 0.0) || !sum.is_finite() {
            return match weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
                Some(index) => Err(TransferError::InvalidWeight {
                    index,
                    value: weights[index],
                }),
                None if weights.is_empty() => Err(TransferError::Empty),
                None => Err(TransferError::NotNormalized { sum }),
            };
        }
        Self::new(weights.iter().map(|w| w / sum))
    }

    /// The single-weight function `[1.0]`: everything leaves after one
    /// iteration.
    pub fn unit() -> Self {
        Self {
            weights: smallvec::smallvec![1.0],
        }
    }

    /// Number of coefficients, i.e. the queue length.
    pub fn ncoeff(&self) -> usize {
        self.weights.len()
    }

    /// The weights, earliest release first.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Fraction of a pulse still in the reach after `i` releases.
    pub fn tail(&self, i: usize) -> f64 {
        self.weights.iter().skip(i).sum()
    }
}
