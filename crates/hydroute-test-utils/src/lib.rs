//! Test utilities for hydroute development.
//!
//! Deterministic network and forcing generators ([`fixtures`]) and an
//! exchange transport that fails on demand ([`FailingExchange`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use hydroute_core::{ExchangeError, WorkerRank};
use hydroute_exchange::{Exchange, ExchangePlan, LocalExchange};

/// Single-worker exchange that works for `rounds` rounds, then reports
/// a disconnected peer forever after.
#[derive(Debug)]
pub struct FailingExchange {
    inner: LocalExchange,
    remaining: usize,
}

impl FailingExchange {
    pub fn new(plan: ExchangePlan, rounds: usize) -> Result<Self, ExchangeError> {
        Ok(Self {
            inner: LocalExchange::new(plan)?,
            remaining: rounds,
        })
    }

    /// Rounds left before failing.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Exchange for FailingExchange {
    fn exchange(&mut self, outflow: &[f64], inflow: &mut [f64]) -> Result<(), ExchangeError> {
        if self.remaining == 0 {
            return Err(ExchangeError::Disconnected {
                peer: WorkerRank(1),
            });
        }
        self.remaining -= 1;
        self.inner.exchange(outflow, inflow)
    }

    fn plan(&self) -> &ExchangePlan {
        self.inner.plan()
    }
}
