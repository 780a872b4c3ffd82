//! Fixed-length ring buffer of past reach inflows.

use smallvec::SmallVec;

use crate::transfer::TransferFunction;

/// Outcome of [`DelayQueue::restore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueRestore {
    /// Saved values matched the queue length and were loaded.
    Restored,
    /// Saved values had the wrong length; the queue was zeroed.
    Reset {
        /// Current queue length.
        expected: usize,
        /// Number of saved values.
        found: usize,
    },
}

/// Delay queue of one river reach.
///
/// Slot `0` always holds the most recent push. The backing buffer rotates
/// its head instead of shifting values, so `push` is O(1).
#[derive(Clone, Debug, PartialEq)]
pub struct DelayQueue {
    transfer: TransferFunction,
    slots: SmallVec<[f64; 8]>,
    head: usize,
}

impl DelayQueue {
    /// An empty queue shaped by `transfer`.
    pub fn new(transfer: TransferFunction) -> Self {
        let len = transfer.ncoeff();
        Self {
            transfer,
            slots: smallvec::smallvec![0.0; len],
            head: 0,
        }
    }

    /// Number of slots (`ncoeff`).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`: a queue has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The transfer function this queue convolves with.
    pub fn transfer(&self) -> &TransferFunction {
        &self.transfer
    }

    #[inline]
    fn slot(&self, i: usize) -> f64 {
        self.slots[(self.head + i) % self.slots.len()]
    }

    /// Push a new inflow contribution, discarding the oldest slot.
    pub fn push(&mut self, value: f64) {
        let len = self.slots.len();
        self.head = (self.head + len - 1) % len;
        self.slots[self.head] = value;
    }

    /// Outflow for this iteration: `Σ w[i] · slot[i]`.
    pub fn weighted_sum(&self) -> f64 {
        self.transfer
            .weights()
            .iter()
            .enumerate()
            .map(|(i, w)| w * self.slot(i))
            .sum()
    }

    /// Sum of raw slot values.
    pub fn sum(&self) -> f64 {
        self.slots.iter().sum()
    }

    /// Volume still due to leave the reach.
    ///
    /// A value pushed `i` iterations ago has already released the first
    /// `i` weights, so `tail(i)` of it remains.
    pub fn in_transit(&self) -> f64 {
        let weights = self.transfer.weights();
        let mut tail = 0.0;
        let mut total = 0.0;
        for i in (0..weights.len()).rev() {
            tail += weights[i];
            total += self.slot(i) * tail;
        }
        total
    }

    /// Slot values, newest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.slots.len()).map(move |i| self.slot(i))
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|v| *v = 0.0);
        self.head = 0;
    }

    /// Load saved slot values (newest first).
    ///
    /// A length mismatch zeroes the queue instead of failing; the caller
    /// decides how loudly to report it.
    pub fn restore(&mut self, values: &[f64]) -> QueueRestore {
        if values.len() != self.slots.len() {
            self.clear();
            return QueueRestore::Reset {
                expected: self.slots.len(),
                found: values.len(),
            };
        }
        self.slots.copy_from_slice(values);
        self.head = 0;
        QueueRestore::Restored
    }
}
