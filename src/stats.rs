//! Running statistics for monitoring tempering runs.

use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::collections::VecDeque;

/// Sliding window over recent accept/reject decisions.
///
/// Keeps the last `capacity` outcomes and reports their acceptance rate;
/// the progress display uses one window for cold-chain steps and one for
/// replica swaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceWindow {
    queue: VecDeque<bool>,
    capacity: usize,
}

impl AcceptanceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one decision, evicting the oldest once the window is full.
    pub fn push(&mut self, accepted: bool) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(accepted);
    }

    /// Acceptance rate over the window; 0 while the window is empty.
    pub fn rate(&self) -> f64 {
        if self.queue.is_empty() {
            return 0.0;
        }
        let accepted = self.queue.iter().filter(|&&a| a).count();
        accepted as f64 / self.queue.len() as f64
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Streaming per-dimension mean and sample variance.
///
/// Accumulates running first and second moments so callers can summarise a
/// chain without keeping a second copy of the history.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningMoments {
    n: u64,
    mean: Array1<f64>,
    mean_sq: Array1<f64>,
}

impl RunningMoments {
    pub fn new(n_params: usize) -> Self {
        Self {
            n: 0,
            mean: Array1::zeros(n_params),
            mean_sq: Array1::zeros(n_params),
        }
    }

    /// Folds one state vector into the running moments.
    pub fn step<T: ToPrimitive>(&mut self, x: &[T]) {
        debug_assert_eq!(x.len(), self.mean.len());
        self.n += 1;
        let n = self.n as f64;
        for (i, value) in x.iter().enumerate() {
            let v = value.to_f64().unwrap();
            self.mean[i] = (self.mean[i] * (n - 1.0) + v) / n;
            self.mean_sq[i] = if self.n == 1 {
                v * v
            } else {
                (self.mean_sq[i] * (n - 1.0) + v * v) / n
            };
        }
    }

    /// Number of states folded in so far.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Running per-dimension mean.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Unbiased per-dimension sample variance. Needs at least two states.
    pub fn sm2(&self) -> Array1<f64> {
        let n = self.n as f64;
        (self.mean_sq.clone() - self.mean.clone() * self.mean.clone()) * n / (n - 1.0)
    }
}
