/*!
Replica-exchange moves between adjacent rungs.

A swap proposes to exchange the states of two neighbouring rungs. Writing
β for inverse temperatures and h for the swap weight ([`TemperedDensity::swap_weight`]),
the move is accepted with probability

```text
min(1, exp[(β_a − β_b) · (h(θ_b) − h(θ_a))])
```

which is symmetric in the two rungs: relabelling a and b flips the sign of
both factors and leaves the ratio unchanged. On acceptance only the state
vectors move; temperatures and RNGs stay with their rungs, and both cached
tempered log-densities are recomputed from scratch at the rungs' own
temperatures.
*/

use num_traits::Float;
use rand::prelude::*;

use crate::distributions::{BayesianTarget, TemperedDensity};
use crate::ladder::Rung;

/// Which adjacent pairs receive a swap attempt in a given iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapPolicy {
    /// Sweep over disjoint adjacent pairs, alternating between the
    /// even-indexed pairs (0–1, 2–3, ...) and the odd-indexed pairs
    /// (1–2, 3–4, ...) from one iteration to the next.
    #[default]
    AlternatingSweep,
    /// A single uniformly chosen adjacent pair per iteration.
    RandomPair,
}

/// Attempt/accept tallies for one adjacent pair of rungs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapCounter {
    pub attempts: u64,
    pub accepts: u64,
}

impl SwapCounter {
    /// Folds one swap outcome into the tallies.
    pub fn record(&mut self, accepted: bool) {
        self.attempts += 1;
        self.accepts += accepted as u64;
    }

    /// Observed acceptance rate; 0 before the first attempt.
    pub fn rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.accepts as f64 / self.attempts as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/**
Proposes exchanging the states of two adjacent rungs.

Returns whether the exchange happened. On acceptance the state vectors are
swapped in place and both rungs' cached log-densities are re-evaluated at
their own (unchanged) temperatures; stale values are never carried over or
rescaled. A `NaN` log-ratio, which arises when both swap weights are `-∞`,
is treated as a rejection.

# Arguments

* `a`, `b` - The two rungs; by convention `a` is the colder one, though the
  acceptance ratio is the same either way.
* `density` - The evaluator shared by the whole ladder.
* `rng` - The RNG that drives swap decisions (the orchestrator keeps a
  dedicated one, separate from every rung's RNG).
*/
pub fn attempt_swap<T, M>(
    a: &mut Rung<T>,
    b: &mut Rung<T>,
    density: &TemperedDensity<M>,
    rng: &mut SmallRng,
) -> bool
where
    T: Float,
    M: BayesianTarget<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    let weight_a = density.swap_weight(&a.state);
    let weight_b = density.swap_weight(&b.state);
    let log_accept_ratio = (a.beta() - b.beta()) * (weight_b - weight_a);

    let u: T = rng.gen();
    let accepted = !log_accept_ratio.is_nan() && log_accept_ratio > u.ln();
    if accepted {
        std::mem::swap(&mut a.state, &mut b.state);
        a.log_density = density.evaluate(&a.state, a.beta());
        b.log_density = density.evaluate(&b.state, b.beta());
    }
    accepted
}
