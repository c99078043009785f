/*!
# Per-Rung Random-Walk Kernel

Each rung of the ladder advances with its own transition kernel. This module
defines the kernel interface ([`RungKernel`]) and the default implementation,
a block random-walk Metropolis update with an adaptively tuned proposal scale.

## Overview

- **Proposal**: `θ' = θ + scale·ε` with `ε ~ N(0, I)`, perturbing all
  coordinates at once. The proposal is symmetric, so the q-terms cancel from
  the acceptance ratio.
- **Acceptance**: `log α = log π_β(θ') − log π_β(θ)`; a uniform draw decides.
  Proposals whose tempered log-density comes back `-∞` (out of support, NaN,
  overflow) can never win the comparison and are rejected in the same code
  path as any improbable move.
- **Scale adaptation**: After every step the proposal scale moves toward the
  target acceptance rate through a diminishing stochastic-approximation
  update, `log scale += t^(-κ)·(α − target)`, and is clamped to a positive
  range. With κ in `(0, 1]` the perturbations die off fast enough to keep the
  chain's stationary distribution intact.

## Example Usage

```rust
use tempered_mcmc::distributions::{PriorTempering, SphericalGaussian, TemperedDensity};
use tempered_mcmc::ladder::Rung;
use tempered_mcmc::random_walk::{RandomWalkKernel, RungKernel};

let density = TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);

// A single cold chain driven directly by the kernel.
let mut rung = Rung::new(1.0, &[0.0], density.log_posterior(&[0.0]), 42);
let mut kernel = RandomWalkKernel::new(1.0, 0.234, 0.6);
for _ in 0..100 {
    kernel.step(&mut rung, &density);
}
assert!(RungKernel::<f64, SphericalGaussian<f64>>::acceptance_rate(&kernel) > 0.0);
```
*/

use num_traits::Float;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use crate::distributions::{BayesianTarget, TemperedDensity};
use crate::ladder::Rung;

/// Smallest proposal scale the adapter may reach.
const MIN_SCALE: f64 = 1e-8;
/// Largest proposal scale the adapter may reach.
const MAX_SCALE: f64 = 1e8;

/// The propose-then-accept contract a per-rung transition kernel fulfils.
///
/// The orchestrator holds one kernel per rung and calls `step` once per
/// iteration during the sampling phase. A kernel only ever touches the rung
/// it is handed, which is what makes the sampling phase data-parallel.
/// Implementing this trait is the hook for plugging in other kernel kinds
/// (slice sampling, coordinate-wise updates) without changing the engine.
pub trait RungKernel<T: Float, M: BayesianTarget<T>> {
    /// Advances the rung by one transition, updating its state and cached
    /// log-density in place. Returns whether the proposal was accepted.
    fn step(&mut self, rung: &mut Rung<T>, density: &TemperedDensity<M>) -> bool;

    /// Fraction of accepted steps since the kernel was created.
    fn acceptance_rate(&self) -> f64;
}

/**
Block random-walk Metropolis kernel with diminishing scale adaptation.

One instance serves exactly one rung; the orchestrator constructs a kernel
per rung so that each temperature tunes its own proposal scale. Hot rungs
settle on large scales, the cold rung on small ones.

# Examples

```rust
use tempered_mcmc::random_walk::RandomWalkKernel;

let kernel = RandomWalkKernel::new(0.5, 0.234, 0.6);
assert_eq!(kernel.scale, 0.5);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalkKernel<T> {
    /// Current proposal standard deviation.
    pub scale: T,
    target_rate: T,
    kappa: T,
    steps: u64,
    accepts: u64,
}

impl<T: Float> RandomWalkKernel<T> {
    /// Creates a kernel with the given initial proposal scale, target
    /// acceptance rate and adaptation decay exponent κ ∈ (0, 1].
    pub fn new(scale: T, target_rate: T, kappa: T) -> Self {
        Self {
            scale,
            target_rate,
            kappa,
            steps: 0,
            accepts: 0,
        }
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Robbins–Monro update of the proposal scale, clamped so the scale
    /// stays strictly positive and finite.
    fn adapt_scale(&mut self, log_accept_ratio: T) {
        let alpha = if log_accept_ratio.is_nan() {
            T::zero()
        } else if log_accept_ratio >= T::zero() {
            T::one()
        } else {
            log_accept_ratio.exp()
        };
        let gamma = T::from(self.steps).unwrap().powf(-self.kappa);
        self.scale = self.scale * (gamma * (alpha - self.target_rate)).exp();
        self.scale = self
            .scale
            .max(T::from(MIN_SCALE).unwrap())
            .min(T::from(MAX_SCALE).unwrap());
    }
}

impl<T, M> RungKernel<T, M> for RandomWalkKernel<T>
where
    T: Float,
    M: BayesianTarget<T>,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    fn step(&mut self, rung: &mut Rung<T>, density: &TemperedDensity<M>) -> bool {
        let normal =
            Normal::new(T::zero(), self.scale).expect("proposal scale is positive and finite");
        let proposed: Vec<T> = rung
            .state
            .iter()
            .map(|&x| x + normal.sample(&mut rung.rng))
            .collect();
        let proposed_lp = density.evaluate(&proposed, rung.beta());

        // Symmetric proposal: the q-terms cancel. A NaN ratio only occurs
        // when both densities are -inf; treat it as a rejection.
        let log_accept_ratio = proposed_lp - rung.log_density;
        let u: T = rung.rng.gen();
        let accepted = !log_accept_ratio.is_nan() && log_accept_ratio > u.ln();
        if accepted {
            rung.state = proposed;
            rung.log_density = proposed_lp;
        }

        self.steps += 1;
        self.accepts += accepted as u64;
        self.adapt_scale(log_accept_ratio);
        accepted
    }

    fn acceptance_rate(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.accepts as f64 / self.steps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{
        FnTarget, PriorTempering, SphericalGaussian, TruncatedGaussian,
    };

    fn cold_rung<M: BayesianTarget<f64>>(
        density: &TemperedDensity<M>,
        state: &[f64],
        seed: u64,
    ) -> Rung<f64> {
        Rung::new(1.0, state, density.log_posterior(state), seed)
    }

    #[test]
    fn test_flat_target_accepts_almost_everything() {
        type FlatTarget = FnTarget<fn(&[f64]) -> f64, fn(&[f64]) -> f64>;
        let density: TemperedDensity<FlatTarget> = TemperedDensity::new(
            FnTarget::new(|_: &[f64]| 0.0, |_: &[f64]| 0.0),
            PriorTempering::Fixed,
        );
        let mut rung = cold_rung(&density, &[0.0], 7);
        let mut kernel = RandomWalkKernel::new(1.0, 0.234, 0.6);
        for _ in 0..1_000 {
            kernel.step(&mut rung, &density);
        }
        assert!(RungKernel::<f64, FlatTarget>::acceptance_rate(&kernel) > 0.99);
    }

    #[test]
    fn test_chain_never_leaves_support() {
        let density = TemperedDensity::new(
            TruncatedGaussian {
                std: 1.0,
                lower: -1.0,
                upper: 1.0,
            },
            PriorTempering::Fixed,
        );
        let mut rung = cold_rung(&density, &[0.0, 0.0], 11);
        let mut kernel = RandomWalkKernel::new(2.0, 0.234, 0.6);
        for _ in 0..500 {
            kernel.step(&mut rung, &density);
            assert!(rung.state.iter().all(|&x| (-1.0..=1.0).contains(&x)));
            assert!(rung.log_density.is_finite());
        }
    }

    #[test]
    fn test_rejected_step_keeps_state_and_density() {
        // Support so tight that a scale-5 proposal practically never lands
        // inside; the chain must stay exactly where it started.
        let density = TemperedDensity::new(
            TruncatedGaussian {
                std: 1.0,
                lower: -1e-6,
                upper: 1e-6,
            },
            PriorTempering::Fixed,
        );
        let mut rung = cold_rung(&density, &[0.0], 13);
        let before_lp = rung.log_density;
        let mut kernel = RandomWalkKernel::new(5.0, 0.234, 0.6);
        for _ in 0..100 {
            kernel.step(&mut rung, &density);
        }
        assert_eq!(rung.state, vec![0.0]);
        assert_eq!(rung.log_density, before_lp);
        assert_eq!(
            RungKernel::<f64, TruncatedGaussian<f64>>::acceptance_rate(&kernel),
            0.0
        );
    }

    #[test]
    fn test_oversized_scale_shrinks() {
        let density =
            TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);
        let mut rung = cold_rung(&density, &[0.0], 17);
        let mut kernel = RandomWalkKernel::new(50.0, 0.234, 0.6);
        for _ in 0..3_000 {
            kernel.step(&mut rung, &density);
        }
        assert!(kernel.scale < 10.0);
    }

    #[test]
    fn test_undersized_scale_grows() {
        let density =
            TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);
        let mut rung = cold_rung(&density, &[0.0], 19);
        let mut kernel = RandomWalkKernel::new(1e-4, 0.234, 0.6);
        for _ in 0..3_000 {
            kernel.step(&mut rung, &density);
        }
        assert!(kernel.scale > 1e-3);
    }

    #[test]
    fn test_scale_never_collapses_to_zero() {
        // Every proposal rejected: alpha stays 0 and the update pushes the
        // scale down each step, but the clamp has to hold it up.
        let density = TemperedDensity::new(
            FnTarget::new(|_: &[f64]| f64::NEG_INFINITY, |_: &[f64]| 0.0),
            PriorTempering::Fixed,
        );
        let mut rung = Rung::new(1.0, &[0.0], f64::NEG_INFINITY, 23);
        let mut kernel = RandomWalkKernel::new(1e-7, 0.234, 0.6);
        for _ in 0..2_000 {
            kernel.step(&mut rung, &density);
        }
        assert!(kernel.scale >= MIN_SCALE);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let density =
            TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);
        let mut a = cold_rung(&density, &[0.5], 29);
        let mut b = cold_rung(&density, &[0.5], 29);
        let mut ka = RandomWalkKernel::new(1.0, 0.234, 0.6);
        let mut kb = RandomWalkKernel::new(1.0, 0.234, 0.6);
        for _ in 0..200 {
            ka.step(&mut a, &density);
            kb.step(&mut b, &density);
        }
        assert_eq!(a.state, b.state);
        assert_eq!(ka.scale, kb.scale);
    }
}
