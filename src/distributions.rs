/*!
# Targets and Tempered Densities

This module defines the model interface for the tempering engine and the
evaluator that turns a model into the tempered log-densities the rungs sample
from. A model is anything that can report a log-likelihood and a log-prior for
a parameter vector via the [`BayesianTarget`] trait; the [`TemperedDensity`]
evaluator combines the two at a given inverse temperature.

## Overview

- **Model (`BayesianTarget`)**: Provides `log_likelihood`, `log_prior` and an
  optional support predicate. Everything is unnormalized log-space.
- **Tempering mode ([`PriorTempering`])**: With `Fixed` priors only the
  likelihood is raised to the power β, so hot rungs relax toward the prior.
  With `Tempered` priors the whole posterior is flattened.
- **Evaluator ([`TemperedDensity`])**: A pure function of `(θ, β)`. Parameter
  vectors outside the model's support, as well as `NaN` or `+∞` results,
  evaluate to `-∞` so that the Metropolis rule rejects them automatically.

## Example Usage

```rust
use tempered_mcmc::distributions::{PriorTempering, SphericalGaussian, TemperedDensity};

let density = TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);

// Heating flattens the density: the same point looks more probable at β = 1/4.
let cold = density.evaluate(&[1.0, 1.0], 1.0);
let hot = density.evaluate(&[1.0, 1.0], 0.25);
assert!(hot > cold);
```
*/

use num_traits::Float;

/// How the prior enters the tempered density.
///
/// With `Fixed` priors the rung at inverse temperature β samples from
/// `β·logL(θ) + logPrior(θ)`; the prior keeps its full strength on every
/// rung and cancels out of the swap ratio. With `Tempered` priors the rung
/// samples from `β·(logL(θ) + logPrior(θ))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorTempering {
    #[default]
    Fixed,
    Tempered,
}

/// A Bayesian model the engine can sample from.
///
/// All quantities are unnormalized log-densities; additive constants are
/// irrelevant to Metropolis acceptance and may be dropped. Implementations
/// must be pure: the same `theta` always yields the same value, with no
/// interior mutability, so that evaluations may run concurrently for
/// independent rungs.
pub trait BayesianTarget<T: Float> {
    /// Unnormalized log-likelihood at `theta`.
    fn log_likelihood(&self, theta: &[T]) -> T;

    /// Unnormalized log-prior at `theta`.
    fn log_prior(&self, theta: &[T]) -> T;

    /// Whether `theta` lies inside the model's support. Points outside are
    /// auto-rejected without calling the density functions.
    fn in_support(&self, _theta: &[T]) -> bool {
        true
    }
}

/**
Evaluator producing tempered log-densities from a model.

Wraps a [`BayesianTarget`] together with a [`PriorTempering`] mode. The three
evaluation methods are pure functions of their arguments; paired with the
support predicate they absorb every pathological model output (`NaN`, `+∞`,
out-of-support points) into `-∞`, which a Metropolis step can never accept.

# Examples

```rust
use tempered_mcmc::distributions::{FnTarget, PriorTempering, TemperedDensity};

// Likelihood only; flat prior.
let model = FnTarget::new(|t: &[f64]| -t[0] * t[0], |_: &[f64]| 0.0);
let density = TemperedDensity::new(model, PriorTempering::Fixed);

assert_eq!(density.evaluate(&[2.0], 1.0), -4.0);
assert_eq!(density.evaluate(&[2.0], 0.5), -2.0);
```
*/
#[derive(Debug, Clone)]
pub struct TemperedDensity<M> {
    model: M,
    priors: PriorTempering,
}

impl<M> TemperedDensity<M> {
    /// Wraps `model` with the given prior-tempering mode.
    pub fn new(model: M, priors: PriorTempering) -> Self {
        Self { model, priors }
    }

    /// Returns a reference to the wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the prior-tempering mode.
    pub fn prior_tempering(&self) -> PriorTempering {
        self.priors
    }

    /**
    Evaluates the tempered log-density of `theta` at inverse temperature
    `inv_temp`.

    Returns `β·logL + logPrior` for fixed priors and `β·(logL + logPrior)`
    for tempered priors. Out-of-support points and `NaN`/`+∞` results map to
    `-∞` so the caller can feed the value straight into an accept test.

    # Arguments

    * `theta` - The parameter vector to evaluate.
    * `inv_temp` - The inverse temperature β of the rung, `1/T`.
    */
    pub fn evaluate<T>(&self, theta: &[T], inv_temp: T) -> T
    where
        T: Float,
        M: BayesianTarget<T>,
    {
        if !self.model.in_support(theta) {
            return T::neg_infinity();
        }
        let log_lik = self.model.log_likelihood(theta);
        let log_prior = self.model.log_prior(theta);
        let value = match self.priors {
            PriorTempering::Fixed => inv_temp * log_lik + log_prior,
            PriorTempering::Tempered => inv_temp * (log_lik + log_prior),
        };
        reject_non_finite(value)
    }

    /// The part of the log-density that enters the replica-swap ratio.
    ///
    /// With fixed priors the prior terms cancel between the two rungs, so
    /// this is `logL(θ)`; with tempered priors it is `logL(θ) + logPrior(θ)`.
    pub fn swap_weight<T>(&self, theta: &[T]) -> T
    where
        T: Float,
        M: BayesianTarget<T>,
    {
        if !self.model.in_support(theta) {
            return T::neg_infinity();
        }
        let value = match self.priors {
            PriorTempering::Fixed => self.model.log_likelihood(theta),
            PriorTempering::Tempered => {
                self.model.log_likelihood(theta) + self.model.log_prior(theta)
            }
        };
        reject_non_finite(value)
    }

    /// The untempered (β = 1) log-posterior, as recorded alongside every
    /// cold-chain sample.
    pub fn log_posterior<T>(&self, theta: &[T]) -> T
    where
        T: Float,
        M: BayesianTarget<T>,
    {
        self.evaluate(theta, T::one())
    }
}

/// Maps `NaN` and `+∞` to `-∞`. A log-density of `-∞` is legitimate (zero
/// probability) and passes through unchanged.
fn reject_non_finite<T: Float>(value: T) -> T {
    if value.is_nan() || value == T::infinity() {
        T::neg_infinity()
    } else {
        value
    }
}

/// Isotropic Gaussian log-likelihood centered at the origin, flat prior.
///
/// Mostly useful for tests and examples where the stationary distribution
/// must be known exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalGaussian<T> {
    /// Standard deviation shared by all coordinates.
    pub std: T,
}

impl<T: Float> BayesianTarget<T> for SphericalGaussian<T> {
    fn log_likelihood(&self, theta: &[T]) -> T {
        let half = T::from(0.5).unwrap();
        let mut sum_sq = T::zero();
        for &x in theta {
            let z = x / self.std;
            sum_sq = sum_sq + z * z;
        }
        -half * sum_sq
    }

    fn log_prior(&self, _theta: &[T]) -> T {
        T::zero()
    }
}

/**
Equal-weight mixture of two 1-D Gaussians, flat prior.

With well-separated modes (say `mode_a = -3`, `mode_b = 3`, `std = 0.5`) a
single cold random-walk chain gets stuck in whichever mode it starts in,
which makes this the canonical target for demonstrating that tempering ferries
states across the probability barrier.

# Examples

```rust
use tempered_mcmc::distributions::{BayesianTarget, BimodalGaussian};

let target = BimodalGaussian { mode_a: -3.0, mode_b: 3.0, std: 0.5 };
let at_mode = target.log_likelihood(&[3.0]);
let between = target.log_likelihood(&[0.0]);
assert!(at_mode > between);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BimodalGaussian<T> {
    /// Center of the first mode.
    pub mode_a: T,
    /// Center of the second mode.
    pub mode_b: T,
    /// Standard deviation of both components.
    pub std: T,
}

impl<T: Float> BayesianTarget<T> for BimodalGaussian<T> {
    fn log_likelihood(&self, theta: &[T]) -> T {
        let half = T::from(0.5).unwrap();
        let z_a = (theta[0] - self.mode_a) / self.std;
        let z_b = (theta[0] - self.mode_b) / self.std;
        let log_a = -half * z_a * z_a;
        let log_b = -half * z_b * z_b;
        // log-sum-exp with the max factored out for stability
        let max = log_a.max(log_b);
        max + ((log_a - max).exp() + (log_b - max).exp()).ln()
    }

    fn log_prior(&self, _theta: &[T]) -> T {
        T::zero()
    }
}

/// Gaussian log-likelihood restricted to a box: every coordinate must lie in
/// `[lower, upper]`. Exercises the support predicate; proposals leaving the
/// box evaluate to `-∞` and are rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedGaussian<T> {
    /// Standard deviation shared by all coordinates.
    pub std: T,
    /// Inclusive lower bound for every coordinate.
    pub lower: T,
    /// Inclusive upper bound for every coordinate.
    pub upper: T,
}

impl<T: Float> BayesianTarget<T> for TruncatedGaussian<T> {
    fn log_likelihood(&self, theta: &[T]) -> T {
        SphericalGaussian { std: self.std }.log_likelihood(theta)
    }

    fn log_prior(&self, _theta: &[T]) -> T {
        T::zero()
    }

    fn in_support(&self, theta: &[T]) -> bool {
        theta.iter().all(|&x| x >= self.lower && x <= self.upper)
    }
}

/**
Adapter turning a pair of closures into a [`BayesianTarget`].

Lets callers sample an arbitrary model without defining a type:

```rust
use tempered_mcmc::distributions::{BayesianTarget, FnTarget};

// Rosenbrock-shaped log-likelihood with a flat prior.
let target = FnTarget::new(
    |t: &[f64]| {
        let (a, b) = (t[0], t[1]);
        -((1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2))
    },
    |_: &[f64]| 0.0,
);
assert_eq!(target.log_likelihood(&[1.0, 1.0]), 0.0);
```

Returning `NaN` or `±∞` from either closure is safe; the evaluator treats
such points as having zero probability.
*/
#[derive(Debug, Clone)]
pub struct FnTarget<F, G> {
    log_likelihood: F,
    log_prior: G,
}

impl<F, G> FnTarget<F, G> {
    /// Builds a target from a log-likelihood and a log-prior closure.
    pub fn new(log_likelihood: F, log_prior: G) -> Self {
        Self {
            log_likelihood,
            log_prior,
        }
    }
}

impl<T, F, G> BayesianTarget<T> for FnTarget<F, G>
where
    T: Float,
    F: Fn(&[T]) -> T,
    G: Fn(&[T]) -> T,
{
    fn log_likelihood(&self, theta: &[T]) -> T {
        (self.log_likelihood)(theta)
    }

    fn log_prior(&self, theta: &[T]) -> T {
        (self.log_prior)(theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spherical_gaussian_log_likelihood() {
        let target = SphericalGaussian { std: 2.0 };
        // -0.5 * ((2/2)^2 + (4/2)^2) = -0.5 * 5 = -2.5
        assert_abs_diff_eq!(target.log_likelihood(&[2.0, 4.0]), -2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_priors_leave_prior_untempered() {
        let model = FnTarget::new(|t: &[f64]| t[0], |_: &[f64]| 7.0);
        let density = TemperedDensity::new(model, PriorTempering::Fixed);
        // beta * logL + logPrior = 0.25 * 3 + 7
        assert_abs_diff_eq!(density.evaluate(&[3.0], 0.25), 7.75, epsilon = 1e-12);
    }

    #[test]
    fn test_tempered_priors_scale_whole_posterior() {
        let model = FnTarget::new(|t: &[f64]| t[0], |_: &[f64]| 7.0);
        let density = TemperedDensity::new(model, PriorTempering::Tempered);
        // beta * (logL + logPrior) = 0.25 * 10
        assert_abs_diff_eq!(density.evaluate(&[3.0], 0.25), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_swap_weight_drops_prior_only_when_fixed() {
        let model = FnTarget::new(|t: &[f64]| t[0], |_: &[f64]| 7.0);
        let fixed = TemperedDensity::new(model.clone(), PriorTempering::Fixed);
        let tempered = TemperedDensity::new(model, PriorTempering::Tempered);
        assert_abs_diff_eq!(fixed.swap_weight(&[3.0]), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tempered.swap_weight(&[3.0]), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_posterior_is_unit_inv_temp() {
        let density = TemperedDensity::new(SphericalGaussian { std: 1.0 }, PriorTempering::Fixed);
        let theta = [0.3, -1.2, 2.0];
        assert_eq!(density.log_posterior(&theta), density.evaluate(&theta, 1.0));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let density = TemperedDensity::new(
            BimodalGaussian {
                mode_a: -3.0,
                mode_b: 3.0,
                std: 0.5,
            },
            PriorTempering::Fixed,
        );
        let theta = [1.234_567_f64];
        let first = density.evaluate(&theta, 0.37);
        for _ in 0..5 {
            assert_eq!(density.evaluate(&theta, 0.37), first);
        }
    }

    #[test]
    fn test_out_of_support_evaluates_to_neg_infinity() {
        let target = TruncatedGaussian {
            std: 1.0,
            lower: -2.0,
            upper: 2.0,
        };
        let density = TemperedDensity::new(target, PriorTempering::Fixed);
        assert_eq!(density.evaluate(&[2.5], 1.0), f64::NEG_INFINITY);
        assert_eq!(density.swap_weight(&[2.5]), f64::NEG_INFINITY);
        assert!(density.evaluate(&[1.5], 1.0).is_finite());
    }

    #[test]
    fn test_nan_and_positive_infinity_are_rejected() {
        let nan_model = FnTarget::new(|_: &[f64]| f64::NAN, |_: &[f64]| 0.0);
        let density = TemperedDensity::new(nan_model, PriorTempering::Fixed);
        assert_eq!(density.evaluate(&[0.0], 1.0), f64::NEG_INFINITY);

        let inf_model = FnTarget::new(|_: &[f64]| f64::INFINITY, |_: &[f64]| 0.0);
        let density = TemperedDensity::new(inf_model, PriorTempering::Fixed);
        assert_eq!(density.evaluate(&[0.0], 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_neg_infinity_passes_through() {
        let model = FnTarget::new(|_: &[f64]| f64::NEG_INFINITY, |_: &[f64]| 0.0);
        let density = TemperedDensity::new(model, PriorTempering::Fixed);
        assert_eq!(density.evaluate(&[0.0], 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_bimodal_is_symmetric_and_peaked_at_modes() {
        let target = BimodalGaussian {
            mode_a: -3.0,
            mode_b: 3.0,
            std: 0.5,
        };
        let at_a = target.log_likelihood(&[-3.0]);
        let at_b = target.log_likelihood(&[3.0]);
        let between = target.log_likelihood(&[0.0]);
        assert_abs_diff_eq!(at_a, at_b, epsilon = 1e-12);
        assert!(at_a > between);
    }
}
