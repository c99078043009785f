/*!
# Adaptive Parallel Tempering

This module implements the tempering orchestrator: a ladder of Markov chains
("rungs") at increasing temperatures, advanced in parallel and coupled by
replica-exchange moves, with the temperature spacing adapted on-line toward a
target swap-acceptance rate. The cold rung (temperature 1) samples the actual
posterior; its history is what a run returns.

## Overview

- **Sampling phase**: Every rung takes one kernel step, data-parallel via
  `rayon`. The phase joins before any swap is attempted.
- **Swap phase**: Adjacent rungs propose state exchanges according to the
  configured [`SwapPolicy`]; each attempt updates the pair's counters.
- **Adaptation phase**: Once per epoch the [`LadderAdapter`] reshapes the
  temperature gaps from the observed swap rates, after which every rung's
  cached log-density is refreshed at its new temperature.
- **Recording**: After burn-in the cold rung's state and untempered
  log-posterior are appended to the history.
- **Reproducibility**: `set_seed` gives rung `i` the seed `seed + i` and the
  swap RNG `seed + n_rungs`; identical seeds reproduce runs bit-for-bit.

## Example Usage

```rust
use tempered_mcmc::distributions::BimodalGaussian;
use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};

let target = BimodalGaussian { mode_a: -3.0, mode_b: 3.0, std: 0.5 };
let mut sampler = ParallelTempering::new(target, &[-3.0], TemperingConfig::default())
    .unwrap()
    .set_seed(42);

// Run 500 recorded iterations after 100 burn-in iterations.
let run = sampler.run(500, 100).unwrap();
assert_eq!(run.samples.shape(), &[500, 1]);
assert_eq!(run.temperatures[0], 1.0);
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{aview1, s, Array1, Array2};
use num_traits::Float;
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapt::LadderAdapter;
use crate::distributions::{BayesianTarget, PriorTempering, TemperedDensity};
use crate::error::{Error, Result};
use crate::ladder::{geometric_temperatures, validate_temperatures, Rung};
use crate::random_walk::{RandomWalkKernel, RungKernel};
use crate::stats::AcceptanceWindow;
use crate::swap::{attempt_swap, SwapCounter, SwapPolicy};

/**
Configuration for a tempering run.

`Default` chooses a 4-rung geometric ladder up to temperature 8, fixed
priors, the alternating sweep policy, the classic 0.234 target rates, an
adaptation epoch of 50 iterations and unit initial proposal scales.

# Examples

```rust
use tempered_mcmc::parallel_tempering::TemperingConfig;

let config = TemperingConfig::<f64> {
    n_rungs: 6,
    max_temperature: 64.0,
    ..TemperingConfig::default()
};
assert_eq!(config.adapt_every, 50);
```
*/
#[derive(Debug, Clone)]
pub struct TemperingConfig<T> {
    /// Number of rungs for the geometric initial ladder. Ignored when
    /// `temperatures` is given.
    pub n_rungs: usize,
    /// Hottest temperature of the geometric initial ladder. Ignored when
    /// `temperatures` is given.
    pub max_temperature: T,
    /// Explicit initial ladder; must start at exactly 1 and increase
    /// strictly. Useful for warm-starting from a previous run's adapted
    /// ladder.
    pub temperatures: Option<Vec<T>>,
    /// Whether hot rungs flatten the prior along with the likelihood.
    pub prior_tempering: PriorTempering,
    /// Which adjacent pairs get swap attempts each iteration.
    pub swap_policy: SwapPolicy,
    /// Swap-acceptance rate the ladder adaptation steers toward.
    pub swap_target_rate: T,
    /// Step-acceptance rate each rung's proposal scale is tuned toward.
    pub step_target_rate: T,
    /// Iterations between ladder adaptations (the epoch length).
    pub adapt_every: usize,
    /// Initial gain η₀ of the ladder adaptation.
    pub adapt_eta0: T,
    /// Decay exponent κ ∈ (0, 1] shared by the ladder and scale adaptation.
    pub adapt_kappa: T,
    /// Smallest temperature gap the adaptation may produce.
    pub min_gap: T,
    /// Initial proposal scale given to every rung's kernel.
    pub proposal_scale: T,
    /// Per-rung initial proposal scales, overriding `proposal_scale`.
    pub proposal_scales: Option<Vec<T>>,
}

impl<T: Float> Default for TemperingConfig<T> {
    fn default() -> Self {
        Self {
            n_rungs: 4,
            max_temperature: T::from(8.0).unwrap(),
            temperatures: None,
            prior_tempering: PriorTempering::Fixed,
            swap_policy: SwapPolicy::AlternatingSweep,
            swap_target_rate: T::from(0.234).unwrap(),
            step_target_rate: T::from(0.234).unwrap(),
            adapt_every: 50,
            adapt_eta0: T::from(2.0).unwrap(),
            adapt_kappa: T::from(0.6).unwrap(),
            min_gap: T::from(1e-4).unwrap(),
            proposal_scale: T::one(),
            proposal_scales: None,
        }
    }
}

impl<T: Float + std::fmt::Debug> TemperingConfig<T> {
    /// The initial ladder this configuration describes, validated.
    fn resolve_temperatures(&self) -> Result<Vec<T>> {
        match &self.temperatures {
            Some(temps) => {
                validate_temperatures(temps)?;
                Ok(temps.clone())
            }
            None => {
                if self.n_rungs < 2 {
                    return Err(Error::Config(format!(
                        "need at least 2 rungs, got {}",
                        self.n_rungs
                    )));
                }
                if !self.max_temperature.is_finite() || self.max_temperature <= T::one() {
                    return Err(Error::Config(format!(
                        "max_temperature must be finite and exceed 1, got {:?}",
                        self.max_temperature
                    )));
                }
                Ok(geometric_temperatures(self.n_rungs, self.max_temperature))
            }
        }
    }

    /// One initial proposal scale per rung, validated.
    fn resolve_scales(&self, n_rungs: usize) -> Result<Vec<T>> {
        let scales = match &self.proposal_scales {
            Some(scales) => {
                if scales.len() != n_rungs {
                    return Err(Error::Config(format!(
                        "expected {} proposal scales (one per rung), got {}",
                        n_rungs,
                        scales.len()
                    )));
                }
                scales.clone()
            }
            None => vec![self.proposal_scale; n_rungs],
        };
        for &scale in &scales {
            if !scale.is_finite() || scale <= T::zero() {
                return Err(Error::Config(format!(
                    "proposal scales must be finite and positive, got {:?}",
                    scale
                )));
            }
        }
        Ok(scales)
    }

    fn validate_constants(&self) -> Result<()> {
        if self.adapt_every == 0 {
            return Err(Error::Config("adapt_every must be at least 1".to_string()));
        }
        if !self.adapt_eta0.is_finite() || self.adapt_eta0 <= T::zero() {
            return Err(Error::Config(format!(
                "adapt_eta0 must be finite and positive, got {:?}",
                self.adapt_eta0
            )));
        }
        if !(self.adapt_kappa > T::zero() && self.adapt_kappa <= T::one()) {
            return Err(Error::Config(format!(
                "adapt_kappa must lie in (0, 1], got {:?}",
                self.adapt_kappa
            )));
        }
        for (name, rate) in [
            ("swap_target_rate", self.swap_target_rate),
            ("step_target_rate", self.step_target_rate),
        ] {
            if !(rate > T::zero() && rate < T::one()) {
                return Err(Error::Config(format!(
                    "{} must lie in (0, 1), got {:?}",
                    name, rate
                )));
            }
        }
        if !self.min_gap.is_finite() || self.min_gap <= T::zero() {
            return Err(Error::Config(format!(
                "min_gap must be finite and positive, got {:?}",
                self.min_gap
            )));
        }
        Ok(())
    }
}

/// Cooperative cancellation handle for a running sampler.
///
/// Cheap to clone and safe to trigger from another thread. The run checks
/// the flag at the end of each iteration, finishes that iteration cleanly
/// and returns whatever it recorded so far.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests a stop after the current iteration.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Everything a tempering run produces.
#[derive(Debug, Clone)]
pub struct TemperingRun<T> {
    /// Cold-chain history, one row per recorded iteration.
    pub samples: Array2<T>,
    /// Untempered log-posterior of each recorded sample.
    pub log_posterior: Array1<T>,
    /// The ladder as it stood when the run finished; feed it into
    /// [`TemperingConfig::temperatures`] to warm-start another run.
    pub temperatures: Vec<T>,
    /// Swap attempts per adjacent pair over the collection phase.
    pub pair_attempts: Vec<u64>,
    /// Accepted swaps per adjacent pair over the collection phase.
    pub pair_accepts: Vec<u64>,
    /// Per-rung kernel acceptance rates since sampler construction
    /// (burn-in included).
    pub step_acceptance: Vec<f64>,
    /// Iterations completed in this call, burn-in included. Smaller than
    /// `n_discard + n_collect` only when a stop was requested.
    pub iterations: usize,
}

impl<T> TemperingRun<T> {
    /// Observed swap-acceptance rate per adjacent pair over the collection
    /// phase; pairs without attempts report 0.
    pub fn swap_rates(&self) -> Vec<f64> {
        self.pair_attempts
            .iter()
            .zip(&self.pair_accepts)
            .map(|(&attempts, &accepts)| {
                if attempts == 0 {
                    0.0
                } else {
                    accepts as f64 / attempts as f64
                }
            })
            .collect()
    }
}

/**
The adaptive parallel-tempering sampler.

Owns the tempered-density evaluator, the ladder of rungs, one transition
kernel per rung and the swap/adaptation machinery. The kernel type defaults
to [`RandomWalkKernel`]; [`ParallelTempering::with_kernels`] accepts any
[`RungKernel`] implementation instead.

# Type Parameters

- `T`: The floating-point type (e.g. `f32` or `f64`).
- `M`: The model, implementing [`BayesianTarget`].
- `K`: The per-rung transition kernel.

# Examples

```rust
use tempered_mcmc::distributions::SphericalGaussian;
use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};

let mut sampler = ParallelTempering::new(
    SphericalGaussian { std: 1.0 },
    &[0.0, 0.0],
    TemperingConfig::default(),
)
.unwrap()
.set_seed(7);

let run = sampler.run(200, 50).unwrap();
assert_eq!(run.samples.shape(), &[200, 2]);
```
*/
#[derive(Debug, Clone)]
pub struct ParallelTempering<T, M, K = RandomWalkKernel<T>> {
    /// The tempered-density evaluator shared by all rungs.
    pub density: TemperedDensity<M>,
    /// The temperature ladder; rung 0 is the cold chain.
    pub rungs: Vec<Rung<T>>,
    /// The global random seed.
    pub seed: u64,
    kernels: Vec<K>,
    epoch_counters: Vec<SwapCounter>,
    run_counters: Vec<SwapCounter>,
    adapter: LadderAdapter<T>,
    swap_policy: SwapPolicy,
    adapt_every: usize,
    swap_rng: SmallRng,
    iteration: usize,
    stop: Arc<AtomicBool>,
}

impl<T, M> ParallelTempering<T, M, RandomWalkKernel<T>>
where
    T: Float + Send + Sync + std::fmt::Debug,
    M: BayesianTarget<T> + Sync,
    rand_distr::Standard: rand_distr::Distribution<T>,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    /**
    Constructs a sampler with one adaptive random-walk kernel per rung.

    Every rung starts from `initial_state` with its tempered log-density
    freshly evaluated. Configuration problems (fewer than 2 rungs,
    non-positive proposal scale, malformed explicit ladder, bad adaptation
    constants, empty or non-finite initial state) are reported before any
    sampling happens.

    # Arguments

    * `model` - The target model to sample from.
    * `initial_state` - The starting parameter vector for all rungs.
    * `config` - The run configuration.

    # Examples

    ```rust
    use tempered_mcmc::distributions::SphericalGaussian;
    use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};

    let sampler = ParallelTempering::new(
        SphericalGaussian { std: 1.0 },
        &[0.0],
        TemperingConfig::default(),
    )
    .unwrap();
    assert_eq!(sampler.rungs.len(), 4);
    ```
    */
    pub fn new(model: M, initial_state: &[T], config: TemperingConfig<T>) -> Result<Self> {
        let temperatures = config.resolve_temperatures()?;
        let scales = config.resolve_scales(temperatures.len())?;
        let kernels = scales
            .into_iter()
            .map(|scale| RandomWalkKernel::new(scale, config.step_target_rate, config.adapt_kappa))
            .collect();
        Self::with_kernels(model, initial_state, config, kernels)
    }
}

impl<T, M, K> ParallelTempering<T, M, K>
where
    T: Float + Send + Sync + std::fmt::Debug,
    M: BayesianTarget<T> + Sync,
    K: RungKernel<T, M> + Send,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    /**
    Constructs a sampler from caller-supplied kernels, one per rung.

    This is the entry point for kernel kinds other than the default
    random walk; anything implementing [`RungKernel`] fits.

    # Arguments

    * `model` - The target model to sample from.
    * `initial_state` - The starting parameter vector for all rungs.
    * `config` - The run configuration.
    * `kernels` - One transition kernel per rung, coldest first.
    */
    pub fn with_kernels(
        model: M,
        initial_state: &[T],
        config: TemperingConfig<T>,
        kernels: Vec<K>,
    ) -> Result<Self> {
        config.validate_constants()?;
        let temperatures = config.resolve_temperatures()?;
        if kernels.len() != temperatures.len() {
            return Err(Error::Config(format!(
                "expected one kernel per rung ({}), got {}",
                temperatures.len(),
                kernels.len()
            )));
        }
        if initial_state.is_empty() {
            return Err(Error::Config("initial state must not be empty".to_string()));
        }
        if initial_state.iter().any(|x| !x.is_finite()) {
            return Err(Error::Config(
                "initial state must be finite in every coordinate".to_string(),
            ));
        }

        let density = TemperedDensity::new(model, config.prior_tempering);
        let seed = thread_rng().gen::<u64>();
        let n_pairs = temperatures.len() - 1;
        let rungs: Vec<Rung<T>> = temperatures
            .iter()
            .enumerate()
            .map(|(i, &temperature)| {
                let log_density = density.evaluate(initial_state, T::one() / temperature);
                Rung::new(temperature, initial_state, log_density, seed + i as u64)
            })
            .collect();
        let adapter = LadderAdapter::new(
            config.swap_target_rate,
            config.adapt_eta0,
            config.adapt_kappa,
            config.min_gap,
        );
        let swap_rng = SmallRng::seed_from_u64(seed + rungs.len() as u64);

        Ok(Self {
            density,
            rungs,
            seed,
            kernels,
            epoch_counters: vec![SwapCounter::default(); n_pairs],
            run_counters: vec![SwapCounter::default(); n_pairs],
            adapter,
            swap_policy: config.swap_policy,
            adapt_every: config.adapt_every,
            swap_rng,
            iteration: 0,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /**
    Sets a new global seed and reseeds every RNG derived from it.

    Rung `i` receives the seed `seed + i`; the swap RNG receives
    `seed + n_rungs`. Two samplers built with the same configuration and
    seed produce bit-identical runs.

    # Arguments

    * `seed` - The new global seed value.
    */
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        for (i, rung) in self.rungs.iter_mut().enumerate() {
            let rung_seed = seed + i as u64;
            rung.seed = rung_seed;
            rung.rng = SmallRng::seed_from_u64(rung_seed);
        }
        self.swap_rng = SmallRng::seed_from_u64(seed + self.rungs.len() as u64);
        self
    }

    /// A handle that can request a cooperative stop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// The current temperature of every rung, coldest first.
    pub fn temperatures(&self) -> Vec<T> {
        self.rungs.iter().map(|rung| rung.temperature).collect()
    }

    /// The per-rung kernels, coldest first.
    pub fn kernels(&self) -> &[K] {
        &self.kernels
    }

    /// Global iteration count, accumulated across `run` calls.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /**
    Runs the sampler for `n_discard + n_collect` iterations and returns the
    cold-chain history of the last `n_collect` of them.

    Each iteration advances every rung one kernel step in parallel, then
    attempts swaps per the configured policy, then (once per epoch) adapts
    the ladder. Swap diagnostics are reset when collection starts, so the
    reported rates describe the collection phase only. The global iteration
    counter carries over between calls, which keeps all diminishing
    adaptation schedules on their trajectory when a run is continued.

    # Arguments

    * `n_collect` - Number of recorded iterations; must be at least 1.
    * `n_discard` - Number of burn-in iterations recorded nowhere.

    # Examples

    ```rust
    use tempered_mcmc::distributions::SphericalGaussian;
    use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};

    let mut sampler = ParallelTempering::new(
        SphericalGaussian { std: 1.0 },
        &[0.0],
        TemperingConfig::default(),
    )
    .unwrap()
    .set_seed(3);
    let run = sampler.run(100, 10).unwrap();
    assert_eq!(run.samples.nrows(), 100);
    assert_eq!(run.iterations, 110);
    ```
    */
    pub fn run(&mut self, n_collect: usize, n_discard: usize) -> Result<TemperingRun<T>> {
        self.check_run_args(n_collect)?;
        let dim = self.rungs[0].state.len();
        let mut samples = Array2::<T>::zeros((n_collect, dim));
        let mut log_posterior = Array1::<T>::zeros(n_collect);
        let total = n_discard + n_collect;
        let mut recorded = 0;
        let mut completed = 0;

        for local_iter in 0..total {
            if local_iter == n_discard {
                self.reset_run_counters();
            }
            self.sampling_phase();
            self.swap_phase();
            self.maybe_adapt();
            self.iteration += 1;
            completed += 1;
            if local_iter >= n_discard {
                let cold = &self.rungs[0];
                samples.row_mut(recorded).assign(&aview1(&cold.state));
                log_posterior[recorded] = cold.log_density;
                recorded += 1;
            }
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }
        self.stop.store(false, Ordering::Relaxed);
        Ok(self.finish(samples, log_posterior, recorded, completed))
    }

    /**
    Like [`ParallelTempering::run`], with a progress bar.

    The bar shows sliding-window estimates of the cold chain's step
    acceptance and the ladder-wide swap acceptance over the last 100
    decisions of each kind.
    */
    pub fn run_progress(&mut self, n_collect: usize, n_discard: usize) -> Result<TemperingRun<T>> {
        self.check_run_args(n_collect)?;
        let dim = self.rungs[0].state.len();
        let mut samples = Array2::<T>::zeros((n_collect, dim));
        let mut log_posterior = Array1::<T>::zeros(n_collect);
        let total = n_discard + n_collect;
        let mut recorded = 0;
        let mut completed = 0;

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:8} {bar:40.white} ETA {eta:3} | {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_prefix("APT");

        // Sliding windows over the last 100 decisions of each kind.
        let mut accept_window = AcceptanceWindow::new(100);
        let mut swap_window = AcceptanceWindow::new(100);

        for local_iter in 0..total {
            if local_iter == n_discard {
                self.reset_run_counters();
            }
            let accepted = self.sampling_phase();
            accept_window.push(accepted[0]);
            let (swap_attempts, swap_accepts) = self.swap_phase();
            for i in 0..swap_attempts {
                swap_window.push(i < swap_accepts);
            }
            self.maybe_adapt();
            self.iteration += 1;
            completed += 1;
            if local_iter >= n_discard {
                let cold = &self.rungs[0];
                samples.row_mut(recorded).assign(&aview1(&cold.state));
                log_posterior[recorded] = cold.log_density;
                recorded += 1;
            }
            pb.inc(1);
            pb.set_message(format!(
                "p(accept)≈{:.2} p(swap)≈{:.2}",
                accept_window.rate(),
                swap_window.rate()
            ));
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
        }
        pb.finish_with_message("Done!");
        self.stop.store(false, Ordering::Relaxed);
        Ok(self.finish(samples, log_posterior, recorded, completed))
    }

    /// One parallel kernel step per rung. Returns per-rung acceptance,
    /// coldest first; the rayon join doubles as the barrier between the
    /// sampling and swap phases.
    fn sampling_phase(&mut self) -> Vec<bool> {
        let density = &self.density;
        self.rungs
            .par_iter_mut()
            .zip(self.kernels.par_iter_mut())
            .map(|(rung, kernel)| kernel.step(rung, density))
            .collect()
    }

    /// Swap attempts for this iteration per the configured policy. Returns
    /// `(attempts, accepts)` for the progress display.
    fn swap_phase(&mut self) -> (u64, u64) {
        let n_pairs = self.rungs.len() - 1;
        let mut attempts = 0;
        let mut accepts = 0;
        match self.swap_policy {
            SwapPolicy::AlternatingSweep => {
                // Even pairs on even iterations, odd pairs on odd ones; the
                // selected pairs are disjoint, so no rung swaps twice.
                let mut k = self.iteration % 2;
                while k < n_pairs {
                    attempts += 1;
                    accepts += self.attempt_pair(k) as u64;
                    k += 2;
                }
            }
            SwapPolicy::RandomPair => {
                let k = self.swap_rng.gen_range(0..n_pairs);
                attempts += 1;
                accepts += self.attempt_pair(k) as u64;
            }
        }
        (attempts, accepts)
    }

    fn attempt_pair(&mut self, k: usize) -> bool {
        let (colder_half, hotter_half) = self.rungs.split_at_mut(k + 1);
        let accepted = attempt_swap(
            &mut colder_half[k],
            &mut hotter_half[0],
            &self.density,
            &mut self.swap_rng,
        );
        self.epoch_counters[k].record(accepted);
        self.run_counters[k].record(accepted);
        accepted
    }

    /// Ladder adaptation at epoch boundaries. Re-tempering moves the rungs'
    /// temperatures, so every cached log-density is refreshed afterwards.
    fn maybe_adapt(&mut self) {
        if (self.iteration + 1) % self.adapt_every != 0 {
            return;
        }
        self.adapter
            .adapt(&mut self.rungs, &mut self.epoch_counters, self.iteration + 1);
        for rung in self.rungs.iter_mut() {
            let beta = rung.beta();
            rung.log_density = self.density.evaluate(&rung.state, beta);
        }
    }

    fn check_run_args(&self, n_collect: usize) -> Result<()> {
        if n_collect == 0 {
            return Err(Error::Config("n_collect must be at least 1".to_string()));
        }
        Ok(())
    }

    fn reset_run_counters(&mut self) {
        for counter in self.run_counters.iter_mut() {
            counter.reset();
        }
    }

    fn finish(
        &self,
        samples: Array2<T>,
        log_posterior: Array1<T>,
        recorded: usize,
        completed: usize,
    ) -> TemperingRun<T> {
        TemperingRun {
            samples: samples.slice_move(s![..recorded, ..]),
            log_posterior: log_posterior.slice_move(s![..recorded]),
            temperatures: self.temperatures(),
            pair_attempts: self.run_counters.iter().map(|c| c.attempts).collect(),
            pair_accepts: self.run_counters.iter().map(|c| c.accepts).collect(),
            step_acceptance: self.kernels.iter().map(|k| k.acceptance_rate()).collect(),
            iterations: completed,
        }
    }
}
