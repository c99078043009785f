/*!
Temperature-ladder primitives: the per-rung chain state and helpers for
building and validating the ladder itself.

A ladder is an ordered sequence of [`Rung`]s. Rung 0 is pinned at temperature
1 and samples the actual posterior; every further rung is strictly hotter and
samples a flattened copy. The ladder type used throughout the crate is a plain
`Vec<Rung<T>>`; the orchestrator owns it and keeps the ordering invariant.
*/

use crate::error::{Error, Result};
use num_traits::Float;
use rand::prelude::*;

/// One rung of the temperature ladder: a Markov chain at a fixed temperature.
///
/// The cached `log_density` always belongs to `state` evaluated at
/// `temperature`; every code path that changes one of the three recomputes
/// the cache from scratch.
#[derive(Debug, Clone)]
pub struct Rung<T> {
    /// The rung's temperature. Rung 0 holds exactly 1.
    pub temperature: T,
    /// The chain's current parameter vector.
    pub state: Vec<T>,
    /// Tempered log-density of `state` at `temperature`.
    pub log_density: T,
    /// The rung-specific random seed.
    pub seed: u64,
    /// The random number generator driving this rung's proposals.
    pub rng: SmallRng,
}

impl<T: Float> Rung<T> {
    /// Creates a rung at `temperature` starting from `initial_state`, whose
    /// tempered log-density the caller has already evaluated.
    pub fn new(temperature: T, initial_state: &[T], log_density: T, seed: u64) -> Self {
        Self {
            temperature,
            state: initial_state.to_vec(),
            log_density,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The rung's inverse temperature β = 1/T.
    pub fn beta(&self) -> T {
        T::one() / self.temperature
    }
}

/// Builds a geometric temperature ladder `T_k = max_temperature^(k/(n-1))`.
///
/// Rung 0 comes out as exactly 1 and rung `n_rungs - 1` as exactly
/// `max_temperature`. Requires `n_rungs >= 2` and `max_temperature > 1`,
/// which the orchestrator's configuration checks enforce.
///
/// # Examples
///
/// ```rust
/// use tempered_mcmc::ladder::geometric_temperatures;
///
/// let temps = geometric_temperatures(4, 8.0);
/// assert_eq!(temps, vec![1.0, 2.0, 4.0, 8.0]);
/// ```
pub fn geometric_temperatures<T: Float>(n_rungs: usize, max_temperature: T) -> Vec<T> {
    let top = T::from(n_rungs - 1).unwrap();
    (0..n_rungs)
        .map(|k| max_temperature.powf(T::from(k).unwrap() / top))
        .collect()
}

/// Checks that an explicit temperature sequence forms a valid ladder:
/// at least two rungs, rung 0 exactly 1, all finite, strictly increasing.
pub fn validate_temperatures<T: Float + std::fmt::Debug>(temps: &[T]) -> Result<()> {
    if temps.len() < 2 {
        return Err(Error::Config(format!(
            "need at least 2 rungs, got {}",
            temps.len()
        )));
    }
    if temps[0] != T::one() {
        return Err(Error::Ladder(format!(
            "rung 0 must have temperature 1, got {:?}",
            temps[0]
        )));
    }
    for (i, &t) in temps.iter().enumerate() {
        if !t.is_finite() {
            return Err(Error::Ladder(format!("temperature of rung {} is not finite", i)));
        }
    }
    for i in 1..temps.len() {
        if temps[i] <= temps[i - 1] {
            return Err(Error::Ladder(format!(
                "rung {} ({:?}) is not hotter than rung {} ({:?})",
                i,
                temps[i],
                i - 1,
                temps[i - 1]
            )));
        }
    }
    Ok(())
}
