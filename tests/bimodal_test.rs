//! Tests verifying that tempering actually buys mixing on a multimodal target.
//!
//! The target is an equal-weight mixture of two narrow Gaussians at ±3. A
//! plain random-walk chain practically never crosses the probability barrier
//! between the modes; the tempered sampler must, via replica exchange.

use tempered_mcmc::distributions::{
    BimodalGaussian, PriorTempering, TemperedDensity,
};
use tempered_mcmc::ladder::Rung;
use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};
use tempered_mcmc::random_walk::{RandomWalkKernel, RungKernel};

#[cfg(test)]
mod tests {
    use super::*;

    const ITERATIONS: usize = 10_000;
    const SEED: u64 = 42;

    fn target() -> BimodalGaussian<f64> {
        BimodalGaussian {
            mode_a: -3.0,
            mode_b: 3.0,
            std: 0.5,
        }
    }

    /// Number of sign changes in a trajectory, i.e. how often the chain moved
    /// from one mode's basin to the other's.
    fn mode_switches(trajectory: impl Iterator<Item = f64>) -> usize {
        let mut switches = 0;
        let mut previous: Option<bool> = None;
        for x in trajectory {
            let upper = x > 0.0;
            if let Some(prev) = previous {
                switches += (prev != upper) as usize;
            }
            previous = Some(upper);
        }
        switches
    }

    /// Runs a single cold random-walk chain with the same step budget as one
    /// rung of the tempered sampler and returns its trajectory.
    fn cold_only_trajectory(iterations: usize) -> Vec<f64> {
        let density = TemperedDensity::new(target(), PriorTempering::Fixed);
        let mut rung = Rung::new(1.0, &[-3.0], density.log_posterior(&[-3.0]), SEED);
        let mut kernel = RandomWalkKernel::new(1.0, 0.234, 0.6);
        (0..iterations)
            .map(|_| {
                kernel.step(&mut rung, &density);
                rung.state[0]
            })
            .collect()
    }

    /// The tempered cold chain must visit both modes substantially; a plain
    /// chain with the same iteration budget, started in the lower mode, must
    /// switch modes strictly less often.
    #[test]
    fn test_tempering_crosses_modes_where_plain_chain_cannot() {
        let config = TemperingConfig {
            n_rungs: 6,
            max_temperature: 64.0,
            ..TemperingConfig::default()
        };
        let mut sampler = ParallelTempering::new(target(), &[-3.0], config)
            .unwrap()
            .set_seed(SEED);
        let run = sampler.run(ITERATIONS, 1_000).unwrap();

        let in_upper = run.samples.column(0).iter().filter(|&&x| x > 0.0).count();
        let occupancy = in_upper as f64 / run.samples.nrows() as f64;
        assert!(
            (0.15..=0.85).contains(&occupancy),
            "Tempered chain stuck: upper-mode occupancy {}",
            occupancy
        );

        let tempered_switches = mode_switches(run.samples.column(0).iter().copied());
        let plain_switches = mode_switches(cold_only_trajectory(ITERATIONS).into_iter());
        assert!(
            tempered_switches > plain_switches,
            "Expected tempering to switch modes more often: {} vs {}",
            tempered_switches,
            plain_switches
        );
        assert!(
            tempered_switches >= 10,
            "Too few mode switches under tempering: {}",
            tempered_switches
        );
    }

    /// With modes this far apart the plain chain should essentially never
    /// reach the other basin.
    #[test]
    fn test_plain_chain_stays_in_its_mode() {
        let trajectory = cold_only_trajectory(ITERATIONS);
        let in_upper = trajectory.iter().filter(|&&x| x > 0.0).count();
        assert!(
            (in_upper as f64) < 0.05 * ITERATIONS as f64,
            "Plain chain unexpectedly escaped its mode: {} upper-mode states",
            in_upper
        );
    }
}
