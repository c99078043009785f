//! A small tempering demo: sampling a well-separated bimodal density with
//! adaptive parallel tempering, next to a plain cold chain that gets stuck.

use tempered_mcmc::distributions::{BimodalGaussian, PriorTempering, TemperedDensity};
use tempered_mcmc::ladder::Rung;
use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};
use tempered_mcmc::random_walk::{RandomWalkKernel, RungKernel};
use tempered_mcmc::stats::RunningMoments;

fn main() -> Result<(), tempered_mcmc::error::Error> {
    const ITERATIONS: usize = 20_000;
    const BURNIN: usize = 2_000;
    const SEED: u64 = 42;

    let target = BimodalGaussian {
        mode_a: -3.0,
        mode_b: 3.0,
        std: 0.5,
    };
    let initial_state: [f64; 1] = [-3.0];

    // Adaptive parallel tempering: 6 rungs up to temperature 64.
    let config = TemperingConfig {
        n_rungs: 6,
        max_temperature: 64.0,
        ..TemperingConfig::default()
    };
    let mut sampler = ParallelTempering::new(target, &initial_state, config)?.set_seed(SEED);
    let run = sampler.run_progress(ITERATIONS, BURNIN)?;

    let mut moments = RunningMoments::new(1);
    let mut in_upper_mode = 0_usize;
    for row in run.samples.rows() {
        moments.step(&row.to_vec());
        in_upper_mode += (row[0] > 0.0) as usize;
    }
    println!("Generated {} cold-chain samples", run.samples.nrows());
    println!(
        "Cold-chain mean: {:.3}, sample variance: {:.3}",
        moments.mean()[0],
        moments.sm2()[0]
    );
    println!(
        "Time spent in upper mode: {:.1}% (symmetric target: 50%)",
        100.0 * in_upper_mode as f64 / run.samples.nrows() as f64
    );
    println!(
        "Adapted ladder: {:?}",
        run.temperatures
            .iter()
            .map(|t| (t * 100.0).round() / 100.0)
            .collect::<Vec<_>>()
    );
    println!("Per-pair swap rates: {:?}", run.swap_rates());
    println!("Per-rung step acceptance: {:?}", run.step_acceptance);

    // The same budget for a single cold chain, driven directly by the kernel.
    let density = TemperedDensity::new(target, PriorTempering::Fixed);
    let mut rung = Rung::new(
        1.0,
        &initial_state,
        density.log_posterior(&initial_state),
        SEED,
    );
    let mut kernel = RandomWalkKernel::new(1.0, 0.234, 0.6);
    let mut in_upper_mode = 0_usize;
    for _ in 0..ITERATIONS {
        kernel.step(&mut rung, &density);
        in_upper_mode += (rung.state[0] > 0.0) as usize;
    }
    println!(
        "Plain cold chain started at {:?}: {:.1}% of time in upper mode",
        initial_state,
        100.0 * in_upper_mode as f64 / ITERATIONS as f64
    );

    Ok(())
}
