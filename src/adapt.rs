/*!
On-line adaptation of the temperature ladder.

Once per epoch the adapter nudges every temperature gap toward the target
swap-acceptance rate with a multiplicative update

```text
gap_k *= exp(η · (observed_k − target)),    η = η₀ / iteration^κ
```

and re-derives the temperatures by summing gaps upward from the pinned cold
rung. Neighbours that swap too eagerly sit closer than they need to, so a
high observed rate widens the gap; a low rate shrinks it. The gain η decays
with the global iteration count (κ in `(0, 1]`), which lets the ladder settle
while early epochs still move freely. Gaps are clamped from below, so the
ladder stays strictly increasing no matter what the counters report.
*/

use num_traits::Float;

use crate::ladder::Rung;
use crate::swap::SwapCounter;

/// Multiplicative gap adapter driving swap rates toward a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderAdapter<T> {
    target_rate: T,
    eta0: T,
    kappa: T,
    min_gap: T,
}

impl<T: Float> LadderAdapter<T> {
    pub fn new(target_rate: T, eta0: T, kappa: T, min_gap: T) -> Self {
        Self {
            target_rate,
            eta0,
            kappa,
            min_gap,
        }
    }

    /// The swap-acceptance rate the ladder is steered toward.
    pub fn target_rate(&self) -> T {
        self.target_rate
    }

    /**
    Applies one adaptation epoch to the ladder.

    `counters[k]` holds the attempts and accepts of the pair `(k, k+1)`
    since the previous epoch; pairs without attempts keep their gap. Every
    counter is reset afterwards. `iteration` is the 1-based global iteration
    index and controls the decayed gain.

    Temperatures are rewritten in place: rung 0 stays exactly 1 and each
    hotter rung sits one (clamped) gap above its predecessor. Callers must
    refresh the rungs' cached log-densities afterwards, since a rung's
    temperature may have changed under its current state.
    */
    pub fn adapt(&self, rungs: &mut [Rung<T>], counters: &mut [SwapCounter], iteration: usize) {
        debug_assert_eq!(counters.len() + 1, rungs.len());
        let iteration = iteration.max(1);
        let eta = self.eta0 / T::from(iteration).unwrap().powf(self.kappa);

        let mut gaps: Vec<T> = rungs
            .windows(2)
            .map(|pair| pair[1].temperature - pair[0].temperature)
            .collect();
        for (gap, counter) in gaps.iter_mut().zip(counters.iter_mut()) {
            if counter.attempts > 0 {
                let observed = T::from(counter.accepts).unwrap()
                    / T::from(counter.attempts).unwrap();
                *gap = *gap * (eta * (observed - self.target_rate)).exp();
            }
            if *gap < self.min_gap {
                *gap = self.min_gap;
            }
            counter.reset();
        }

        rungs[0].temperature = T::one();
        let mut temperature = T::one();
        for (rung, gap) in rungs[1..].iter_mut().zip(&gaps) {
            temperature = temperature + *gap;
            rung.temperature = temperature;
        }
    }
}
