//! Price paths the keepers observe.

use autoexit_core::domain::{Tick, MAX_TICK, MIN_TICK};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{PathConfig, ScenarioError};

/// Expand a path configuration into one tick per step.
///
/// Random walks are deterministic in their seed: the same configuration always
/// yields the same ticks, on every platform.
pub fn generate(path: &PathConfig) -> Result<Vec<Tick>, ScenarioError> {
    match path {
        PathConfig::Explicit { ticks } => ticks
            .iter()
            .map(|&t| Tick::new(t).map_err(ScenarioError::from))
            .collect(),
        PathConfig::RandomWalk {
            start,
            steps,
            max_step,
            drift,
            seed,
        } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            let max_step = i64::from(*max_step);
            let mut current = i64::from(Tick::new(*start)?.get());
            let mut ticks = Vec::with_capacity(*steps);
            ticks.push(Tick::new(current as i32)?);
            for _ in 1..*steps {
                let step = rng.gen_range(-max_step..=max_step) + i64::from(*drift);
                current = (current + step).clamp(i64::from(MIN_TICK), i64::from(MAX_TICK));
                ticks.push(Tick::new(current as i32)?);
            }
            Ok(ticks)
        }
    }
}
