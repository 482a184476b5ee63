//! Benchmark profiles and utilities for the Tandem environment framework.
//!
//! - [`reference_config`]: PointReach on the kinematic engine, 1/30 s steps
//! - [`stress_config`]: same task with four integration sub-steps
//! - [`ActionSampler`]: seeded uniform actions inside an action space

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use tandem_core::{BoxSpace, Config, ConfigError, Tensor, TensorError};

/// PointReach settings used by the benchmarks and the example.
///
/// Five-second episodes, one integration sub-step, reset sampler seeded
/// with `seed`.
pub fn reference_config(seed: u64) -> Result<Config, ConfigError> {
    profile(seed, 1)
}

/// Like [`reference_config`] but integrating four sub-steps per step.
pub fn stress_config(seed: u64) -> Result<Config, ConfigError> {
    profile(seed, 4)
}

fn profile(seed: u64, substeps: u32) -> Result<Config, ConfigError> {
    let value = json!({
        "env": {
            "episode_length": 5.0,
            "seed": seed,
            "max_force": 2.0,
            "success_radius": 0.1,
            "arena_radius": 5.0,
        },
        "engine": {
            "engine_name": "kinematic",
            "timestep": 1.0 / 30.0,
            "substeps": substeps,
            "damping": 0.5,
        },
    });
    Config::from_value(value)
}

/// Draws batch actions uniformly from a bounded box space.
#[derive(Debug)]
pub struct ActionSampler {
    space: BoxSpace,
    rng: ChaCha8Rng,
}

impl ActionSampler {
    /// Sampler over `space` seeded with `seed`.
    pub fn new(space: BoxSpace, seed: u64) -> Self {
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// One `[num_envs, *space.shape()]` `f32` action.
    pub fn sample(&mut self, num_envs: usize) -> Result<Tensor, TensorError> {
        let mut shape = vec![num_envs];
        shape.extend_from_slice(self.space.shape());
        let mut data = Vec::with_capacity(num_envs * self.space.numel());
        for _ in 0..num_envs {
            data.extend(self.space.sample(&mut self.rng).into_iter().map(|v| v as f32));
        }
        Tensor::from_f32(&shape, data)
    }
}
