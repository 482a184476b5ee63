//! Point-mass reaching task.
//!
//! Each environment holds one body and a target. The agent pushes the
//! body with a clipped 2D force and is rewarded for closeness to the
//! target. An episode ends when the body reaches the target, leaves the
//! arena, or runs out of time.
//!
//! Settings are read from the `env` config section:
//!
//! | key              | default | meaning                                 |
//! |------------------|---------|-----------------------------------------|
//! | `seed`           | 0       | seed of the reset sampler               |
//! | `max_force`      | 1.0     | per-component force bound               |
//! | `mass`           | 1.0     | body mass                               |
//! | `spawn_radius`   | 1.0     | start and target lie in this square     |
//! | `success_radius` | 0.1     | distance that counts as reached         |
//! | `arena_radius`   | 5.0     | distance from origin that counts as lost|

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tandem_core::{BoxSpace, Config, ConfigError, DType, DoneCode, Space, SpaceDtype, Tensor};
use tandem_engine::{Body, BodyState, Engine, KinematicEngine};
use tandem_env::{EnvContext, EnvError, Task};
use tracing::debug;

/// Body left the arena.
pub const FAIL: DoneCode = DoneCode(1);
/// Body reached the target.
pub const SUCC: DoneCode = DoneCode(2);
/// Episode time ran out.
pub const TIME: DoneCode = DoneCode(3);

/// Target draws per reset before accepting one inside the success region.
const MAX_TARGET_DRAWS: usize = 32;

/// Observation components per environment: position, velocity, target,
/// episode phase.
pub const OBS_DIM: usize = 7;

/// Settings read from the `env` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PointReachConfig {
    /// Seed of the reset sampler.
    pub seed: u64,
    /// Per-component force bound.
    pub max_force: f32,
    /// Body mass.
    pub mass: f32,
    /// Start positions and targets are drawn from `[-r, r]^2`.
    pub spawn_radius: f32,
    /// Distance to the target that counts as success.
    pub success_radius: f32,
    /// Distance from the origin beyond which the episode fails.
    pub arena_radius: f32,
}

impl Default for PointReachConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_force: 1.0,
            mass: 1.0,
            spawn_radius: 1.0,
            success_radius: 0.1,
            arena_radius: 5.0,
        }
    }
}

impl PointReachConfig {
    /// Parse and validate the task keys of the `env` section.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let section = config.env_config()?.section;
        let parsed: Self = section.deserialize()?;
        let positive = [
            ("max_force", parsed.max_force),
            ("mass", parsed.mass),
            ("success_radius", parsed.success_radius),
            ("arena_radius", parsed.arena_radius),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: section.path(key),
                    reason: format!("must be finite and positive, got {value}"),
                });
            }
        }
        if !parsed.spawn_radius.is_finite() || parsed.spawn_radius <= parsed.success_radius {
            return Err(ConfigError::InvalidValue {
                key: section.path("spawn_radius"),
                reason: format!(
                    "must be finite and exceed success_radius ({}), got {}",
                    parsed.success_radius, parsed.spawn_radius
                ),
            });
        }
        // A spawn corner lies at sqrt(2) * spawn_radius from the origin.
        if parsed.spawn_radius * std::f32::consts::SQRT_2 >= parsed.arena_radius {
            return Err(ConfigError::InvalidValue {
                key: section.path("arena_radius"),
                reason: format!(
                    "must exceed the spawn area (spawn_radius={})",
                    parsed.spawn_radius
                ),
            });
        }
        Ok(parsed)
    }
}

/// Point-mass reaching on a [`KinematicEngine`].
#[derive(Debug)]
pub struct PointReach {
    settings: PointReachConfig,
    action_bounds: BoxSpace,
    rng: ChaCha8Rng,
    targets: Vec<[f32; 2]>,
    phase: Vec<f32>,
    successes: u64,
}

impl PointReach {
    /// A task with default settings; `build_envs` replaces them with the
    /// configured ones.
    pub fn new() -> Self {
        let settings = PointReachConfig::default();
        Self {
            action_bounds: BoxSpace::unbounded(&[2], SpaceDtype::Float32),
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
            targets: Vec::new(),
            phase: Vec::new(),
            successes: 0,
        }
    }

    /// Active settings.
    pub fn settings(&self) -> &PointReachConfig {
        &self.settings
    }

    /// Target of each environment.
    pub fn targets(&self) -> &[[f32; 2]] {
        &self.targets
    }

    /// Episodes that ended in success so far.
    pub fn successes(&self) -> u64 {
        self.successes
    }

    fn sample_point(&mut self) -> [f32; 2] {
        let r = self.settings.spawn_radius;
        [self.rng.random_range(-r..=r), self.rng.random_range(-r..=r)]
    }

    fn distances(&self, engine: &KinematicEngine) -> Result<Vec<f32>, EnvError> {
        (0..engine.num_envs())
            .map(|env| -> Result<f32, EnvError> {
                let body = engine.body(env, 0)?;
                Ok(distance(body.position, self.targets[env]))
            })
            .collect()
    }

    fn follow_pose(engine: &KinematicEngine) -> Result<([f32; 3], [f32; 3]), EnvError> {
        let [x, y] = engine.body(0, 0)?.position;
        Ok(([x, y - 4.0, 3.0], [x, y, 0.0]))
    }
}

impl Default for PointReach {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for PointReach {
    type Engine = KinematicEngine;
    type Action = Tensor;

    fn name(&self) -> &str {
        "point_reach"
    }

    fn build_envs(&mut self, engine: &mut KinematicEngine, config: &Config, num_envs: usize) -> Result<(), EnvError> {
        self.settings = PointReachConfig::from_config(config)?;
        let bound = f64::from(self.settings.max_force);
        self.action_bounds = BoxSpace::uniform(-bound, bound, &[2], SpaceDtype::Float32)?;
        self.rng = ChaCha8Rng::seed_from_u64(self.settings.seed);
        self.targets = vec![[0.0; 2]; num_envs];
        self.phase = vec![0.0; num_envs];
        self.successes = 0;

        for env in 0..num_envs {
            engine.add_body(
                env,
                Body {
                    mass: self.settings.mass,
                    state: BodyState::default(),
                },
            )?;
        }
        debug!(num_envs, seed = self.settings.seed, "point bodies registered");
        Ok(())
    }

    fn build_action_space(&self, _engine: &KinematicEngine) -> Result<Space, EnvError> {
        Ok(self.action_bounds.clone().into())
    }

    fn init_camera(&mut self, engine: &mut KinematicEngine) -> Result<(), EnvError> {
        let (position, target) = Self::follow_pose(engine)?;
        engine.set_camera_pose(position, target)?;
        Ok(())
    }

    fn apply_action(&mut self, engine: &mut KinematicEngine, action: &Tensor) -> Result<(), EnvError> {
        let num_envs = engine.num_envs();
        if action.shape() != &[num_envs, 2] {
            return Err(EnvError::InvalidAction {
                reason: format!("expected shape [{num_envs}, 2], got {:?}", action.shape()),
            });
        }
        let forces = action.as_f32().ok_or_else(|| EnvError::InvalidAction {
            reason: format!("expected {}, got {}", DType::F32, action.dtype()),
        })?;
        for (env, row) in forces.chunks_exact(2).enumerate() {
            let mut force = [row[0], row[1]];
            self.action_bounds.clip(&mut force);
            engine.apply_force(env, 0, force)?;
        }
        Ok(())
    }

    fn compute_obs(&self, engine: &KinematicEngine, env_ids: Option<&[usize]>) -> Result<Tensor, EnvError> {
        let all: Vec<usize>;
        let ids: &[usize] = match env_ids {
            Some(ids) => ids,
            None => {
                all = (0..engine.num_envs()).collect();
                &all
            }
        };
        let mut data = Vec::with_capacity(ids.len() * OBS_DIM);
        for &env in ids {
            let body = engine.body(env, 0)?;
            let target = self.targets[env];
            data.extend_from_slice(&body.position);
            data.extend_from_slice(&body.velocity);
            data.extend_from_slice(&target);
            data.push(self.phase[env]);
        }
        Ok(Tensor::from_f32(&[ids.len(), OBS_DIM], data)?)
    }

    fn reset_envs(&mut self, ctx: &mut EnvContext<'_, KinematicEngine>, env_ids: &[usize]) -> Result<(), EnvError> {
        for &env in env_ids {
            let start = self.sample_point();
            let mut target = self.sample_point();
            for _ in 1..MAX_TARGET_DRAWS {
                if distance(start, target) > self.settings.success_radius {
                    break;
                }
                target = self.sample_point();
            }
            ctx.engine_mut().set_body(
                env,
                0,
                BodyState {
                    position: start,
                    velocity: [0.0; 2],
                },
            )?;
            self.targets[env] = target;
            self.phase[env] = 0.0;
        }
        Ok(())
    }

    fn update_misc(&mut self, ctx: &mut EnvContext<'_, KinematicEngine>) -> Result<(), EnvError> {
        let episode_length = ctx.episode_length();
        for (phase, time) in self.phase.iter_mut().zip(ctx.time()) {
            *phase = (*time / episode_length) as f32;
        }
        Ok(())
    }

    fn update_info(
        &mut self,
        ctx: &mut EnvContext<'_, KinematicEngine>,
        _env_ids: Option<&[usize]>,
    ) -> Result<(), EnvError> {
        let dist = self.distances(ctx.engine())?;
        let info = ctx.info_mut();
        info.insert("dist".into(), dist.into());
        info.insert("successes".into(), self.successes.into());
        Ok(())
    }

    fn update_reward(&mut self, ctx: &mut EnvContext<'_, KinematicEngine>) -> Result<(), EnvError> {
        let dist = self.distances(ctx.engine())?;
        for (reward, d) in ctx.rewards_mut().iter_mut().zip(dist) {
            *reward = (-d * d).exp();
        }
        Ok(())
    }

    fn update_done(&mut self, ctx: &mut EnvContext<'_, KinematicEngine>) -> Result<(), EnvError> {
        let episode_length = ctx.episode_length();
        let (engine, out) = ctx.outputs();
        for env in 0..engine.num_envs() {
            let position = engine.body(env, 0)?.position;
            let code = if distance(position, self.targets[env]) <= self.settings.success_radius {
                SUCC
            } else if distance(position, [0.0; 2]) > self.settings.arena_radius {
                FAIL
            } else if out.time[env] >= episode_length {
                TIME
            } else {
                DoneCode::NULL
            };
            if code == SUCC && out.done[env] != SUCC {
                self.successes += 1;
            }
            out.done[env] = code;
        }
        out.info.insert("successes".into(), self.successes.into());
        Ok(())
    }

    fn update_camera(&mut self, engine: &mut KinematicEngine) -> Result<(), EnvError> {
        self.init_camera(engine)
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}
