//! The [`Task`] trait and the [`EnvContext`] passed to its hooks.
//!
//! A task is one concrete environment variant: it registers simulation
//! entities with the engine, turns actions into engine commands, and
//! computes observations, rewards, and done codes. [`SimEnv`](crate::SimEnv)
//! owns the task, the engine, and the buffers, and calls the hooks in a
//! fixed order.

use tandem_core::{Config, DoneCode, Info, Space, Tensor};
use tandem_engine::Engine;

use crate::buffers::{EnvBuffers, Outputs};
use crate::error::EnvError;

/// Hook access to the engine and the environment's buffers.
///
/// Observations and counters are read-only here; rewards, done codes, and
/// the info mapping are writable. Use [`outputs`](EnvContext::outputs)
/// to read the engine while writing buffers.
pub struct EnvContext<'a, E> {
    engine: &'a mut E,
    buffers: &'a mut EnvBuffers,
    episode_length: f64,
}

impl<'a, E: Engine> EnvContext<'a, E> {
    pub(crate) fn new(engine: &'a mut E, buffers: &'a mut EnvBuffers, episode_length: f64) -> Self {
        Self {
            engine,
            buffers,
            episode_length,
        }
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &*self.engine
    }

    /// The engine, mutably (for staging state writes during reset).
    pub fn engine_mut(&mut self) -> &mut E {
        &mut *self.engine
    }

    /// Batch size.
    pub fn num_envs(&self) -> usize {
        self.buffers.num_envs()
    }

    /// Configured episode length in seconds.
    pub fn episode_length(&self) -> f64 {
        self.episode_length
    }

    /// Observation buffer.
    pub fn obs(&self) -> &Tensor {
        self.buffers.obs()
    }

    /// Steps since reset.
    pub fn timesteps(&self) -> &[u64] {
        self.buffers.timesteps()
    }

    /// Elapsed episode time.
    pub fn time(&self) -> &[f64] {
        self.buffers.time()
    }

    /// Reward buffer.
    pub fn rewards(&self) -> &[f32] {
        self.buffers.rewards()
    }

    /// Done codes.
    pub fn done(&self) -> &[DoneCode] {
        self.buffers.done()
    }

    /// Info mapping.
    pub fn info(&self) -> &Info {
        self.buffers.info()
    }

    /// Writable reward buffer.
    pub fn rewards_mut(&mut self) -> &mut [f32] {
        self.buffers.rewards_mut()
    }

    /// Writable done codes.
    pub fn done_mut(&mut self) -> &mut [DoneCode] {
        self.buffers.done_mut()
    }

    /// Writable info mapping.
    pub fn info_mut(&mut self) -> &mut Info {
        self.buffers.info_mut()
    }

    /// The engine and all buffers at once.
    pub fn outputs(&mut self) -> (&E, Outputs<'_>) {
        (&*self.engine, self.buffers.outputs())
    }
}

/// One concrete environment variant.
///
/// Required hooks define the task; the rest default to no-ops, except
/// [`init_camera`](Task::init_camera), which fails with
/// [`EnvError::NotImplemented`] so that asking for a viewer on a task
/// without a camera is reported at construction.
///
/// # Hook order
///
/// Construction: `build_envs`, (engine `initialize_sim`),
/// `build_action_space`, `build_sim_tensors`, `compute_obs` (probe),
/// `init_camera` when visualizing.
///
/// Reset: (core zeroing), `reset_envs`, (engine `update_sim_state`),
/// `compute_obs`, `update_info`.
///
/// Step: `apply_action`, (engine `step`), `update_camera` when
/// rendering, (engine `render`), (time advance), `update_misc`,
/// `compute_obs`, `update_info`, `update_reward`, `update_done`.
pub trait Task: Send + 'static {
    /// Engine this task drives.
    type Engine: Engine;
    /// Action accepted by [`apply_action`](Task::apply_action), usually a
    /// batch [`Tensor`].
    type Action: ?Sized;

    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Register each environment's simulation entities with the engine.
    fn build_envs(
        &mut self,
        engine: &mut Self::Engine,
        config: &Config,
        num_envs: usize,
    ) -> Result<(), EnvError>;

    /// Describe the legal per-environment action.
    fn build_action_space(&self, engine: &Self::Engine) -> Result<Space, EnvError>;

    /// Set up any task-side tensors that mirror simulation state.
    fn build_sim_tensors(&mut self, engine: &Self::Engine, config: &Config) -> Result<(), EnvError> {
        let _ = (engine, config);
        Ok(())
    }

    /// Place the viewer camera. Called once at construction when
    /// visualizing.
    fn init_camera(&mut self, engine: &mut Self::Engine) -> Result<(), EnvError> {
        let _ = engine;
        Err(EnvError::NotImplemented {
            hook: "init_camera",
        })
    }

    /// Push an action into the live simulation.
    fn apply_action(&mut self, engine: &mut Self::Engine, action: &Self::Action) -> Result<(), EnvError>;

    /// Observations for the whole batch (`None`) or the listed
    /// environments, one row each, in the order given.
    ///
    /// Must not change simulation state; it is also used to probe the
    /// observation space before any reset.
    fn compute_obs(&self, engine: &Self::Engine, env_ids: Option<&[usize]>) -> Result<Tensor, EnvError>;

    /// Task-specific reset of `env_ids`. Counters and done codes of those
    /// environments are already zeroed when this runs; `env_ids` is never
    /// empty.
    fn reset_envs(&mut self, ctx: &mut EnvContext<'_, Self::Engine>, env_ids: &[usize]) -> Result<(), EnvError>;

    /// Bookkeeping after the time advance, before observations.
    fn update_misc(&mut self, ctx: &mut EnvContext<'_, Self::Engine>) -> Result<(), EnvError> {
        let _ = ctx;
        Ok(())
    }

    /// Refresh info entries for the whole batch (`None`) or `env_ids`.
    fn update_info(
        &mut self,
        ctx: &mut EnvContext<'_, Self::Engine>,
        env_ids: Option<&[usize]>,
    ) -> Result<(), EnvError> {
        let _ = (ctx, env_ids);
        Ok(())
    }

    /// Write the reward of every environment.
    fn update_reward(&mut self, ctx: &mut EnvContext<'_, Self::Engine>) -> Result<(), EnvError>;

    /// Write the done code of every environment.
    fn update_done(&mut self, ctx: &mut EnvContext<'_, Self::Engine>) -> Result<(), EnvError>;

    /// Reposition a follow camera before a render.
    fn update_camera(&mut self, engine: &mut Self::Engine) -> Result<(), EnvError> {
        let _ = engine;
        Ok(())
    }
}
