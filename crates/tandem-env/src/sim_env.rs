//! The batched environment state machine.
//!
//! [`SimEnv`] owns a [`Task`], the task's engine, and the batch buffers,
//! and drives them through construction, reset, and step.
//!
//! # Ownership model
//!
//! `SimEnv` is [`Send`] whenever its task is (and every task's engine is
//! `Send` by the [`Engine`] bound). All mutating methods take `&mut self`;
//! [`reset`](SimEnv::reset) and [`step`](SimEnv::step) return borrows of
//! the buffers, so the caller cannot step again while holding the previous
//! step's output. Copy what must outlive the next call.
//!
//! # Lifecycle
//!
//! `new` returns an environment in [`EnvState::Ready`]. The first reset
//! moves it to [`EnvState::Reset`], the first step after that to
//! [`EnvState::Stepping`]. Finished environments are never reset
//! automatically: read [`done_env_ids`](SimEnv::done_env_ids) and pass
//! them back to `reset`. [`close`](SimEnv::close) consumes the
//! environment.

use tandem_core::{BoxSpace, Config, Device, DoneCode, Info, Space, Tensor};
use tandem_engine::Engine;
use tracing::{debug, info, trace};

use crate::buffers::EnvBuffers;
use crate::error::EnvError;
use crate::space_builder::build_observation_space;
use crate::task::{EnvContext, Task};

// Compile-time assertion: SimEnv is Send for every task.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check<T: Task>() {
        assert_send::<SimEnv<T>>();
    }
};

// ── EnvState ────────────────────────────────────────────────────

/// Lifecycle state of a [`SimEnv`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvState {
    /// Constructed, never reset. `step` is refused.
    Ready,
    /// Most recent operation was a (non-empty) reset.
    Reset,
    /// Most recent operation was a step.
    Stepping,
}

// ── StepOutput ──────────────────────────────────────────────────

/// Buffers after a successful [`SimEnv::step`].
#[derive(Debug)]
pub struct StepOutput<'e> {
    /// Observations, `[N, *obs_shape]`.
    pub obs: &'e Tensor,
    /// Per-environment reward.
    pub reward: &'e [f32],
    /// Per-environment done code.
    pub done: &'e [DoneCode],
    /// Info mapping.
    pub info: &'e Info,
}

// ── SimEnv ──────────────────────────────────────────────────────

/// A batch of `N` environments sharing one engine.
///
/// # Example
///
/// ```ignore
/// let mut env = SimEnv::new(task, &config, 64, Device::Cpu, false)?;
/// env.reset(None)?;
/// loop {
///     let out = env.step(&action)?;
///     consume(out.obs, out.reward, out.done);
///     let finished = env.done_env_ids();
///     env.reset(Some(&finished))?;
/// }
/// ```
pub struct SimEnv<T: Task> {
    task: T,
    engine: T::Engine,
    buffers: EnvBuffers,
    action_space: Space,
    obs_space: BoxSpace,
    episode_length: f64,
    device: Device,
    visualize: bool,
    state: EnvState,
}

impl<T: Task> SimEnv<T> {
    /// Build the engine, let the task populate it, derive the spaces, and
    /// allocate the buffers.
    ///
    /// `num_envs` is the requested batch size; the batch actually used is
    /// the engine's [`Engine::num_envs`] after it is built.
    ///
    /// Stages run in a fixed order and the first failure aborts
    /// construction; the partially built engine is dropped.
    ///
    /// # Errors
    ///
    /// [`EnvError::EmptyBatch`] for `num_envs == 0` or an engine that
    /// provisions no environments, [`EnvError::Config`]
    /// for a missing or invalid `env`/`engine` section, and whatever the
    /// engine or task hooks return. With `visualize` set, a task that does
    /// not override [`Task::init_camera`] fails with
    /// [`EnvError::NotImplemented`].
    pub fn new(
        mut task: T,
        config: &Config,
        num_envs: usize,
        device: Device,
        visualize: bool,
    ) -> Result<Self, EnvError> {
        if num_envs == 0 {
            return Err(EnvError::EmptyBatch);
        }
        let env_config = config.env_config()?;
        let engine_config = config.engine_config()?;

        info!(task = task.name(), num_envs, %device, visualize, "building engine");
        let mut engine = <T::Engine as Engine>::build(&engine_config, num_envs, device, visualize)?;
        debug!(engine = engine.name(), timestep = engine.timestep(), "engine built");

        // The batch is whatever the engine provisioned.
        let num_envs = engine.num_envs();
        if num_envs == 0 {
            return Err(EnvError::EmptyBatch);
        }

        info!(num_envs, "building environments");
        task.build_envs(&mut engine, config, num_envs)?;
        engine.initialize_sim()?;

        info!("building action space");
        let action_space = task.build_action_space(&engine)?;

        info!("building simulation tensors");
        task.build_sim_tensors(&engine, config)?;

        info!("building data buffers");
        let obs_space = build_observation_space(&task, &engine)?;
        let buffers = EnvBuffers::allocate(num_envs, device, Some(&obs_space))?;

        if visualize {
            info!("initializing camera");
            task.init_camera(&mut engine)?;
        }

        Ok(Self {
            task,
            engine,
            buffers,
            action_space,
            obs_space,
            episode_length: env_config.episode_length,
            device,
            visualize,
            state: EnvState::Ready,
        })
    }

    /// Reset the whole batch (`None`) or the listed environments.
    ///
    /// Counters and done codes of the listed environments are zeroed, the
    /// task resets them, the engine is resynchronised, and their
    /// observation rows and info entries are refreshed. Every other
    /// environment is left untouched. An empty list changes nothing but
    /// still resynchronises the engine.
    ///
    /// # Errors
    ///
    /// [`EnvError::InvalidEnvId`] (before anything is mutated), or the
    /// first failure of a hook or the engine.
    pub fn reset(&mut self, env_ids: Option<&[usize]>) -> Result<(&Tensor, &Info), EnvError> {
        let all: Vec<usize>;
        let ids: &[usize] = match env_ids {
            None => {
                all = (0..self.num_envs()).collect();
                &all
            }
            Some(ids) => {
                self.buffers.check_ids(ids)?;
                ids
            }
        };

        if !ids.is_empty() {
            trace!(count = ids.len(), "reset_envs");
            self.buffers.reset_envs(ids);
            let (task, mut ctx) = self.hooks();
            task.reset_envs(&mut ctx, ids)?;
        }

        self.engine.update_sim_state()?;

        if !ids.is_empty() {
            self.update_observations(env_ids)?;
            let (task, mut ctx) = self.hooks();
            task.update_info(&mut ctx, env_ids)?;
            self.state = EnvState::Reset;
        }

        Ok((self.buffers.obs(), self.buffers.info()))
    }

    /// Apply `action`, advance the engine one timestep, and recompute
    /// observations, info, rewards, and done codes for the whole batch.
    ///
    /// Renders when visualizing or when the engine is recording video.
    /// Environments that finish are not reset.
    ///
    /// # Errors
    ///
    /// [`EnvError::NotReset`] before the first reset, otherwise the first
    /// failure of a hook or the engine. Buffers may be partially updated
    /// after a failure.
    pub fn step(&mut self, action: &T::Action) -> Result<StepOutput<'_>, EnvError> {
        if self.state == EnvState::Ready {
            return Err(EnvError::NotReset);
        }

        trace!("apply_action");
        self.task.apply_action(&mut self.engine, action)?;
        trace!("engine step");
        self.engine.step()?;

        if self.visualize || self.engine.video_recording_enabled() {
            self.render()?;
        }

        self.post_physics_step()?;
        self.state = EnvState::Stepping;

        Ok(StepOutput {
            obs: self.buffers.obs(),
            reward: self.buffers.rewards(),
            done: self.buffers.done(),
            info: self.buffers.info(),
        })
    }

    /// Probe the observation space again from current simulation state.
    ///
    /// Has no side effects on the simulation or the buffers.
    pub fn get_obs_space(&self) -> Result<BoxSpace, EnvError> {
        build_observation_space(&self.task, &self.engine)
    }

    /// Observation space probed at construction.
    pub fn obs_space(&self) -> &BoxSpace {
        &self.obs_space
    }

    /// Action space built at construction.
    pub fn action_space(&self) -> &Space {
        &self.action_space
    }

    /// Batch size, as provisioned by the engine.
    pub fn num_envs(&self) -> usize {
        self.engine.num_envs()
    }

    /// Elapsed episode time for the whole batch or the listed environments.
    pub fn env_time(&self, env_ids: Option<&[usize]>) -> Result<Vec<f64>, EnvError> {
        self.buffers.env_time(env_ids)
    }

    /// Indices whose done code is set.
    pub fn done_env_ids(&self) -> Vec<usize> {
        self.buffers
            .done()
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_done())
            .map(|(i, _)| i)
            .collect()
    }

    /// Observation buffer.
    pub fn obs(&self) -> &Tensor {
        self.buffers.obs()
    }

    /// Reward buffer.
    pub fn rewards(&self) -> &[f32] {
        self.buffers.rewards()
    }

    /// Done codes.
    pub fn done(&self) -> &[DoneCode] {
        self.buffers.done()
    }

    /// Steps since each environment's last reset.
    pub fn timesteps(&self) -> &[u64] {
        self.buffers.timesteps()
    }

    /// Info mapping.
    pub fn info(&self) -> &Info {
        self.buffers.info()
    }

    /// All buffers.
    pub fn buffers(&self) -> &EnvBuffers {
        &self.buffers
    }

    /// Episode length in seconds.
    pub fn episode_length(&self) -> f64 {
        self.episode_length
    }

    /// Whether a viewer was requested.
    pub fn visualize(&self) -> bool {
        self.visualize
    }

    /// Device passed at construction.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EnvState {
        self.state
    }

    /// The task.
    pub fn task(&self) -> &T {
        &self.task
    }

    /// The engine.
    pub fn engine(&self) -> &T::Engine {
        &self.engine
    }

    /// Shut down the engine and drop the environment.
    pub fn close(mut self) -> Result<(), EnvError> {
        debug!(engine = self.engine.name(), "closing engine");
        self.engine.close()?;
        Ok(())
    }

    // ── internals ───────────────────────────────────────────────

    fn hooks(&mut self) -> (&mut T, EnvContext<'_, T::Engine>) {
        (
            &mut self.task,
            EnvContext::new(&mut self.engine, &mut self.buffers, self.episode_length),
        )
    }

    fn update_observations(&mut self, env_ids: Option<&[usize]>) -> Result<(), EnvError> {
        let obs = self.task.compute_obs(&self.engine, env_ids)?;
        self.buffers.write_obs(env_ids, &obs)
    }

    fn render(&mut self) -> Result<(), EnvError> {
        trace!("render");
        self.task.update_camera(&mut self.engine)?;
        self.engine.render()?;
        Ok(())
    }

    fn post_physics_step(&mut self) -> Result<(), EnvError> {
        let dt = self.engine.timestep();
        self.buffers.advance_time(dt);

        let (task, mut ctx) = self.hooks();
        trace!("update_misc");
        task.update_misc(&mut ctx)?;

        trace!("update_observations");
        self.update_observations(None)?;

        let (task, mut ctx) = self.hooks();
        trace!("update_info");
        task.update_info(&mut ctx, None)?;
        trace!("update_reward");
        task.update_reward(&mut ctx)?;
        trace!("update_done");
        task.update_done(&mut ctx)?;
        Ok(())
    }
}

impl<T: Task> std::fmt::Debug for SimEnv<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv")
            .field("task", &self.task.name())
            .field("engine", &self.engine.name())
            .field("num_envs", &self.num_envs())
            .field("state", &self.state)
            .field("visualize", &self.visualize)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tandem_core::{DType, SpaceDtype};
    use tandem_test_utils::MockEngine;

    /// Observation row is `[engine value, timestep]`; rewards are the
    /// engine value; done after three steps. Records hook calls into the
    /// engine's trace.
    struct Probe {
        camera: bool,
    }

    impl Task for Probe {
        type Engine = MockEngine;
        type Action = [f32];

        fn name(&self) -> &str {
            "probe"
        }
        fn build_envs(&mut self, engine: &mut MockEngine, _: &Config, _: usize) -> Result<(), EnvError> {
            engine.note("build_envs");
            Ok(())
        }
        fn build_action_space(&self, engine: &MockEngine) -> Result<Space, EnvError> {
            engine.note("build_action_space");
            Ok(BoxSpace::uniform(-1.0, 1.0, &[1], SpaceDtype::Float32)?.into())
        }
        fn build_sim_tensors(&mut self, engine: &MockEngine, _: &Config) -> Result<(), EnvError> {
            engine.note("build_sim_tensors");
            Ok(())
        }
        fn init_camera(&mut self, engine: &mut MockEngine) -> Result<(), EnvError> {
            if !self.camera {
                return Err(EnvError::NotImplemented {
                    hook: "init_camera",
                });
            }
            engine.note("init_camera");
            Ok(())
        }
        fn apply_action(&mut self, engine: &mut MockEngine, action: &[f32]) -> Result<(), EnvError> {
            engine.note("apply_action");
            for (i, a) in action.iter().enumerate() {
                engine.set_rate(i, *a as f64)?;
            }
            Ok(())
        }
        fn compute_obs(&self, engine: &MockEngine, env_ids: Option<&[usize]>) -> Result<Tensor, EnvError> {
            engine.note("compute_obs");
            let ids: Vec<usize> = match env_ids {
                Some(ids) => ids.to_vec(),
                None => (0..engine.num_envs()).collect(),
            };
            let mut data = Vec::with_capacity(ids.len() * 2);
            for &i in &ids {
                data.push(engine.value(i) as f32);
                data.push(engine.steps() as f32);
            }
            Ok(Tensor::from_f32(&[ids.len(), 2], data)?)
        }
        fn reset_envs(&mut self, ctx: &mut EnvContext<'_, MockEngine>, env_ids: &[usize]) -> Result<(), EnvError> {
            ctx.engine().note("reset_envs");
            for &i in env_ids {
                ctx.engine_mut().set_value(i, 0.0)?;
            }
            Ok(())
        }
        fn update_misc(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
            ctx.engine().note("update_misc");
            Ok(())
        }
        fn update_info(
            &mut self,
            ctx: &mut EnvContext<'_, MockEngine>,
            _: Option<&[usize]>,
        ) -> Result<(), EnvError> {
            ctx.engine().note("update_info");
            Ok(())
        }
        fn update_reward(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
            ctx.engine().note("update_reward");
            let (engine, out) = ctx.outputs();
            for (i, r) in out.rewards.iter_mut().enumerate() {
                *r = engine.value(i) as f32;
            }
            Ok(())
        }
        fn update_done(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
            ctx.engine().note("update_done");
            let (_, out) = ctx.outputs();
            for (d, t) in out.done.iter_mut().zip(out.timesteps) {
                *d = if *t >= 3 { DoneCode(1) } else { DoneCode::NULL };
            }
            Ok(())
        }
        fn update_camera(&mut self, engine: &mut MockEngine) -> Result<(), EnvError> {
            engine.note("update_camera");
            Ok(())
        }
    }

    fn config() -> Config {
        Config::from_value(json!({
            "env": { "episode_length": 1.0 },
            "engine": { "timestep": 0.25 }
        }))
        .unwrap()
    }

    fn env(n: usize, visualize: bool) -> SimEnv<Probe> {
        SimEnv::new(Probe { camera: true }, &config(), n, Device::Cpu, visualize).unwrap()
    }

    #[test]
    fn construction_runs_stages_in_order() {
        let env = env(2, true);
        assert_eq!(
            env.engine().take_trace(),
            vec![
                "build",
                "build_envs",
                "initialize_sim",
                "build_action_space",
                "build_sim_tensors",
                "compute_obs",
                "init_camera",
            ]
        );
        assert_eq!(env.state(), EnvState::Ready);
        assert_eq!(env.obs().shape(), &[2, 2]);
        assert_eq!(env.obs().dtype(), DType::F32);
        assert_eq!(env.obs_space().shape(), &[2]);
    }

    #[test]
    fn zero_envs_is_rejected() {
        let err = SimEnv::new(Probe { camera: false }, &config(), 0, Device::Cpu, false).unwrap_err();
        assert_eq!(err, EnvError::EmptyBatch);
    }

    #[test]
    fn missing_camera_fails_only_when_visualizing() {
        let headless = SimEnv::new(Probe { camera: false }, &config(), 1, Device::Cpu, false);
        assert!(headless.is_ok());
        let err = SimEnv::new(Probe { camera: false }, &config(), 1, Device::Cpu, true).unwrap_err();
        assert_eq!(
            err,
            EnvError::NotImplemented {
                hook: "init_camera"
            }
        );
    }

    #[test]
    fn step_before_reset_is_refused() {
        let mut env = env(2, false);
        assert_eq!(env.step(&[0.0, 0.0]).unwrap_err(), EnvError::NotReset);
        assert_eq!(env.engine().calls().step, 0);
    }

    #[test]
    fn reset_then_step_hook_order() {
        let mut env = env(2, true);
        env.reset(None).unwrap();
        env.engine().take_trace();
        env.step(&[1.0, 1.0]).unwrap();
        assert_eq!(
            env.engine().take_trace(),
            vec![
                "apply_action",
                "step",
                "update_camera",
                "render",
                "update_misc",
                "compute_obs",
                "update_info",
                "update_reward",
                "update_done",
            ]
        );
        assert_eq!(env.state(), EnvState::Stepping);
    }

    #[test]
    fn reset_hook_order() {
        let mut env = env(3, false);
        env.engine().take_trace();
        env.reset(Some(&[2])).unwrap();
        assert_eq!(
            env.engine().take_trace(),
            vec!["reset_envs", "update_sim_state", "compute_obs", "update_info"]
        );
        assert_eq!(env.state(), EnvState::Reset);
    }

    #[test]
    fn empty_reset_only_syncs_engine() {
        let mut env = env(2, false);
        env.engine().take_trace();
        let (obs, info) = env.reset(Some(&[])).unwrap();
        assert_eq!(obs, &Tensor::zeros(&[2, 2], DType::F32));
        assert!(info.is_empty());
        assert_eq!(env.engine().take_trace(), vec!["update_sim_state"]);
        assert_eq!(env.state(), EnvState::Ready);
    }

    #[test]
    fn invalid_reset_id_mutates_nothing() {
        let mut env = env(2, false);
        env.reset(None).unwrap();
        env.step(&[1.0, 1.0]).unwrap();
        let before = env.buffers().clone();
        let calls = env.engine().calls();
        assert_eq!(
            env.reset(Some(&[0, 5])).unwrap_err(),
            EnvError::InvalidEnvId {
                env_id: 5,
                num_envs: 2
            }
        );
        assert_eq!(env.buffers(), &before);
        assert_eq!(env.engine().calls(), calls);
    }

    #[test]
    fn done_env_ids_feed_partial_reset() {
        let mut env = env(2, false);
        env.reset(None).unwrap();
        for _ in 0..3 {
            env.step(&[0.5, 0.5]).unwrap();
        }
        assert_eq!(env.done_env_ids(), vec![0, 1]);
        env.reset(Some(&[1])).unwrap();
        assert_eq!(env.done_env_ids(), vec![0]);
        assert_eq!(env.timesteps(), &[3, 0]);
        assert_eq!(env.env_time(None).unwrap(), vec![0.75, 0.0]);
    }

    #[test]
    fn get_obs_space_reprobes_without_side_effects() {
        let env = env(2, false);
        let before = env.buffers().clone();
        let a = env.get_obs_space().unwrap();
        let b = env.get_obs_space().unwrap();
        assert_eq!(a, b);
        assert_eq!(&a, env.obs_space());
        assert_eq!(env.buffers(), &before);
    }

    #[test]
    fn close_shuts_down_engine() {
        let env = env(1, false);
        let calls = env.engine().calls_handle();
        env.close().unwrap();
        assert_eq!(calls.snapshot().close, 1);
    }

    #[test]
    fn debug_names_task_and_state() {
        let s = format!("{:?}", env(1, false));
        assert!(s.contains("probe"));
        assert!(s.contains("Ready"));
    }
}
