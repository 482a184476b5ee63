//! Reusable task fixtures.
//!
//! [`CounterTask`] drives a [`MockEngine`] and records every hook it
//! receives into the engine's call trace. Builder options switch on a
//! camera, change the observation dtype, or make the observation width
//! drift after a number of calls to provoke shape mismatches.

use std::sync::atomic::{AtomicUsize, Ordering};

use tandem_core::{BoxSpace, Config, DType, DoneCode, Space, SpaceDtype, Tensor, TensorData};
use tandem_engine::Engine;
use tandem_env::{EnvContext, EnvError, Task};

use crate::MockEngine;

/// Done code written by [`CounterTask`] once an episode's time is up.
pub const COUNTER_DONE: DoneCode = DoneCode(1);

/// Observation row `[value, env index, timestep]`; reward 1 per step;
/// done with [`COUNTER_DONE`] once elapsed time reaches the episode
/// length. Actions are per-environment growth rates.
///
/// Info entries: `"value"` (per-env engine value) and `"resets"` (total
/// environments reset so far).
#[derive(Debug)]
pub struct CounterTask {
    obs_dtype: DType,
    camera: bool,
    widen_after: Option<usize>,
    obs_calls: AtomicUsize,
    resets: u64,
}

impl CounterTask {
    pub fn new() -> Self {
        Self {
            obs_dtype: DType::F32,
            camera: false,
            widen_after: None,
            obs_calls: AtomicUsize::new(0),
            resets: 0,
        }
    }

    /// Emit observations with this element type.
    pub fn with_obs_dtype(mut self, dtype: DType) -> Self {
        self.obs_dtype = dtype;
        self
    }

    /// Implement `init_camera` and follow environment 0 when rendering.
    pub fn with_camera(mut self) -> Self {
        self.camera = true;
        self
    }

    /// After `calls` calls to `compute_obs`, add a column to every row.
    pub fn widen_obs_after(mut self, calls: usize) -> Self {
        self.widen_after = Some(calls);
        self
    }

    /// Number of `compute_obs` calls so far, probes included.
    pub fn obs_calls(&self) -> usize {
        self.obs_calls.load(Ordering::SeqCst)
    }

    /// Total environments reset so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    fn follow_pose(engine: &MockEngine) -> ([f32; 3], [f32; 3]) {
        let x = engine.value(0) as f32;
        ([x, -3.0, 2.0], [x, 0.0, 0.0])
    }
}

impl Default for CounterTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for CounterTask {
    type Engine = MockEngine;
    type Action = [f32];

    fn name(&self) -> &str {
        "counter"
    }

    fn build_envs(&mut self, engine: &mut MockEngine, _config: &Config, _num_envs: usize) -> Result<(), EnvError> {
        engine.note("build_envs");
        Ok(())
    }

    fn build_action_space(&self, engine: &MockEngine) -> Result<Space, EnvError> {
        engine.note("build_action_space");
        Ok(BoxSpace::uniform(-10.0, 10.0, &[1], SpaceDtype::Float32)?.into())
    }

    fn build_sim_tensors(&mut self, engine: &MockEngine, _config: &Config) -> Result<(), EnvError> {
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
        let (position, target) = Self::follow_pose(engine);
        engine.set_camera_pose(position, target)?;
        Ok(())
    }

    fn apply_action(&mut self, engine: &mut MockEngine, action: &[f32]) -> Result<(), EnvError> {
        engine.note("apply_action");
        if action.len() != engine.num_envs() {
            return Err(EnvError::InvalidAction {
                reason: format!("expected {} rates, got {}", engine.num_envs(), action.len()),
            });
        }
        for (env, rate) in action.iter().enumerate() {
            engine.set_rate(env, f64::from(*rate))?;
        }
        Ok(())
    }

    fn compute_obs(&self, engine: &MockEngine, env_ids: Option<&[usize]>) -> Result<Tensor, EnvError> {
        engine.note("compute_obs");
        let calls = self.obs_calls.fetch_add(1, Ordering::SeqCst);
        let width = match self.widen_after {
            Some(limit) if calls >= limit => 4,
            _ => 3,
        };

        let ids: Vec<usize> = match env_ids {
            Some(ids) => ids.to_vec(),
            None => (0..engine.num_envs()).collect(),
        };
        let mut row_values = Vec::with_capacity(ids.len() * width);
        for &env in &ids {
            row_values.push(engine.value(env));
            row_values.push(env as f64);
            row_values.push(engine.steps() as f64);
            row_values.resize(row_values.len() + width - 3, 0.0);
        }

        let data = match self.obs_dtype {
            DType::F32 => TensorData::F32(row_values.iter().map(|v| *v as f32).collect()),
            DType::F64 => TensorData::F64(row_values),
            DType::I32 => TensorData::I32(row_values.iter().map(|v| *v as i32).collect()),
            DType::I64 => TensorData::I64(row_values.iter().map(|v| *v as i64).collect()),
            DType::U8 => TensorData::U8(row_values.iter().map(|v| *v as u8).collect()),
        };
        Ok(Tensor::new(&[ids.len(), width], data)?)
    }

    fn reset_envs(&mut self, ctx: &mut EnvContext<'_, MockEngine>, env_ids: &[usize]) -> Result<(), EnvError> {
        ctx.engine().note("reset_envs");
        for &env in env_ids {
            ctx.engine_mut().set_value(env, 0.0)?;
        }
        self.resets += env_ids.len() as u64;
        Ok(())
    }

    fn update_misc(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
        ctx.engine().note("update_misc");
        Ok(())
    }

    fn update_info(
        &mut self,
        ctx: &mut EnvContext<'_, MockEngine>,
        _env_ids: Option<&[usize]>,
    ) -> Result<(), EnvError> {
        ctx.engine().note("update_info");
        let (engine, out) = ctx.outputs();
        let values: Vec<f32> = (0..engine.num_envs()).map(|i| engine.value(i) as f32).collect();
        out.info.insert("value".into(), values.into());
        out.info.insert("resets".into(), self.resets.into());
        Ok(())
    }

    fn update_reward(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
        ctx.engine().note("update_reward");
        ctx.rewards_mut().fill(1.0);
        Ok(())
    }

    fn update_done(&mut self, ctx: &mut EnvContext<'_, MockEngine>) -> Result<(), EnvError> {
        ctx.engine().note("update_done");
        let episode_length = ctx.episode_length();
        let (_, out) = ctx.outputs();
        for (done, time) in out.done.iter_mut().zip(out.time) {
            *done = if *time >= episode_length {
                COUNTER_DONE
            } else {
                DoneCode::NULL
            };
        }
        Ok(())
    }

    fn update_camera(&mut self, engine: &mut MockEngine) -> Result<(), EnvError> {
        engine.note("update_camera");
        if self.camera {
            let (position, target) = Self::follow_pose(engine);
            engine.set_camera_pose(position, target)?;
        }
        Ok(())
    }
}
