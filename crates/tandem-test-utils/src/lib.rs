//! Test utilities and mock types for Tandem development.
//!
//! [`MockEngine`] implements the engine contract over one scalar per
//! environment and records every call, so tests can assert on counts and
//! on the exact order of engine and hook calls. Task fixtures live in
//! [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::{Arc, Mutex, MutexGuard};

use tandem_core::{Device, EngineConfig};
use tandem_engine::{Engine, EngineError};

pub use fixtures::CounterTask;

/// Per-method call counts of a [`MockEngine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineCalls {
    pub initialize_sim: usize,
    pub update_sim_state: usize,
    pub step: usize,
    pub render: usize,
    pub close: usize,
    pub camera: usize,
}

#[derive(Debug, Default)]
struct Log {
    calls: EngineCalls,
    trace: Vec<&'static str>,
}

/// Shared handle on a [`MockEngine`]'s call log. Survives the engine, so
/// calls made by `close` can still be inspected.
#[derive(Clone, Debug)]
pub struct CallLog(Arc<Mutex<Log>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Log> {
        match self.0.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current call counts.
    pub fn snapshot(&self) -> EngineCalls {
        self.lock().calls
    }

    /// Drain the ordered call trace.
    pub fn take_trace(&self) -> Vec<&'static str> {
        std::mem::take(&mut self.lock().trace)
    }
}

/// Scalar-per-environment engine for exercising the environment core.
///
/// Each environment holds a `value` that grows by `rate * timestep` on
/// every step. Engine config keys:
///
/// - `timestep` (default `0.1`)
/// - `record_video` (default `false`)
/// - `fail_on_step`: the n-th call to `step` (1-based) fails with
///   [`EngineError::Backend`].
/// - `extra_envs` (default `0`): provision this many environments beyond
///   the requested count.
#[derive(Debug)]
pub struct MockEngine {
    num_envs: usize,
    timestep: f64,
    record_video: bool,
    fail_on_step: Option<u64>,
    visualize: bool,
    values: Vec<f64>,
    rates: Vec<f64>,
    steps: u64,
    camera: Option<([f32; 3], [f32; 3])>,
    log: CallLog,
}

impl MockEngine {
    /// An engine with default settings, as if built headless on the CPU.
    pub fn with_envs(num_envs: usize) -> Self {
        Self {
            num_envs,
            timestep: 0.1,
            record_video: false,
            fail_on_step: None,
            visualize: false,
            values: vec![0.0; num_envs],
            rates: vec![0.0; num_envs],
            steps: 0,
            camera: None,
            log: CallLog(Arc::new(Mutex::new(Log::default()))),
        }
    }

    /// Append `event` to the call trace. Tasks use this to interleave
    /// their hook calls with engine calls.
    pub fn note(&self, event: &'static str) {
        self.log.lock().trace.push(event);
    }

    /// Drain the ordered call trace.
    pub fn take_trace(&self) -> Vec<&'static str> {
        self.log.take_trace()
    }

    /// Current call counts.
    pub fn calls(&self) -> EngineCalls {
        self.log.snapshot()
    }

    /// A handle that outlives the engine.
    pub fn calls_handle(&self) -> CallLog {
        self.log.clone()
    }

    /// Steps taken since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current value of environment `env`.
    pub fn value(&self, env: usize) -> f64 {
        self.values[env]
    }

    /// Overwrite the value of environment `env`.
    pub fn set_value(&mut self, env: usize, value: f64) -> Result<(), EngineError> {
        self.check_env(env)?;
        self.values[env] = value;
        Ok(())
    }

    /// Per-step growth rate of environment `env`.
    pub fn set_rate(&mut self, env: usize, rate: f64) -> Result<(), EngineError> {
        self.check_env(env)?;
        self.rates[env] = rate;
        Ok(())
    }

    /// Last camera pose set.
    pub fn camera(&self) -> Option<([f32; 3], [f32; 3])> {
        self.camera
    }

    pub fn visualize(&self) -> bool {
        self.visualize
    }

    fn check_env(&self, env: usize) -> Result<(), EngineError> {
        if env >= self.num_envs {
            return Err(EngineError::InvalidEnv {
                env,
                num_envs: self.num_envs,
            });
        }
        Ok(())
    }

    fn record(&self, event: &'static str, count: impl FnOnce(&mut EngineCalls)) {
        let mut log = self.log.lock();
        count(&mut log.calls);
        log.trace.push(event);
    }
}

impl Engine for MockEngine {
    fn build(
        config: &EngineConfig,
        num_envs: usize,
        _device: Device,
        visualize: bool,
    ) -> Result<Self, EngineError> {
        let section = config.section();
        let extra = section.get_u64("extra_envs")?.unwrap_or(0) as usize;
        let mut engine = Self::with_envs(num_envs + extra);
        engine.timestep = section.get_f64("timestep")?.unwrap_or(0.1);
        engine.record_video = section.get_bool("record_video")?.unwrap_or(false);
        engine.fail_on_step = section.get_u64("fail_on_step")?;
        engine.visualize = visualize;
        engine.note("build");
        Ok(engine)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn initialize_sim(&mut self) -> Result<(), EngineError> {
        self.record("initialize_sim", |c| c.initialize_sim += 1);
        Ok(())
    }

    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn update_sim_state(&mut self) -> Result<(), EngineError> {
        self.record("update_sim_state", |c| c.update_sim_state += 1);
        Ok(())
    }

    fn step(&mut self) -> Result<(), EngineError> {
        self.record("step", |c| c.step += 1);
        if self.fail_on_step == Some(self.steps + 1) {
            return Err(EngineError::Backend {
                reason: format!("injected failure on step {}", self.steps + 1),
            });
        }
        for (v, r) in self.values.iter_mut().zip(&self.rates) {
            *v += r * self.timestep;
        }
        self.steps += 1;
        Ok(())
    }

    fn render(&mut self) -> Result<(), EngineError> {
        self.record("render", |c| c.render += 1);
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.record("close", |c| c.close += 1);
        Ok(())
    }

    fn video_recording_enabled(&self) -> bool {
        self.record_video
    }

    fn set_camera_pose(&mut self, position: [f32; 3], target: [f32; 3]) -> Result<(), EngineError> {
        self.record("set_camera_pose", |c| c.camera += 1);
        self.camera = Some((position, target));
        Ok(())
    }
}
