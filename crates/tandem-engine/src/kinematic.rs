//! Reference CPU engine: batched 2D point bodies.
//!
//! [`KinematicEngine`] integrates point masses with semi-implicit Euler
//! sub-steps. It exists so the environment core can be driven end to end
//! without a GPU physics backend; it is not a physics simulator.
//!
//! # Layout
//!
//! Bodies are registered per environment with
//! [`add_body`](KinematicEngine::add_body) before
//! [`initialize_sim`](Engine::initialize_sim). Initialization flattens
//! them into contiguous arrays indexed through a per-environment offset
//! table, so a step is a single pass over all bodies of all environments.
//!
//! # State writes
//!
//! [`set_body`](KinematicEngine::set_body) stages a write. Staged writes
//! become visible on the next [`update_sim_state`](Engine::update_sim_state)
//! or [`step`](Engine::step).

use serde::Deserialize;
use tracing::debug;

use tandem_core::{ConfigError, Device, EngineConfig};

use crate::engine::Engine;
use crate::error::EngineError;

/// Name under which this engine is selected in `engine.engine_name`.
pub const KINEMATIC_ENGINE_NAME: &str = "kinematic";

/// Settings read from the `engine` config section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// Must be [`KINEMATIC_ENGINE_NAME`].
    pub engine_name: String,
    /// Seconds per control step.
    pub timestep: f64,
    /// Integration sub-steps per control step.
    pub substeps: u32,
    /// Constant acceleration applied to every body.
    pub gravity: [f32; 2],
    /// Linear velocity damping per second.
    pub damping: f32,
    /// Render every step for video capture.
    pub record_video: bool,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            engine_name: String::new(),
            timestep: 1.0 / 30.0,
            substeps: 1,
            gravity: [0.0, 0.0],
            damping: 0.0,
            record_video: false,
        }
    }
}

impl KinematicConfig {
    /// Parse and validate the `engine` section.
    pub fn from_engine_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let section = config.section();
        if !section.contains("engine_name") {
            return Err(ConfigError::MissingKey {
                key: section.path("engine_name"),
            }
            .into());
        }
        let parsed: Self = section.deserialize()?;
        if parsed.engine_name != KINEMATIC_ENGINE_NAME {
            return Err(EngineError::UnknownEngine {
                name: parsed.engine_name,
            });
        }
        if !parsed.timestep.is_finite() || parsed.timestep <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: section.path("timestep"),
                reason: format!("must be finite and positive, got {}", parsed.timestep),
            }
            .into());
        }
        if parsed.substeps == 0 {
            return Err(ConfigError::InvalidValue {
                key: section.path("substeps"),
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if !parsed.damping.is_finite() || parsed.damping < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: section.path("damping"),
                reason: format!("must be finite and >= 0, got {}", parsed.damping),
            }
            .into());
        }
        Ok(parsed)
    }
}

/// Position and velocity of one body.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyState {
    /// Position in world units.
    pub position: [f32; 2],
    /// Velocity in world units per second.
    pub velocity: [f32; 2],
}

/// A point body to register with [`KinematicEngine::add_body`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Mass; must be positive.
    pub mass: f32,
    /// Initial state.
    pub state: BodyState,
}

/// Viewer camera pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: [f32; 3],
    /// Look-at point.
    pub target: [f32; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [0.0, -5.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

/// Batched point-body engine. See the [module docs](self).
#[derive(Debug)]
pub struct KinematicEngine {
    config: KinematicConfig,
    num_envs: usize,
    visualize: bool,
    // Registration staging, drained by initialize_sim.
    pending_bodies: Vec<Vec<Body>>,
    // offsets[e]..offsets[e + 1] are env e's bodies.
    offsets: Vec<usize>,
    positions: Vec<[f32; 2]>,
    velocities: Vec<[f32; 2]>,
    inv_mass: Vec<f32>,
    forces: Vec<[f32; 2]>,
    staged: Vec<(usize, BodyState)>,
    camera: Camera,
    initialized: bool,
    closed: bool,
    steps_taken: u64,
    frames_rendered: u64,
    syncs: u64,
}

impl KinematicEngine {
    /// Register a body in environment `env`. Returns its index within
    /// that environment.
    pub fn add_body(&mut self, env: usize, body: Body) -> Result<usize, EngineError> {
        self.check_open()?;
        if self.initialized {
            return Err(EngineError::SimInitialized);
        }
        self.check_env(env)?;
        if !(body.mass > 0.0) || !body.mass.is_finite() {
            return Err(EngineError::Backend {
                reason: format!("body mass must be finite and positive, got {}", body.mass),
            });
        }
        let bodies = &mut self.pending_bodies[env];
        bodies.push(body);
        Ok(bodies.len() - 1)
    }

    /// Number of bodies in environment `env`.
    pub fn body_count(&self, env: usize) -> Result<usize, EngineError> {
        self.check_env(env)?;
        if self.initialized {
            Ok(self.offsets[env + 1] - self.offsets[env])
        } else {
            Ok(self.pending_bodies[env].len())
        }
    }

    /// Live state of a body.
    pub fn body(&self, env: usize, body: usize) -> Result<BodyState, EngineError> {
        let i = self.flat_index(env, body)?;
        Ok(BodyState {
            position: self.positions[i],
            velocity: self.velocities[i],
        })
    }

    /// Stage a state write for a body.
    pub fn set_body(&mut self, env: usize, body: usize, state: BodyState) -> Result<(), EngineError> {
        self.check_open()?;
        let i = self.flat_index(env, body)?;
        self.staged.push((i, state));
        Ok(())
    }

    /// Accumulate a force on a body for the next step.
    pub fn apply_force(&mut self, env: usize, body: usize, force: [f32; 2]) -> Result<(), EngineError> {
        self.check_open()?;
        let i = self.flat_index(env, body)?;
        self.forces[i][0] += force[0];
        self.forces[i][1] += force[1];
        Ok(())
    }

    /// Current camera pose.
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Whether the engine was built with a viewer.
    pub fn visualize(&self) -> bool {
        self.visualize
    }

    /// The validated settings.
    pub fn config(&self) -> &KinematicConfig {
        &self.config
    }

    /// Steps taken since construction.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Frames rendered since construction.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// `update_sim_state` calls since construction.
    pub fn syncs(&self) -> u64 {
        self.syncs
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn flush_staged(&mut self) {
        for (i, state) in self.staged.drain(..) {
            self.positions[i] = state.position;
            self.velocities[i] = state.velocity;
        }
    }

    fn check_open(&self) -> Result<(), EngineError> {
        if self.closed {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_initialized(&self) -> Result<(), EngineError> {
        self.check_open()?;
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::SimNotInitialized)
        }
    }

    fn check_env(&self, env: usize) -> Result<(), EngineError> {
        if env < self.num_envs {
            Ok(())
        } else {
            Err(EngineError::InvalidEnv {
                env,
                num_envs: self.num_envs,
            })
        }
    }

    fn flat_index(&self, env: usize, body: usize) -> Result<usize, EngineError> {
        self.check_initialized()?;
        self.check_env(env)?;
        let (start, end) = (self.offsets[env], self.offsets[env + 1]);
        if start + body < end {
            Ok(start + body)
        } else {
            Err(EngineError::InvalidBody { env, body })
        }
    }
}

impl Engine for KinematicEngine {
    fn build(
        config: &EngineConfig,
        num_envs: usize,
        device: Device,
        visualize: bool,
    ) -> Result<Self, EngineError> {
        let config = KinematicConfig::from_engine_config(config)?;
        if !device.is_cpu() {
            return Err(EngineError::UnsupportedDevice { device });
        }
        if num_envs == 0 {
            return Err(EngineError::NoEnvs);
        }
        debug!(
            num_envs,
            timestep = config.timestep,
            substeps = config.substeps,
            visualize,
            "kinematic engine built"
        );
        Ok(Self {
            config,
            num_envs,
            visualize,
            pending_bodies: vec![Vec::new(); num_envs],
            offsets: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            inv_mass: Vec::new(),
            forces: Vec::new(),
            staged: Vec::new(),
            camera: Camera::default(),
            initialized: false,
            closed: false,
            steps_taken: 0,
            frames_rendered: 0,
            syncs: 0,
        })
    }

    fn name(&self) -> &str {
        KINEMATIC_ENGINE_NAME
    }

    fn initialize_sim(&mut self) -> Result<(), EngineError> {
        self.check_open()?;
        if self.initialized {
            return Err(EngineError::SimInitialized);
        }
        if let Some(env) = self.pending_bodies.iter().position(Vec::is_empty) {
            return Err(EngineError::EmptyEnv { env });
        }

        let total: usize = self.pending_bodies.iter().map(Vec::len).sum();
        self.offsets = Vec::with_capacity(self.num_envs + 1);
        self.positions = Vec::with_capacity(total);
        self.velocities = Vec::with_capacity(total);
        self.inv_mass = Vec::with_capacity(total);
        self.offsets.push(0);
        for bodies in self.pending_bodies.drain(..) {
            for body in bodies {
                self.positions.push(body.state.position);
                self.velocities.push(body.state.velocity);
                self.inv_mass.push(1.0 / body.mass);
            }
            self.offsets.push(self.positions.len());
        }
        self.forces = vec![[0.0; 2]; total];
        self.initialized = true;
        debug!(bodies = total, "kinematic sim initialized");
        Ok(())
    }

    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn timestep(&self) -> f64 {
        self.config.timestep
    }

    fn update_sim_state(&mut self) -> Result<(), EngineError> {
        self.check_initialized()?;
        self.flush_staged();
        self.syncs += 1;
        Ok(())
    }

    fn step(&mut self) -> Result<(), EngineError> {
        self.check_initialized()?;
        self.flush_staged();

        let h = (self.config.timestep / self.config.substeps as f64) as f32;
        let [gx, gy] = self.config.gravity;
        let keep = (1.0 - self.config.damping * h).max(0.0);
        for _ in 0..self.config.substeps {
            for i in 0..self.positions.len() {
                let [fx, fy] = self.forces[i];
                let w = self.inv_mass[i];
                let v = &mut self.velocities[i];
                v[0] = (v[0] + h * (fx * w + gx)) * keep;
                v[1] = (v[1] + h * (fy * w + gy)) * keep;
                let p = &mut self.positions[i];
                p[0] += h * v[0];
                p[1] += h * v[1];
            }
        }
        self.forces.iter_mut().for_each(|f| *f = [0.0; 2]);
        self.steps_taken += 1;
        Ok(())
    }

    fn render(&mut self) -> Result<(), EngineError> {
        self.check_initialized()?;
        self.frames_rendered += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.check_open()?;
        self.closed = true;
        debug!(
            steps = self.steps_taken,
            frames = self.frames_rendered,
            "kinematic engine closed"
        );
        Ok(())
    }

    fn video_recording_enabled(&self) -> bool {
        self.config.record_video
    }

    fn set_camera_pose(&mut self, position: [f32; 3], target: [f32; 3]) -> Result<(), EngineError> {
        self.check_open()?;
        self.camera = Camera { position, target };
        Ok(())
    }
}
