//! The [`Engine`] trait: the boundary between the environment core and a
//! physics/rendering backend.

use tandem_core::{Device, EngineConfig};

use crate::error::EngineError;

/// A batched physics/rendering backend.
///
/// # Contract
///
/// - Every method is synchronous: when it returns, its effects are
///   visible to the next read, even if the backend runs on a device.
/// - `num_envs()` is fixed from `build` until the engine is dropped.
/// - `timestep()` is the simulated time advanced by one `step()`, in
///   seconds.
/// - Errors are returned, never retried; the caller decides what to do.
///
/// Engines own all simulation state. The environment core never writes it
/// directly; tasks do, through the engine's own API.
///
/// # Examples
///
/// ```
/// use tandem_core::{Device, EngineConfig};
/// use tandem_engine::{Engine, EngineError};
///
/// struct Idle { n: usize }
///
/// impl Engine for Idle {
///     fn build(_: &EngineConfig, n: usize, _: Device, _: bool) -> Result<Self, EngineError> {
///         Ok(Idle { n })
///     }
///     fn name(&self) -> &str { "idle" }
///     fn initialize_sim(&mut self) -> Result<(), EngineError> { Ok(()) }
///     fn num_envs(&self) -> usize { self.n }
///     fn timestep(&self) -> f64 { 0.01 }
///     fn update_sim_state(&mut self) -> Result<(), EngineError> { Ok(()) }
///     fn step(&mut self) -> Result<(), EngineError> { Ok(()) }
///     fn render(&mut self) -> Result<(), EngineError> { Ok(()) }
///     fn close(&mut self) -> Result<(), EngineError> { Ok(()) }
/// }
///
/// let cfg = EngineConfig(tandem_core::Section::new("engine", Default::default()));
/// let e = Idle::build(&cfg, 8, Device::Cpu, false).unwrap();
/// assert_eq!(e.num_envs(), 8);
/// assert!(!e.video_recording_enabled());
/// ```
pub trait Engine: Send + 'static {
    /// Construct the engine for `num_envs` environments.
    fn build(
        config: &EngineConfig,
        num_envs: usize,
        device: Device,
        visualize: bool,
    ) -> Result<Self, EngineError>
    where
        Self: Sized;

    /// Backend name for logs and errors.
    fn name(&self) -> &str;

    /// Finalize the simulation after all environments registered their
    /// entities.
    fn initialize_sim(&mut self) -> Result<(), EngineError>;

    /// Number of environments in the batch.
    fn num_envs(&self) -> usize;

    /// Seconds of simulated time per [`step`](Engine::step).
    fn timestep(&self) -> f64;

    /// Push any staged state writes into the live simulation.
    fn update_sim_state(&mut self) -> Result<(), EngineError>;

    /// Advance every environment by one timestep.
    fn step(&mut self) -> Result<(), EngineError>;

    /// Draw the current state.
    fn render(&mut self) -> Result<(), EngineError>;

    /// Release backend resources.
    fn close(&mut self) -> Result<(), EngineError>;

    /// Whether a video recorder is capturing frames. Rendering happens
    /// every step while this is set, even without a viewer.
    fn video_recording_enabled(&self) -> bool {
        false
    }

    /// Point the viewer camera. Backends without a camera ignore it.
    fn set_camera_pose(&mut self, position: [f32; 3], target: [f32; 3]) -> Result<(), EngineError> {
        let _ = (position, target);
        Ok(())
    }
}
