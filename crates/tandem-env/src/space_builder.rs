//! Observation space derivation.

use tandem_core::BoxSpace;
use tandem_engine::Engine;

use crate::error::EnvError;
use crate::task::Task;

/// Probe one full-batch observation and describe a single row of it.
///
/// The resulting box is unbounded in every component; its shape is the
/// probe's shape without the batch dimension and its dtype is the probe's
/// element type. Only shared references are taken, so probing twice in a
/// row yields the same descriptor.
///
/// # Errors
///
/// Whatever `compute_obs` returns, or [`EnvError::ProbeShape`] if the
/// probe does not have exactly one row per environment.
pub fn build_observation_space<T: Task>(task: &T, engine: &T::Engine) -> Result<BoxSpace, EnvError> {
    let probe = task.compute_obs(engine, None)?;
    let expected_rows = engine.num_envs();
    if probe.shape().is_empty() || probe.rows() != expected_rows {
        return Err(EnvError::ProbeShape {
            expected_rows,
            actual: probe.shape().to_vec(),
        });
    }
    Ok(BoxSpace::unbounded(
        probe.row_shape(),
        probe.dtype().to_space_dtype(),
    ))
}
