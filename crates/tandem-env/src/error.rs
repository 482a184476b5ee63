//! Environment error type.
//!
//! Four classes of failure reach the caller, none of them retried:
//! configuration errors at construction, hooks a task did not implement,
//! engine failures (wrapped unchanged), and shape/dtype mismatches between
//! a task's output and the buffers probed for it.

use std::error::Error;
use std::fmt;

use tandem_core::{ConfigError, SpaceError, TensorError};
use tandem_engine::EngineError;

/// Errors from environment construction, reset, and step.
#[derive(Debug, PartialEq)]
pub enum EnvError {
    /// Missing or invalid configuration.
    Config(ConfigError),
    /// The engine failed; propagated unchanged.
    Engine(EngineError),
    /// A task hook the environment needed is not implemented.
    NotImplemented {
        /// Name of the hook.
        hook: &'static str,
    },
    /// Buffers were allocated before an observation space existed.
    ObsSpaceMissing,
    /// The probe observation does not have one row per environment.
    ProbeShape {
        /// Expected leading dimension (the batch size).
        expected_rows: usize,
        /// Shape the task actually returned.
        actual: Vec<usize>,
    },
    /// A tensor written into a buffer had the wrong shape or dtype.
    Tensor(TensorError),
    /// A space descriptor could not be built.
    Space(SpaceError),
    /// An environment index is out of range.
    InvalidEnvId {
        /// The offending index.
        env_id: usize,
        /// Batch size.
        num_envs: usize,
    },
    /// The batch has no environments.
    EmptyBatch,
    /// `step` was called before the first `reset`.
    NotReset,
    /// The action does not fit the action space.
    InvalidAction {
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Engine(e) => write!(f, "engine: {e}"),
            Self::NotImplemented { hook } => write!(f, "task does not implement '{hook}'"),
            Self::ObsSpaceMissing => {
                write!(f, "observation space must be built before data buffers")
            }
            Self::ProbeShape {
                expected_rows,
                actual,
            } => write!(
                f,
                "probe observation has shape {actual:?}, expected {expected_rows} rows"
            ),
            Self::Tensor(e) => write!(f, "buffer write: {e}"),
            Self::Space(e) => write!(f, "space: {e}"),
            Self::InvalidEnvId { env_id, num_envs } => {
                write!(f, "env id {env_id} out of range (num_envs={num_envs})")
            }
            Self::EmptyBatch => write!(f, "environment batch is empty"),
            Self::NotReset => write!(f, "step called before reset"),
            Self::InvalidAction { reason } => write!(f, "invalid action: {reason}"),
        }
    }
}

impl Error for EnvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Engine(e) => Some(e),
            Self::Tensor(e) => Some(e),
            Self::Space(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EnvError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<EngineError> for EnvError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

impl From<TensorError> for EnvError {
    fn from(e: TensorError) -> Self {
        Self::Tensor(e)
    }
}

impl From<SpaceError> for EnvError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}
