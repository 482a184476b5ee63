//! Engine error type.

use std::error::Error;
use std::fmt;

use tandem_core::{ConfigError, Device};

/// Errors raised by an engine during build, stepping, or rendering.
///
/// The environment core never recovers from these; they propagate to the
/// caller unchanged.
#[derive(Debug, PartialEq)]
pub enum EngineError {
    /// The `engine` config section is unusable.
    Config(ConfigError),
    /// `engine.engine_name` names an engine this builder does not provide.
    UnknownEngine {
        /// The requested name.
        name: String,
    },
    /// The engine cannot run on the requested device.
    UnsupportedDevice {
        /// The requested device.
        device: Device,
    },
    /// The batch must contain at least one environment.
    NoEnvs,
    /// An operation that is only legal before `initialize_sim` was
    /// called afterwards.
    SimInitialized,
    /// An operation that needs an initialized simulation was called
    /// before `initialize_sim`.
    SimNotInitialized,
    /// An environment index is out of range.
    InvalidEnv {
        /// The requested environment.
        env: usize,
        /// Batch size.
        num_envs: usize,
    },
    /// A body index is out of range for its environment.
    InvalidBody {
        /// The environment.
        env: usize,
        /// The requested body.
        body: usize,
    },
    /// An environment has no simulation entities at `initialize_sim`.
    EmptyEnv {
        /// The empty environment.
        env: usize,
    },
    /// The engine has been closed.
    Closed,
    /// Failure inside a backend, described by the backend.
    Backend {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "engine config: {e}"),
            Self::UnknownEngine { name } => write!(f, "unknown engine '{name}'"),
            Self::UnsupportedDevice { device } => {
                write!(f, "engine does not support device {device}")
            }
            Self::NoEnvs => write!(f, "num_envs must be at least 1"),
            Self::SimInitialized => write!(f, "simulation already initialized"),
            Self::SimNotInitialized => write!(f, "simulation not initialized"),
            Self::InvalidEnv { env, num_envs } => {
                write!(f, "env {env} out of range (num_envs={num_envs})")
            }
            Self::InvalidBody { env, body } => write!(f, "env {env} has no body {body}"),
            Self::EmptyEnv { env } => write!(f, "env {env} has no bodies"),
            Self::Closed => write!(f, "engine is closed"),
            Self::Backend { reason } => write!(f, "backend failure: {reason}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
