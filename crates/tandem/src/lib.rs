//! Tandem: batched simulation environments for reinforcement learning.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tandem sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use tandem::prelude::*;
//! use tandem::envs::PointReach;
//!
//! let config = Config::from_json_str(r#"{
//!     "env": { "episode_length": 1.0, "seed": 1 },
//!     "engine": { "engine_name": "kinematic", "timestep": 0.1 }
//! }"#).unwrap();
//!
//! let mut env = SimEnv::new(PointReach::new(), &config, 4, Device::Cpu, false).unwrap();
//! env.reset(None).unwrap();
//!
//! let action = Tensor::zeros(&[4, 2], DType::F32);
//! for _ in 0..10 {
//!     env.step(&action).unwrap();
//! }
//! assert_eq!(env.timesteps(), &[10, 10, 10, 10]);
//!
//! let finished = env.done_env_ids();
//! env.reset(Some(&finished)).unwrap();
//! assert!(env.done_env_ids().is_empty());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tandem-core` | Tensors, spaces, done codes, info, config, errors |
//! | [`engine`] | `tandem-engine` | Engine trait and the kinematic reference engine |
//! | [`env`] | `tandem-env` | Buffers, space builder, task hooks, `SimEnv` |
//! | [`envs`] | `tandem-envs` | Reference tasks |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core data types (`tandem-core`).
pub use tandem_core as types;

/// Engine contract and reference engine (`tandem-engine`).
pub use tandem_engine as engine;

/// Environment lifecycle (`tandem-env`).
///
/// [`env::SimEnv`] is the main entry point; implement [`env::Task`] to
/// define a new environment.
pub use tandem_env as env;

/// Reference tasks (`tandem-envs`).
pub use tandem_envs as envs;

/// Common imports for typical Tandem usage.
///
/// ```rust
/// use tandem::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tandem_core::{
        BoxSpace, Config, DType, Device, DiscreteSpace, DoneCode, Info, InfoValue, Space,
        SpaceDtype, Tensor,
    };

    // Errors
    pub use tandem_core::{ConfigError, SpaceError, TensorError};
    pub use tandem_engine::EngineError;
    pub use tandem_env::EnvError;

    // Engine
    pub use tandem_engine::{Engine, KinematicEngine};

    // Environment
    pub use tandem_env::{EnvContext, EnvState, SimEnv, StepOutput, Task};
}
