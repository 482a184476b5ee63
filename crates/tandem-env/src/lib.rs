//! Batched environment lifecycle for Tandem.
//!
//! A [`SimEnv`] runs `N` copies of one [`Task`] on a shared engine. It
//! owns the per-environment buffers ([`EnvBuffers`]), derives the
//! observation space by probing the task ([`build_observation_space`]),
//! and sequences the task's hooks through construction, reset (full or
//! partial), and step.
//!
//! The crate never writes simulation state itself: tasks do, through the
//! engine they are paired with. Buffer writes from hooks go through the
//! [`EnvContext`] handed to them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffers;
pub mod error;
pub mod sim_env;
pub mod space_builder;
pub mod task;

pub use buffers::{EnvBuffers, Outputs};
pub use error::EnvError;
pub use sim_env::{EnvState, SimEnv, StepOutput};
pub use space_builder::build_observation_space;
pub use task::{EnvContext, Task};
