//! Engine adapter contract and reference kinematic engine for Tandem.
//!
//! The [`Engine`] trait is everything the environment core knows about a
//! physics/rendering backend. [`KinematicEngine`] is a small CPU backend
//! used by the reference tasks, tests, and benchmarks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod kinematic;

pub use engine::Engine;
pub use error::EngineError;
pub use kinematic::{Body, BodyState, Camera, KinematicConfig, KinematicEngine, KINEMATIC_ENGINE_NAME};
