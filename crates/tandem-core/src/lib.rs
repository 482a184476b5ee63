//! Core types for the Tandem batched environment framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! data shared by engines, the environment core, and tasks: dense batch
//! tensors, element types, space descriptors, done codes, the info
//! mapping, configuration, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod device;
pub mod done;
pub mod dtype;
pub mod error;
pub mod info;
pub mod space;
pub mod tensor;

pub use config::{Config, EngineConfig, EnvConfig, Section};
pub use device::Device;
pub use done::DoneCode;
pub use dtype::{DType, SpaceDtype};
pub use error::{ConfigError, SpaceError, TensorError};
pub use info::{Info, InfoValue};
pub use space::{BoxSpace, DiscreteSpace, Space};
pub use tensor::{Shape, Tensor, TensorData};
