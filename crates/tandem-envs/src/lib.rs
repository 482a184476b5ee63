//! Reference tasks for Tandem.
//!
//! [`PointReach`] is a complete [`Task`](tandem_env::Task) on the
//! [`KinematicEngine`](tandem_engine::KinematicEngine): seeded resets,
//! clipped force actions, dense reward, and three task-level done codes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod point_reach;

pub use point_reach::{PointReach, PointReachConfig};
