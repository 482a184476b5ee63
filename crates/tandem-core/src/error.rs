//! Error types shared across the Tandem workspace.
//!
//! Organized by subsystem: tensor storage, space descriptors, and
//! configuration. Engine and environment errors live in their own crates
//! and wrap these.

use std::error::Error;
use std::fmt;
use std::io;

use crate::dtype::DType;

/// Errors from dense batch tensor construction and assignment.
///
/// Every variant indicates a programming error in the caller (usually a
/// task returning data inconsistent with the probed observation space).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensorError {
    /// Element count does not match the product of the shape.
    LengthMismatch {
        /// Elements implied by the shape.
        expected: usize,
        /// Elements actually supplied.
        actual: usize,
    },
    /// Source and destination shapes disagree.
    ShapeMismatch {
        /// Shape of the destination.
        expected: Vec<usize>,
        /// Shape of the source.
        actual: Vec<usize>,
    },
    /// Source and destination element types disagree.
    DTypeMismatch {
        /// Element type of the destination.
        expected: DType,
        /// Element type of the source.
        actual: DType,
    },
    /// A row index is outside the leading dimension.
    RowOutOfRange {
        /// The offending row.
        row: usize,
        /// Leading dimension of the tensor.
        rows: usize,
    },
    /// The tensor has no leading (batch) dimension.
    Scalar,
}

impl fmt::Display for TensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "shape implies {expected} elements, got {actual}")
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected:?}, got {actual:?}")
            }
            Self::DTypeMismatch { expected, actual } => {
                write!(f, "dtype mismatch: expected {expected}, got {actual}")
            }
            Self::RowOutOfRange { row, rows } => {
                write!(f, "row {row} out of range (rows={rows})")
            }
            Self::Scalar => write!(f, "tensor has no batch dimension"),
        }
    }
}

impl Error for TensorError {}

/// Errors from building space descriptors.
#[derive(Clone, Debug, PartialEq)]
pub enum SpaceError {
    /// `low`/`high` length does not match the number of components.
    BoundsLength {
        /// Components implied by the shape.
        expected: usize,
        /// Length of the offending bound vector.
        actual: usize,
    },
    /// A lower bound exceeds its upper bound, or a bound is NaN.
    InvalidBounds {
        /// Flat index of the offending component.
        index: usize,
        /// Lower bound at that index.
        low: f64,
        /// Upper bound at that index.
        high: f64,
    },
    /// A discrete space with zero choices.
    EmptyDiscrete,
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundsLength { expected, actual } => {
                write!(f, "bounds have {actual} entries, shape needs {expected}")
            }
            Self::InvalidBounds { index, low, high } => {
                write!(f, "component {index}: low {low} is not <= high {high}")
            }
            Self::EmptyDiscrete => write!(f, "discrete space must have at least one choice"),
        }
    }
}

impl Error for SpaceError {}

/// Errors detected while reading configuration.
///
/// All configuration errors are fatal at construction time; nothing
/// retries them.
#[derive(Debug)]
pub enum ConfigError {
    /// A required key is absent. `key` is the dotted path, e.g.
    /// `env.episode_length`.
    MissingKey {
        /// Dotted path of the missing key.
        key: String,
    },
    /// A key is present but its value is unusable.
    InvalidValue {
        /// Dotted path of the key.
        key: String,
        /// Description of what was wrong.
        reason: String,
    },
    /// The document could not be parsed.
    Parse(serde_json::Error),
    /// The configuration file could not be read.
    Io(io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "missing required config key '{key}'"),
            Self::InvalidValue { key, reason } => {
                write!(f, "invalid value for '{key}': {reason}")
            }
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Io(e) => write!(f, "config read error: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for ConfigError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingKey { key: a }, Self::MissingKey { key: b }) => a == b,
            (
                Self::InvalidValue { key: a, reason: ra },
                Self::InvalidValue { key: b, reason: rb },
            ) => a == b && ra == rb,
            (Self::Parse(a), Self::Parse(b)) => a.to_string() == b.to_string(),
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
