//! Side-channel info mapping returned alongside observations.

use indexmap::IndexMap;

use crate::tensor::Tensor;

/// Auxiliary per-batch data keyed by name.
///
/// Keys are task- and engine-specific. Iteration follows insertion order,
/// which keeps logs stable, but callers must not rely on any particular
/// order.
pub type Info = IndexMap<String, InfoValue>;

/// A value stored in [`Info`].
#[derive(Clone, Debug, PartialEq)]
pub enum InfoValue {
    /// A batch tensor, usually one row per environment.
    Tensor(Tensor),
    /// One `f32` per environment.
    PerEnv(Vec<f32>),
    /// A batch-wide scalar.
    Scalar(f64),
    /// A batch-wide counter.
    Count(u64),
    /// A flag.
    Flag(bool),
    /// Free text.
    Text(String),
}

impl InfoValue {
    /// Per-environment values, if this is [`InfoValue::PerEnv`].
    pub fn as_per_env(&self) -> Option<&[f32]> {
        match self {
            Self::PerEnv(v) => Some(v),
            _ => None,
        }
    }

    /// Counter value, if this is [`InfoValue::Count`].
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Tensor> for InfoValue {
    fn from(t: Tensor) -> Self {
        Self::Tensor(t)
    }
}

impl From<Vec<f32>> for InfoValue {
    fn from(v: Vec<f32>) -> Self {
        Self::PerEnv(v)
    }
}

impl From<f64> for InfoValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<u64> for InfoValue {
    fn from(v: u64) -> Self {
        Self::Count(v)
    }
}

impl From<bool> for InfoValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<String> for InfoValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for InfoValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}
