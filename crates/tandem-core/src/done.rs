//! Per-environment episode status codes.

use std::fmt;

/// Integer-coded episode status for one environment.
///
/// The core only defines [`DoneCode::NULL`] ("not done"). Every other
/// code is owned by the concrete task, which documents what its codes
/// mean (terminated, truncated, succeeded, ...). Code that is generic
/// over tasks should only ever compare against `NULL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoneCode(pub i32);

impl DoneCode {
    /// The environment is still running.
    pub const NULL: DoneCode = DoneCode(0);

    /// Whether this code marks the end of an episode.
    pub fn is_done(self) -> bool {
        self != Self::NULL
    }
}

impl fmt::Display for DoneCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for DoneCode {
    fn from(v: i32) -> Self {
        Self(v)
    }
}
