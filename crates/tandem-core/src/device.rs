//! Compute device selection.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Device an engine runs its simulation on.
///
/// Batch buffers are always host memory; the device is passed through to
/// the engine builder and recorded for callers that move data onward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
    /// CUDA device by ordinal.
    Cuda(u32),
}

impl Device {
    /// Whether this is the host CPU.
    pub fn is_cpu(self) -> bool {
        self == Self::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(n) => write!(f, "cuda:{n}"),
        }
    }
}

impl FromStr for Device {
    type Err = ConfigError;

    /// Accepts `cpu`, `cuda` (ordinal 0) and `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            other => {
                let ordinal = other
                    .strip_prefix("cuda:")
                    .ok_or_else(|| ConfigError::invalid("device", format!("unknown device '{other}'")))?;
                ordinal
                    .parse::<u32>()
                    .map(Self::Cuda)
                    .map_err(|_| ConfigError::invalid("device", format!("bad cuda ordinal '{ordinal}'")))
            }
        }
    }
}
