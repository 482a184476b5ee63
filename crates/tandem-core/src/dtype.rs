//! Element types for batch tensors and space descriptors.
//!
//! [`DType`] is the native element type of a [`Tensor`](crate::Tensor).
//! [`SpaceDtype`] is the portable tag carried by space descriptors and
//! named after the NumPy dtypes learners expect. The two are kept
//! separate so descriptors never depend on how a tensor is stored.

use std::fmt;

/// Native element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 8-bit unsigned integer.
    U8,
}

impl DType {
    /// Portable tag for this element type.
    pub fn to_space_dtype(self) -> SpaceDtype {
        match self {
            Self::F32 => SpaceDtype::Float32,
            Self::F64 => SpaceDtype::Float64,
            Self::I32 => SpaceDtype::Int32,
            Self::I64 => SpaceDtype::Int64,
            Self::U8 => SpaceDtype::Uint8,
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F64 | Self::I64 => 8,
            Self::U8 => 1,
        }
    }

    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
        };
        f.write_str(s)
    }
}

/// Portable dtype tag used by [`BoxSpace`](crate::space::BoxSpace).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpaceDtype {
    /// `float32`
    Float32,
    /// `float64`
    Float64,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint8`
    Uint8,
}

impl SpaceDtype {
    /// Native tensor element type for this tag.
    pub fn to_dtype(self) -> DType {
        match self {
            Self::Float32 => DType::F32,
            Self::Float64 => DType::F64,
            Self::Int32 => DType::I32,
            Self::Int64 => DType::I64,
            Self::Uint8 => DType::U8,
        }
    }

    /// NumPy-style name, e.g. `"float32"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
        }
    }

    /// Parse a NumPy-style name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint8" => Some(Self::Uint8),
            _ => None,
        }
    }
}

impl fmt::Display for SpaceDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DType; 5] = [DType::F32, DType::F64, DType::I32, DType::I64, DType::U8];

    #[test]
    fn dtype_tags_are_inverse() {
        for dt in ALL {
            assert_eq!(dt.to_space_dtype().to_dtype(), dt);
        }
    }

    #[test]
    fn names_parse_back() {
        for dt in ALL {
            let tag = dt.to_space_dtype();
            assert_eq!(SpaceDtype::from_name(tag.name()), Some(tag));
        }
        assert_eq!(SpaceDtype::from_name("bfloat16"), None);
    }

    #[test]
    fn only_float_types_are_float() {
        assert!(DType::F32.is_float());
        assert!(DType::F64.is_float());
        assert!(!DType::I64.is_float());
        assert!(!DType::U8.is_float());
    }
}
