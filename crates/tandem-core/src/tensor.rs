//! Dense, row-major batch tensors.
//!
//! A [`Tensor`] is the storage unit for everything indexed by environment:
//! the leading dimension is the batch, the remaining dimensions are the
//! per-environment shape. Partial updates go through explicit row index
//! lists ([`assign_rows`](Tensor::assign_rows)) rather than per-environment
//! objects, so a reset of `k` environments touches exactly `k` rows.

use smallvec::SmallVec;

use crate::dtype::DType;
use crate::error::TensorError;

/// Tensor shape. Inline for up to four dimensions.
pub type Shape = SmallVec<[usize; 4]>;

/// Typed element storage backing a [`Tensor`].
#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 64-bit floats.
    F64(Vec<f64>),
    /// 32-bit signed integers.
    I32(Vec<i32>),
    /// 64-bit signed integers.
    I64(Vec<i64>),
    /// Bytes.
    U8(Vec<u8>),
}

impl TensorData {
    /// Zero-filled storage of `len` elements.
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F32 => Self::F32(vec![0.0; len]),
            DType::F64 => Self::F64(vec![0.0; len]),
            DType::I32 => Self::I32(vec![0; len]),
            DType::I64 => Self::I64(vec![0; len]),
            DType::U8 => Self::U8(vec![0; len]),
        }
    }

    /// Element type of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
        }
    }

    /// Whether the storage holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Applies `$body` to the matching typed vectors of two `TensorData`s, or
// returns a dtype mismatch. Callers check dtype first, so the fallback
// only fires on internal misuse.
macro_rules! zip_data {
    ($dst:expr, $src:expr, |$d:ident, $s:ident| $body:expr) => {
        match ($dst, $src) {
            (TensorData::F32($d), TensorData::F32($s)) => $body,
            (TensorData::F64($d), TensorData::F64($s)) => $body,
            (TensorData::I32($d), TensorData::I32($s)) => $body,
            (TensorData::I64($d), TensorData::I64($s)) => $body,
            (TensorData::U8($d), TensorData::U8($s)) => $body,
            (d, s) => {
                return Err(TensorError::DTypeMismatch {
                    expected: d.dtype(),
                    actual: s.dtype(),
                })
            }
        }
    };
}

/// A dense row-major tensor with a leading batch dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Wrap existing storage, checking that the shape matches its length.
    pub fn new(shape: &[usize], data: TensorData) -> Result<Self, TensorError> {
        let expected = numel(shape);
        if data.len() != expected {
            return Err(TensorError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape: Shape::from_slice(shape),
            data,
        })
    }

    /// Zero-filled tensor.
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self {
            shape: Shape::from_slice(shape),
            data: TensorData::zeros(dtype, numel(shape)),
        }
    }

    /// `f32` tensor from a flat row-major vector.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::F32(data))
    }

    /// `f64` tensor from a flat row-major vector.
    pub fn from_f64(shape: &[usize], data: Vec<f64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::F64(data))
    }

    /// `i32` tensor from a flat row-major vector.
    pub fn from_i32(shape: &[usize], data: Vec<i32>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::I32(data))
    }

    /// `i64` tensor from a flat row-major vector.
    pub fn from_i64(shape: &[usize], data: Vec<i64>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::I64(data))
    }

    /// `u8` tensor from a flat row-major vector.
    pub fn from_u8(shape: &[usize], data: Vec<u8>) -> Result<Self, TensorError> {
        Self::new(shape, TensorData::U8(data))
    }

    /// Full shape, batch dimension first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element type.
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Backing storage.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Total element count.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Size of the leading dimension; 0 for a scalar tensor.
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Per-row shape (the shape without its leading dimension).
    pub fn row_shape(&self) -> &[usize] {
        self.shape.get(1..).unwrap_or(&[])
    }

    /// Elements per row.
    pub fn row_len(&self) -> usize {
        numel(self.row_shape())
    }

    /// Flat `f32` view, if this is an `f32` tensor.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Flat `f64` view, if this is an `f64` tensor.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            TensorData::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Flat `i32` view, if this is an `i32` tensor.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            TensorData::I32(v) => Some(v),
            _ => None,
        }
    }

    /// Flat `i64` view, if this is an `i64` tensor.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            TensorData::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Flat `u8` view, if this is a `u8` tensor.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            TensorData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// One row of an `f32` tensor.
    pub fn row_f32(&self, row: usize) -> Option<&[f32]> {
        let n = self.row_len();
        self.as_f32()?.get(row * n..(row + 1) * n)
    }

    /// Overwrite the whole tensor with `src`.
    ///
    /// Shapes and dtypes must match exactly.
    pub fn assign(&mut self, src: &Tensor) -> Result<(), TensorError> {
        self.check_compatible(src, self.shape())?;
        zip_data!(&mut self.data, &src.data, |d, s| d.copy_from_slice(s));
        Ok(())
    }

    /// Scatter the rows of `src` into rows `rows` of `self`.
    ///
    /// `src` must have shape `[rows.len(), *self.row_shape()]` and the
    /// same dtype. Rows not listed are left untouched. If an index
    /// repeats, the last occurrence wins.
    pub fn assign_rows(&mut self, rows: &[usize], src: &Tensor) -> Result<(), TensorError> {
        if self.shape.is_empty() {
            return Err(TensorError::Scalar);
        }
        let mut expected: Shape = SmallVec::with_capacity(self.shape.len());
        expected.push(rows.len());
        expected.extend_from_slice(self.row_shape());
        self.check_compatible(src, &expected)?;
        self.check_rows(rows)?;

        let n = self.row_len();
        zip_data!(&mut self.data, &src.data, |d, s| {
            for (i, &row) in rows.iter().enumerate() {
                d[row * n..(row + 1) * n].copy_from_slice(&s[i * n..(i + 1) * n]);
            }
        });
        Ok(())
    }

    fn check_compatible(&self, src: &Tensor, expected_shape: &[usize]) -> Result<(), TensorError> {
        if src.dtype() != self.dtype() {
            return Err(TensorError::DTypeMismatch {
                expected: self.dtype(),
                actual: src.dtype(),
            });
        }
        if src.shape() != expected_shape {
            return Err(TensorError::ShapeMismatch {
                expected: expected_shape.to_vec(),
                actual: src.shape().to_vec(),
            });
        }
        Ok(())
    }

    fn check_rows(&self, rows: &[usize]) -> Result<(), TensorError> {
        let n = self.rows();
        match rows.iter().find(|&&r| r >= n) {
            Some(&row) => Err(TensorError::RowOutOfRange { row, rows: n }),
            None => Ok(()),
        }
    }
}

/// Product of a shape's dimensions (1 for the empty shape).
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}
