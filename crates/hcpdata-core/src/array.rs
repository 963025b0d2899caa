//! Decoded file contents
//!
//! Values are produced once by a [`Decoder`](crate::Decoder), optionally passed
//! through a filter, and then shared behind an `Arc`. Nothing hands out mutable
//! access after that point, which is what "frozen" means for this crate.

use crate::error::{Error, Result};
use std::ops::Range;

/// Element storage for an [`NdArray`], row-major
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
}

/// Apply the same generic expression to whichever variant is present.
macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Float($v) => ArrayData::Float($body),
            ArrayData::Int($v) => ArrayData::Int($body),
            ArrayData::Bool($v) => ArrayData::Bool($body),
        }
    };
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Float(v) => v.len(),
            ArrayData::Int(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type, for error messages
    pub fn dtype(&self) -> &'static str {
        match self {
            ArrayData::Float(_) => "float64",
            ArrayData::Int(_) => "int64",
            ArrayData::Bool(_) => "bool",
        }
    }

    fn truthy(&self, i: usize) -> bool {
        match self {
            ArrayData::Float(v) => v[i] != 0.0,
            ArrayData::Int(v) => v[i] != 0,
            ArrayData::Bool(v) => v[i],
        }
    }
}

/// Minimal n-dimensional array, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Create an array, checking that `shape` accounts for every element
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::decode(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional float array
    pub fn from_floats(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Float(values),
        }
    }

    /// One-dimensional boolean array
    pub fn from_bools(values: Vec<bool>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Bool(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match &self.data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Number of elements in one row (product of all but the leading dimension)
    pub fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Drop every axis of length one
    pub fn squeeze(self) -> Self {
        let shape = self.shape.into_iter().filter(|&d| d != 1).collect();
        Self {
            shape,
            data: self.data,
        }
    }

    /// Reverse the order of all axes
    pub fn transpose(&self) -> Self {
        if self.ndim() < 2 {
            return self.clone();
        }

        let shape: Vec<usize> = self.shape.iter().rev().copied().collect();
        let strides = strides_of(&self.shape);
        let n = self.len();
        let mut order = Vec::with_capacity(n);
        let mut index = vec![0usize; shape.len()];
        for _ in 0..n {
            // index walks the output in row-major order; map it back to the source
            let src: usize = index
                .iter()
                .rev()
                .zip(strides.iter())
                .map(|(i, s)| i * s)
                .sum();
            order.push(src);
            for axis in (0..index.len()).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }

        let data = each_variant!(&self.data, v => order.iter().map(|&i| v[i]).collect());
        Self { shape, data }
    }

    /// Copy of rows `range` along the leading dimension
    pub fn rows(&self, range: Range<usize>) -> Result<Self> {
        let lead = self.shape.first().copied().unwrap_or(0);
        if range.end > lead || range.start > range.end {
            return Err(Error::decode(format!(
                "row range {:?} outside leading dimension {}",
                range, lead
            )));
        }
        let width = self.row_len();
        let span = range.start * width..range.end * width;
        let data = each_variant!(&self.data, v => v[span.clone()].to_vec());
        let mut shape = self.shape.clone();
        shape[0] = range.end - range.start;
        Ok(Self { shape, data })
    }

    /// Zero-filled array with `n_rows` rows whose row `targets[k]` is row `k` of `self`
    pub fn scatter_rows(&self, n_rows: usize, targets: &[usize]) -> Result<Self> {
        let lead = self.shape.first().copied().unwrap_or(0);
        if targets.len() != lead {
            return Err(Error::decode(format!(
                "{} target rows for {} source rows",
                targets.len(),
                lead
            )));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= n_rows) {
            return Err(Error::decode(format!(
                "target row {} outside {} rows",
                bad, n_rows
            )));
        }

        let width = self.row_len();
        let data = each_variant!(&self.data, v => scatter(v, n_rows, width, targets));

        let mut shape = self.shape.clone();
        if shape.is_empty() {
            shape.push(n_rows);
        } else {
            shape[0] = n_rows;
        }
        Ok(Self { shape, data })
    }

    /// Indices of nonzero / true elements, in order
    pub fn nonzero(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.data.truthy(i)).collect()
    }

    /// Element-wise sign flip; boolean arrays cannot be negated
    pub fn negate(&self) -> Result<Self> {
        let data = match &self.data {
            ArrayData::Float(v) => ArrayData::Float(v.iter().map(|x| -x).collect()),
            ArrayData::Int(v) => ArrayData::Int(
                v.iter()
                    .map(|x| {
                        x.checked_neg()
                            .ok_or_else(|| Error::decode(format!("cannot negate {}", x)))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            ArrayData::Bool(_) => {
                return Err(Error::decode("cannot negate a boolean array"));
            }
        };
        Ok(Self {
            shape: self.shape.clone(),
            data,
        })
    }

    /// Element-wise cast to bool (nonzero is true)
    pub fn to_bool(&self) -> Self {
        let data = ArrayData::Bool((0..self.len()).map(|i| self.data.truthy(i)).collect());
        Self {
            shape: self.shape.clone(),
            data,
        }
    }
}

fn scatter<T: Copy + Default>(src: &[T], n_rows: usize, width: usize, targets: &[usize]) -> Vec<T> {
    let mut out = vec![T::default(); n_rows * width];
    for (k, &t) in targets.iter().enumerate() {
        out[t * width..(t + 1) * width].copy_from_slice(&src[k * width..(k + 1) * width]);
    }
    out
}

fn strides_of(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Volumetric image with its voxel-to-world affine
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: NdArray,
    pub affine: [[f64; 4]; 4],
}

/// Triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub coordinates: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.coordinates.len()
    }
}

/// Decoded, immutable content of one subject file
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Volume(Volume),
    Mesh(Mesh),
    Array(NdArray),
    /// Container formats holding several data arrays (GIFTI)
    Arrays(Vec<NdArray>),
    /// Left and right atlas masks for one mesh resolution
    MaskPair { left: NdArray, right: NdArray },
}

impl Value {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Volume(_) => "volume",
            Value::Mesh(_) => "mesh",
            Value::Array(_) => "array",
            Value::Arrays(_) => "arrays",
            Value::MaskPair { .. } => "mask pair",
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Value::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_volume(&self) -> Option<&Volume> {
        match self {
            Value::Volume(v) => Some(v),
            _ => None,
        }
    }

    /// Unwrap an array value or fail with a decode error
    pub fn into_array(self) -> Result<NdArray> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(Error::decode(format!(
                "expected an array, found a {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> NdArray {
        let values = (0..rows * cols).map(|v| v as f64).collect();
        NdArray::new(vec![rows, cols], ArrayData::Float(values)).unwrap()
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        let err = NdArray::new(vec![2, 3], ArrayData::Float(vec![0.0; 5])).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_squeeze_drops_singletons() {
        let a = NdArray::new(vec![4, 1], ArrayData::Int(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(a.squeeze().shape(), &[4]);

        let b = NdArray::new(vec![1, 3, 1], ArrayData::Int(vec![1, 2, 3])).unwrap();
        assert_eq!(b.squeeze().shape(), &[3]);
    }

    #[test]
    fn test_transpose_2d() {
        let a = grid(2, 3);
        let t = a.transpose();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.as_floats().unwrap(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        assert_eq!(t.transpose(), a);
    }

    #[test]
    fn test_transpose_3d_reverses_axes() {
        let values = (0..24).map(|v| v as f64).collect();
        let a = NdArray::new(vec![2, 3, 4], ArrayData::Float(values)).unwrap();
        let t = a.transpose();
        assert_eq!(t.shape(), &[4, 3, 2]);
        // t[k][j][i] == a[i][j][k]; a[1][2][3] = 23 lands at t[3][2][1]
        assert_eq!(t.as_floats().unwrap()[3 * 6 + 2 * 2 + 1], 23.0);
    }

    #[test]
    fn test_rows_and_scatter() {
        let a = grid(4, 2);
        let mid = a.rows(1..3).unwrap();
        assert_eq!(mid.shape(), &[2, 2]);
        assert_eq!(mid.as_floats().unwrap(), &[2.0, 3.0, 4.0, 5.0]);

        let spread = mid.scatter_rows(4, &[0, 3]).unwrap();
        assert_eq!(spread.shape(), &[4, 2]);
        assert_eq!(
            spread.as_floats().unwrap(),
            &[2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 4.0, 5.0]
        );

        assert!(a.rows(3..5).is_err());
        assert!(mid.scatter_rows(4, &[0]).is_err());
        assert!(mid.scatter_rows(2, &[0, 3]).is_err());
    }

    #[test]
    fn test_negate_and_bool_cast() {
        let a = NdArray::from_floats(vec![1.5, 0.0, -2.0]);
        assert_eq!(a.negate().unwrap().as_floats().unwrap(), &[-1.5, -0.0, 2.0]);
        assert_eq!(a.to_bool().as_bools().unwrap(), &[true, false, true]);
        assert_eq!(a.nonzero(), vec![0, 2]);
        assert!(a.to_bool().negate().is_err());
    }

    #[test]
    fn test_negate_int_overflow_is_decode_error() {
        let a = NdArray::new(vec![2], ArrayData::Int(vec![3, -4])).unwrap();
        assert_eq!(a.negate().unwrap().data(), &ArrayData::Int(vec![-3, 4]));

        let b = NdArray::new(vec![2], ArrayData::Int(vec![1, i64::MIN])).unwrap();
        assert!(matches!(b.negate(), Err(Error::Decode(_))));
    }
}
