//! Shapes and dense value buffers
//!
//! Every layer stores its activity as a flat row-major `f64` array together
//! with a shape of one or two strictly positive extents.

use std::fmt;

use crate::error::{FieldError, FieldResult};

/// Extents of a 1D or 2D field.
///
/// For 2D shapes, `dims()[0]` is the number of rows and `dims()[1]` the
/// number of columns; values are stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Build a shape from its extents.
    ///
    /// # Errors
    ///
    /// `UnsupportedDimension` if there are not 1 or 2 extents,
    /// `InvalidShape` if any extent is zero.
    pub fn new(dims: &[usize]) -> FieldResult<Self> {
        if dims.is_empty() || dims.len() > 2 {
            return Err(FieldError::UnsupportedDimension { rank: dims.len() });
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(FieldError::InvalidShape(dims.to_vec()));
        }
        Ok(Self {
            dims: dims.to_vec(),
        })
    }

    /// 1D shape with `n` cells.
    pub fn d1(n: usize) -> FieldResult<Self> {
        Self::new(&[n])
    }

    /// 2D shape with `rows × cols` cells.
    pub fn d2(rows: usize, cols: usize) -> FieldResult<Self> {
        Self::new(&[rows, cols])
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of axes (1 or 2).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of cells.
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Extents as `(rows, cols)`; a 1D shape is a single row.
    pub fn rows_cols(&self) -> (usize, usize) {
        match self.dims.as_slice() {
            [n] => (1, *n),
            [rows, cols] => (*rows, *cols),
            _ => unreachable!("shape rank is checked at construction"),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", parts.join("x"))
    }
}

/// A dense array of `f64` with a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBuffer {
    shape: Shape,
    data: Vec<f64>,
}

impl ValueBuffer {
    /// Zero-filled buffer of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let data = vec![0.0; shape.size()];
        Self { shape, data }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Exchange the contents with a shadow buffer of the same length.
    ///
    /// # Panics
    ///
    /// Panics if `other` does not have `self.len()` elements.
    pub fn swap_data(&mut self, other: &mut Vec<f64>) {
        assert_eq!(
            other.len(),
            self.data.len(),
            "shadow buffer length mismatch in swap_data"
        );
        std::mem::swap(&mut self.data, other);
    }
}
