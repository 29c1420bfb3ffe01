use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Computes row-major contiguous strides for this shape.
    ///
    /// For a shape [d0, d1, d2], the strides are [d1*d2, d2, 1].
    pub fn strides(&self) -> Vec<usize> {
        if self.dims.is_empty() {
            return vec![];
        }
        let mut strides = vec![0usize; self.dims.len()];
        strides[self.dims.len() - 1] = 1;
        for i in (0..self.dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Checks if the given strides correspond to a contiguous (row-major) layout
    /// for this shape.
    pub fn is_contiguous(&self, strides: &[usize]) -> bool {
        if strides.len() != self.dims.len() {
            return false;
        }
        let expected = self.strides();
        strides == expected.as_slice()
    }

    /// Checks that `strides` describe a row-major layout for this shape in
    /// which rows may be padded but never overlap.
    ///
    /// The innermost stride must be 1 and every outer stride must span at
    /// least one full slice of the next dimension.
    pub fn validate_strides(&self, strides: &[usize]) -> Result<()> {
        let invalid = |reason: String| TensorError::InvalidStrides {
            shape: self.dims.clone(),
            strides: strides.to_vec(),
            reason,
        };

        if strides.len() != self.dims.len() {
            return Err(invalid(format!(
                "expected {} strides, got {}",
                self.dims.len(),
                strides.len()
            )));
        }
        let Some(&inner) = strides.last() else {
            return Ok(());
        };
        if inner != 1 {
            return Err(invalid(format!("innermost stride must be 1, got {}", inner)));
        }
        for i in 0..strides.len() - 1 {
            let span = strides[i + 1] * self.dims[i + 1].max(1);
            if strides[i] < span {
                return Err(invalid(format!(
                    "stride {} of dim {} is smaller than the {} elements it must span",
                    strides[i], i, span
                )));
            }
        }
        Ok(())
    }

    /// Number of storage elements needed to hold every logical element of
    /// this shape laid out with `strides`.
    ///
    /// This is the offset of the last element plus one, so trailing padding
    /// after the final row is not required.
    pub fn required_storage_len(&self, strides: &[usize]) -> usize {
        if self.numel() == 0 {
            return 0;
        }
        1 + self
            .dims
            .iter()
            .zip(strides)
            .map(|(d, s)| (d - 1) * s)
            .sum::<usize>()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}
