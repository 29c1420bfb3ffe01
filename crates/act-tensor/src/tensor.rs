use half::f16;
use rand::Rng;

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::CpuStorage;

/// A tensor backed by CPU storage.
///
/// Data is row-major with explicit strides, so rows may be padded: the
/// distance between consecutive row starts (`row_stride`) can exceed the
/// logical column count. The innermost stride is always 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: CpuStorage,
    shape: Shape,
    strides: Vec<usize>,
    dtype: DType,
}

impl Tensor {
    /// Create a new contiguous f32 tensor from data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<f32>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {:?} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        let strides = shape.strides();
        Tensor {
            storage: CpuStorage::from_f32_vec(data),
            shape,
            strides,
            dtype: DType::F32,
        }
    }

    /// Create a new contiguous f16 tensor from data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn from_f16(data: Vec<f16>, shape: Shape) -> Self {
        assert_eq!(
            data.len(),
            shape.numel(),
            "data length {} does not match shape {:?} (numel={})",
            data.len(),
            shape,
            shape.numel()
        );
        let strides = shape.strides();
        Tensor {
            storage: CpuStorage::from_f16_vec(data),
            shape,
            strides,
            dtype: DType::F16,
        }
    }

    /// Create a contiguous tensor of `dtype` from f32 values, rounding to
    /// half precision when `dtype` is F16.
    ///
    /// # Panics
    /// Panics if `values.len() != shape.numel()`.
    pub fn from_f32_values(values: &[f32], shape: Shape, dtype: DType) -> Self {
        match dtype {
            DType::F32 => Tensor::new(values.to_vec(), shape),
            DType::F16 => Tensor::from_f16(values.iter().map(|&v| f16::from_f32(v)).collect(), shape),
        }
    }

    /// Create a tensor over existing storage with explicit strides.
    ///
    /// The strides must describe a non-overlapping row-major layout and the
    /// storage must hold at least `shape.required_storage_len(&strides)`
    /// elements. Elements outside the logical view (row padding) are kept
    /// as-is and never interpreted.
    pub fn from_storage_strided(
        storage: CpuStorage,
        shape: Shape,
        strides: Vec<usize>,
    ) -> Result<Self> {
        shape.validate_strides(&strides)?;
        let needed = shape.required_storage_len(&strides);
        if storage.len() < needed {
            return Err(TensorError::StorageTooSmall {
                needed,
                got: storage.len(),
            });
        }
        let dtype = storage.dtype();
        Ok(Tensor {
            storage,
            shape,
            strides,
            dtype,
        })
    }

    /// Create a strided f16 tensor. See [`Tensor::from_storage_strided`].
    pub fn from_f16_strided(data: Vec<f16>, shape: Shape, strides: Vec<usize>) -> Result<Self> {
        Tensor::from_storage_strided(CpuStorage::from_f16_vec(data), shape, strides)
    }

    /// Create a zero-filled contiguous tensor.
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        Tensor::full(shape, dtype, 0.0)
    }

    /// Create a contiguous tensor filled with ones.
    pub fn ones(shape: Shape, dtype: DType) -> Self {
        Tensor::full(shape, dtype, 1.0)
    }

    /// Create a contiguous tensor with every element set to `value`.
    pub fn full(shape: Shape, dtype: DType, value: f32) -> Self {
        let n = shape.numel();
        let storage = match dtype {
            DType::F32 => CpuStorage::F32(vec![value; n]),
            DType::F16 => CpuStorage::F16(vec![f16::from_f32(value); n]),
        };
        let strides = shape.strides();
        Tensor {
            storage,
            shape,
            strides,
            dtype,
        }
    }

    /// Create a contiguous tensor with elements drawn uniformly from [0, 1).
    pub fn rand<R: Rng>(shape: Shape, dtype: DType, rng: &mut R) -> Self {
        let n = shape.numel();
        let storage = match dtype {
            DType::F32 => CpuStorage::F32((0..n).map(|_| rng.gen::<f32>()).collect()),
            DType::F16 => {
                CpuStorage::F16((0..n).map(|_| f16::from_f32(rng.gen::<f32>())).collect())
            }
        };
        let strides = shape.strides();
        Tensor {
            storage,
            shape,
            strides,
            dtype,
        }
    }

    /// Allocate a zero-filled tensor with the same shape, strides, storage
    /// length and dtype as `self`.
    pub fn zeros_like(&self) -> Self {
        Tensor {
            storage: CpuStorage::zeros(self.dtype, self.storage.len()),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            dtype: self.dtype,
        }
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the per-dimension strides, in elements.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the stride of dimension `dim`.
    ///
    /// # Panics
    /// Panics if `dim >= ndim()`.
    pub fn stride(&self, dim: usize) -> usize {
        self.strides[dim]
    }

    /// Distance in elements between the starts of consecutive rows of a
    /// 2-D tensor, or `None` for any other rank.
    pub fn row_stride(&self) -> Option<usize> {
        (self.shape.ndim() == 2).then(|| self.strides[0])
    }

    /// Returns true if the tensor has no row padding.
    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous(&self.strides)
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Size in bytes of one element.
    pub fn element_size(&self) -> usize {
        self.dtype.size_in_bytes()
    }

    /// Storage offset of the element at `index`.
    pub fn offset_of(&self, index: &[usize]) -> Result<usize> {
        let in_bounds = index.len() == self.shape.ndim()
            && index.iter().zip(self.shape.dims()).all(|(i, d)| i < d);
        if !in_bounds {
            return Err(TensorError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.dims().to_vec(),
            });
        }
        Ok(index.iter().zip(&self.strides).map(|(i, s)| i * s).sum())
    }

    /// Reads the element at `index`, widened to f32.
    pub fn get_f32(&self, index: &[usize]) -> Result<f32> {
        let offset = self.offset_of(index)?;
        Ok(self.storage.get_f32(offset))
    }

    /// Copies the logical elements out in row-major order, widened to f32.
    ///
    /// Row padding is skipped.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let n = self.numel();
        if self.is_contiguous() {
            return match &self.storage {
                CpuStorage::F32(v) => v[..n].to_vec(),
                CpuStorage::F16(v) => v[..n].iter().map(|h| h.to_f32()).collect(),
            };
        }
        let mut out = Vec::with_capacity(n);
        if n == 0 {
            return out;
        }
        let ndim = self.shape.ndim();
        let mut index = vec![0usize; ndim];
        for _ in 0..n {
            let offset: usize = index.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
            out.push(self.storage.get_f32(offset));
            // Advance the row-major odometer.
            for d in (0..ndim).rev() {
                index[d] += 1;
                if index[d] < self.shape.dim(d) {
                    break;
                }
                index[d] = 0;
            }
        }
        out
    }

    /// Returns the underlying storage reference.
    pub fn storage(&self) -> &CpuStorage {
        &self.storage
    }

    /// Returns the underlying storage for in-place writes.
    pub fn storage_mut(&mut self) -> &mut CpuStorage {
        &mut self.storage
    }
}
