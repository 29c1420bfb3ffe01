pub mod unary;

use crate::backend::ComputeBackend;
use crate::error::{Result, TensorError};

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops over contiguous
/// data. This is the reference baseline the tiled kernels are measured
/// against.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn silu(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| unary::silu(v)).collect())
    }

    fn silu_grad(&self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(x.iter().map(|&v| unary::silu_grad(v)).collect())
    }

    fn silu_backward(&self, x: &[f32], grad: &[f32]) -> Result<Vec<f32>> {
        if x.len() != grad.len() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![x.len()],
                got: vec![grad.len()],
            });
        }
        Ok(x
            .iter()
            .zip(grad)
            .map(|(&v, &g)| g * unary::silu_grad(v))
            .collect())
    }
}
