use std::fmt::Debug;

use crate::error::Result;

/// Trait for pluggable elementwise compute backends.
///
/// Operations work on contiguous f32 slices of logical elements. Data is
/// passed in as slices and returned as owned vectors.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// SiLU activation: result[i] = x[i] * sigmoid(x[i]) = x[i] / (1 + exp(-x[i])).
    fn silu(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Local derivative of SiLU:
    /// result[i] = (1 + exp(-x) + x * exp(-x)) / (1 + exp(-x))^2.
    fn silu_grad(&self, x: &[f32]) -> Result<Vec<f32>>;

    /// Reverse-mode SiLU backward: result[i] = grad[i] * silu'(x[i]).
    fn silu_backward(&self, x: &[f32], grad: &[f32]) -> Result<Vec<f32>>;
}
