//! `act-tensor` - Strided tensors and the reference compute backend for the
//! SiLU kernel benchmarks.
//!
//! This crate provides:
//! - A `Tensor` type backed by CPU storage with an explicit row stride
//! - A `ComputeBackend` trait for elementwise activation math
//! - A reference `CpuBackend` implementation used as the comparison baseline
//! - Shape and stride utilities
//! - Data type definitions (F32, F16)

pub mod backend;
pub mod cpu;
pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use half::f16;
pub use shape::Shape;
pub use storage::CpuStorage;
pub use tensor::Tensor;
