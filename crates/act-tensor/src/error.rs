use thiserror::Error;

#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("invalid strides {strides:?} for shape {shape:?}: {reason}")]
    InvalidStrides {
        shape: Vec<usize>,
        strides: Vec<usize>,
        reason: String,
    },
    #[error("storage too small: layout needs {needed} elements, storage holds {got}")]
    StorageTooSmall { needed: usize, got: usize },
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, TensorError>;
