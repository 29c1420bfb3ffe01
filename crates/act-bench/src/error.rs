use act_kernel::KernelError;
use act_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
    #[error("invalid benchmark config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
