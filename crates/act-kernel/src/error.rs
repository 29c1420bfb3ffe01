use act_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("invalid shape: expected a rank-{expected_rank} tensor, got shape {got:?}")]
    InvalidShape {
        expected_rank: usize,
        got: Vec<usize>,
    },
    #[error("invalid launch configuration (tile_width={tile_width}, num_warps={num_warps}): {reason}")]
    LaunchConfiguration {
        tile_width: usize,
        num_warps: usize,
        reason: String,
    },
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

pub type Result<T> = std::result::Result<T, KernelError>;
