//! `act-kernel` - Block-tiled SiLU kernels for 2-D half-precision tensors.
//!
//! Each row of the input is handled by one independent program. A program
//! covers its row with a tile of `tile_width` lanes (the next power of two
//! at or above the column count) and masks every lane past the last column,
//! so padded lanes never touch memory.
//!
//! - [`launch`]: launch configuration derived from the column count
//! - [`kernel`]: the row kernels and the grid dispatch
//! - [`function`]: the differentiable operator and its saved context

pub mod error;
pub mod function;
pub mod kernel;
pub mod launch;

pub use error::{KernelError, Result};
pub use function::{BackwardMode, SiluContext, SiluFunction};
pub use kernel::{silu_backward_chained, silu_forward, silu_local_grad};
pub use launch::LaunchConfig;
