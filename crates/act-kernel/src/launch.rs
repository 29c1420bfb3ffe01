use act_tensor::Tensor;

use crate::error::{KernelError, Result};

/// Lanes per warp.
pub const WARP_SIZE: usize = 32;

/// Largest tile a single program may cover (2^20 lanes).
pub const MAX_TILE_WIDTH: usize = 1 << 20;

/// Largest warp count a single program may request.
pub const MAX_NUM_WARPS: usize = 32;

/// Parallelism hint for a tile width.
///
/// Up to 2047 lanes use 4 warps, up to 4095 use 8, anything wider uses 32.
pub fn num_warps_for(tile_width: usize) -> usize {
    if tile_width > 4095 {
        32
    } else if tile_width > 2047 {
        8
    } else {
        4
    }
}

/// Launch parameters for one row-kernel dispatch.
///
/// Derived from the input's shape on every call and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Number of programs, one per row.
    pub grid: usize,
    /// Lanes per program. Always a power of two.
    pub tile_width: usize,
    /// Warps per program.
    pub num_warps: usize,
}

impl LaunchConfig {
    /// Derive the configuration for a `rows x cols` input.
    ///
    /// The tile width is the smallest power of two `>= cols` (1 for an
    /// empty row), and the warp count follows [`num_warps_for`].
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        let tile_width = cols.max(1).checked_next_power_of_two().ok_or_else(|| {
            KernelError::LaunchConfiguration {
                tile_width: cols,
                num_warps: 0,
                reason: "column count has no representable power-of-two tile".to_string(),
            }
        })?;
        Self::with_params(rows, tile_width, num_warps_for(tile_width))
    }

    /// Derive the configuration from a tensor, which must be rank 2.
    pub fn for_tensor(tensor: &Tensor) -> Result<Self> {
        let (rows, cols) = dims_2d(tensor)?;
        Self::new(rows, cols)
    }

    /// Build a configuration from explicit parameters, rejecting any the
    /// dispatcher could not honor.
    pub fn with_params(grid: usize, tile_width: usize, num_warps: usize) -> Result<Self> {
        let invalid = |reason: &str| KernelError::LaunchConfiguration {
            tile_width,
            num_warps,
            reason: reason.to_string(),
        };

        if !tile_width.is_power_of_two() {
            return Err(invalid("tile width must be a power of two"));
        }
        if tile_width > MAX_TILE_WIDTH {
            return Err(invalid("tile width exceeds the per-program lane limit"));
        }
        if num_warps == 0 || !num_warps.is_power_of_two() {
            return Err(invalid("warp count must be a non-zero power of two"));
        }
        if num_warps > MAX_NUM_WARPS {
            return Err(invalid("warp count exceeds the per-program limit"));
        }

        Ok(LaunchConfig {
            grid,
            tile_width,
            num_warps,
        })
    }

    /// Number of lanes that execute together; a program walks its tile in
    /// waves of this size.
    pub fn lanes_per_wave(&self) -> usize {
        self.num_warps * WARP_SIZE
    }

    /// Fails unless the grid has exactly one program per row.
    pub fn check_grid(&self, rows: usize) -> Result<()> {
        if self.grid != rows {
            return Err(KernelError::LaunchConfiguration {
                tile_width: self.tile_width,
                num_warps: self.num_warps,
                reason: format!("grid of {} programs for {} rows", self.grid, rows),
            });
        }
        Ok(())
    }

    /// Fails unless one tile covers every column of a row.
    pub fn check_covers(&self, cols: usize) -> Result<()> {
        if self.tile_width < cols {
            return Err(KernelError::LaunchConfiguration {
                tile_width: self.tile_width,
                num_warps: self.num_warps,
                reason: format!("tile does not cover {} columns", cols),
            });
        }
        Ok(())
    }
}

/// Returns `(rows, cols)` of a rank-2 tensor or an `InvalidShape` error.
pub fn dims_2d(tensor: &Tensor) -> Result<(usize, usize)> {
    match tensor.shape().dims() {
        &[rows, cols] => Ok((rows, cols)),
        other => Err(KernelError::InvalidShape {
            expected_rank: 2,
            got: other.to_vec(),
        }),
    }
}
