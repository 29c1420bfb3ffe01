use act_tensor::{DType, Tensor, TensorError};
use half::f16;
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::launch::{dims_2d, LaunchConfig};

/// Elementwise math run by every lane of a single-input row kernel.
///
/// Values are widened to f32 before `apply` and narrowed back to f16 on
/// store.
pub trait RowKernel: Sync {
    const NAME: &'static str;

    fn apply(&self, x: f32) -> f32;
}

/// Elementwise math for a kernel reading two rows at the same column.
pub trait BinaryRowKernel: Sync {
    const NAME: &'static str;

    fn apply(&self, x: f32, y: f32) -> f32;
}

/// `x / (1 + exp(-x))`
#[derive(Debug, Clone, Copy, Default)]
pub struct SiluForward;

impl RowKernel for SiluForward {
    const NAME: &'static str = "silu_forward";

    #[inline(always)]
    fn apply(&self, x: f32) -> f32 {
        x / (1.0 + (-x).exp())
    }
}

/// Local derivative `(1 + e + x*e) / (1 + e)^2` with `e = exp(-x)`.
///
/// Evaluated as `s * (1 + x * (1 - s))` with `s = sigmoid(x)`: the expanded
/// quotient overflows to `inf / inf` once `e` leaves the f32 range, which
/// happens for f16 inputs below about -88.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiluLocalGrad;

impl RowKernel for SiluLocalGrad {
    const NAME: &'static str = "silu_backward";

    #[inline(always)]
    fn apply(&self, x: f32) -> f32 {
        let s = 1.0 / (1.0 + (-x).exp());
        s * (1.0 + x * (1.0 - s))
    }
}

/// Upstream gradient times the local derivative.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiluChainedGrad;

impl BinaryRowKernel for SiluChainedGrad {
    const NAME: &'static str = "silu_backward_chained";

    #[inline(always)]
    fn apply(&self, x: f32, grad: f32) -> f32 {
        grad * SiluLocalGrad.apply(x)
    }
}

/// SiLU of every element of a rank-2 f16 tensor.
///
/// The output has the input's shape and stride layout.
pub fn silu_forward(input: &Tensor) -> Result<Tensor> {
    let cfg = LaunchConfig::for_tensor(input)?;
    launch_unary(&SiluForward, input, &cfg)
}

/// Local SiLU derivative of every element of a rank-2 f16 tensor.
pub fn silu_local_grad(input: &Tensor) -> Result<Tensor> {
    let cfg = LaunchConfig::for_tensor(input)?;
    launch_unary(&SiluLocalGrad, input, &cfg)
}

/// `upstream * silu'(input)` elementwise. Both tensors must be rank-2 f16
/// with the same shape; their row strides may differ. The output takes the
/// layout of `input`.
pub fn silu_backward_chained(input: &Tensor, upstream: &Tensor) -> Result<Tensor> {
    let cfg = LaunchConfig::for_tensor(input)?;
    launch_binary(&SiluChainedGrad, input, upstream, &cfg)
}

/// Run `kernel` over every row of `input` with one program per row.
pub fn launch_unary<K: RowKernel>(kernel: &K, input: &Tensor, cfg: &LaunchConfig) -> Result<Tensor> {
    let (rows, cols) = dims_2d(input)?;
    require_f16(input)?;
    cfg.check_grid(rows)?;
    cfg.check_covers(cols)?;
    debug!(
        kernel = K::NAME,
        rows,
        cols,
        tile_width = cfg.tile_width,
        num_warps = cfg.num_warps,
        "launching row kernel"
    );

    let src = input.storage().as_f16_slice()?;
    let src_stride = input.stride(0);
    let used = input.shape().required_storage_len(input.strides());

    let mut output = input.zeros_like();
    let dst_stride = output.stride(0).max(1);
    let dst = output.storage_mut().as_f16_slice_mut()?;
    let wave = cfg.lanes_per_wave();
    let tile_width = cfg.tile_width;

    dst[..used]
        .par_chunks_mut(dst_stride)
        .enumerate()
        .for_each_init(
            || vec![0.0f32; tile_width],
            |tile, (row, out_row)| {
                let in_row = &src[row * src_stride..];
                for start in (0..tile_width).step_by(wave) {
                    let lanes = start..(start + wave).min(tile_width);
                    load_masked(&mut tile[lanes.clone()], in_row, start, cols);
                    for x in &mut tile[lanes.clone()] {
                        *x = kernel.apply(*x);
                    }
                    store_masked(&tile[lanes], out_row, start, cols);
                }
            },
        );

    Ok(output)
}

/// Run `kernel` over matching rows of `input` and `other`.
pub fn launch_binary<K: BinaryRowKernel>(
    kernel: &K,
    input: &Tensor,
    other: &Tensor,
    cfg: &LaunchConfig,
) -> Result<Tensor> {
    let (rows, cols) = dims_2d(input)?;
    dims_2d(other)?;
    if other.shape() != input.shape() {
        return Err(TensorError::ShapeMismatch {
            expected: input.shape().dims().to_vec(),
            got: other.shape().dims().to_vec(),
        }
        .into());
    }
    require_f16(input)?;
    require_f16(other)?;
    cfg.check_grid(rows)?;
    cfg.check_covers(cols)?;
    debug!(
        kernel = K::NAME,
        rows,
        cols,
        tile_width = cfg.tile_width,
        num_warps = cfg.num_warps,
        "launching row kernel"
    );

    let xs = input.storage().as_f16_slice()?;
    let ys = other.storage().as_f16_slice()?;
    let (x_stride, y_stride) = (input.stride(0), other.stride(0));
    let used = input.shape().required_storage_len(input.strides());

    let mut output = input.zeros_like();
    let dst_stride = output.stride(0).max(1);
    let dst = output.storage_mut().as_f16_slice_mut()?;
    let wave = cfg.lanes_per_wave();
    let tile_width = cfg.tile_width;

    dst[..used]
        .par_chunks_mut(dst_stride)
        .enumerate()
        .for_each_init(
            || (vec![0.0f32; tile_width], vec![0.0f32; tile_width]),
            |(x_tile, y_tile), (row, out_row)| {
                let x_row = &xs[row * x_stride..];
                let y_row = &ys[row * y_stride..];
                for start in (0..tile_width).step_by(wave) {
                    let lanes = start..(start + wave).min(tile_width);
                    load_masked(&mut x_tile[lanes.clone()], x_row, start, cols);
                    load_masked(&mut y_tile[lanes.clone()], y_row, start, cols);
                    for (x, &y) in x_tile[lanes.clone()].iter_mut().zip(&y_tile[lanes.clone()]) {
                        *x = kernel.apply(*x, y);
                    }
                    store_masked(&x_tile[lanes], out_row, start, cols);
                }
            },
        );

    Ok(output)
}

/// Stage lanes `first..first + lanes.len()` of a row; masked lanes read as 0.
#[inline]
fn load_masked(lanes: &mut [f32], row: &[f16], first: usize, cols: usize) {
    for (i, lane) in lanes.iter_mut().enumerate() {
        let col = first + i;
        *lane = if col < cols { row[col].to_f32() } else { 0.0 };
    }
}

/// Write back lanes `first..first + lanes.len()`; masked lanes are dropped.
#[inline]
fn store_masked(lanes: &[f32], row: &mut [f16], first: usize, cols: usize) {
    for (i, &lane) in lanes.iter().enumerate() {
        let col = first + i;
        if col < cols {
            row[col] = f16::from_f32(lane);
        }
    }
}

fn require_f16(tensor: &Tensor) -> Result<()> {
    if !tensor.dtype().is_half() {
        return Err(TensorError::DTypeMismatch {
            expected: DType::F16.to_string(),
            got: tensor.dtype().to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use act_tensor::Shape;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn f16_tensor(values: &[f32], rows: usize, cols: usize) -> Tensor {
        Tensor::from_f32_values(values, Shape::new(vec![rows, cols]), DType::F16)
    }

    /// A `rows x cols` tensor with row stride `stride`, backed by exactly the
    /// storage it needs. Padding holds NaN so any stray read would surface.
    fn padded(values: &[f32], rows: usize, cols: usize, stride: usize) -> Tensor {
        let shape = Shape::new(vec![rows, cols]);
        let len = shape.required_storage_len(&[stride, 1]);
        let mut data = vec![f16::NAN; len];
        for r in 0..rows {
            for c in 0..cols {
                data[r * stride + c] = f16::from_f32(values[r * cols + c]);
            }
        }
        Tensor::from_f16_strided(data, shape, vec![stride, 1]).unwrap()
    }

    fn silu_f64(x: f64) -> f64 {
        x / (1.0 + (-x).exp())
    }

    fn silu_grad_f64(x: f64) -> f64 {
        let s = 1.0 / (1.0 + (-x).exp());
        s * (1.0 + x * (1.0 - s))
    }

    fn close(got: f32, want: f64) -> bool {
        let err = (got as f64 - want).abs();
        err <= 1e-2 * want.abs() || err <= 2e-3
    }

    #[test]
    fn test_forward_values() {
        let t = f16_tensor(&[0.0, 1.0, -1.0, 4.0], 1, 4);
        let out = silu_forward(&t).unwrap().to_f32_vec();
        assert_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 0.7310586, epsilon = 1e-3);
        assert_relative_eq!(out[2], -0.2689414, epsilon = 1e-3);
        assert_relative_eq!(out[3], 3.928055, epsilon = 4e-3);
    }

    #[test]
    fn test_local_grad_values() {
        let t = f16_tensor(&[0.0, 1.0, -1.0], 1, 3);
        let out = silu_local_grad(&t).unwrap().to_f32_vec();
        assert_relative_eq!(out[0], 0.5);
        assert_relative_eq!(out[1], 0.9276705, epsilon = 1e-3);
        assert_relative_eq!(out[2], 0.0723295, epsilon = 1e-3);
    }

    #[test]
    fn test_large_negative_inputs_stay_finite() {
        let xs = [-50.0, -88.0, -89.0, -100.0, -1000.0, -60000.0];
        let t = f16_tensor(&xs, 1, xs.len());
        let fwd = silu_forward(&t).unwrap().to_f32_vec();
        let grad = silu_local_grad(&t).unwrap().to_f32_vec();
        for ((&y, &g), &x) in fwd.iter().zip(&grad).zip(&xs) {
            assert!(y.is_finite() && y.abs() < 1e-6, "silu({}) = {}", x, y);
            assert!(g.is_finite() && g.abs() < 1e-6, "silu'({}) = {}", x, g);
        }
    }

    #[test]
    fn test_extreme_magnitudes_match_f64() {
        let mut xs = Vec::new();
        for m in [20.0f32, 50.0, 88.0, 100.0, 1000.0, 65504.0] {
            xs.push(m);
            xs.push(-m);
        }
        let t = padded(&xs, 2, 6, 9);
        let fwd = silu_forward(&t).unwrap().to_f32_vec();
        let grad = silu_local_grad(&t).unwrap().to_f32_vec();
        let upstream = f16_tensor(&[1.0; 12], 2, 6);
        let chained = silu_backward_chained(&t, &upstream).unwrap().to_f32_vec();
        for (i, &x) in xs.iter().enumerate() {
            let x = x as f64;
            assert!(close(fwd[i], silu_f64(x)), "silu({}) = {}", x, fwd[i]);
            assert!(close(grad[i], silu_grad_f64(x)), "silu'({}) = {}", x, grad[i]);
            assert!(close(chained[i], silu_grad_f64(x)), "1 * silu'({}) = {}", x, chained[i]);
        }
    }

    #[test]
    fn test_output_keeps_padded_layout() {
        let values: Vec<f32> = (0..15).map(|i| i as f32 * 0.25 - 2.0).collect();
        let t = padded(&values, 3, 5, 8);
        let out = silu_forward(&t).unwrap();
        assert_eq!(out.shape(), t.shape());
        assert_eq!(out.strides(), &[8, 1]);
        assert_eq!(out.storage().len(), t.storage().len());

        // Padding is never written, so it stays zero.
        let raw = out.storage().as_f16_slice().unwrap();
        for r in 0..2 {
            for c in 5..8 {
                assert_eq!(raw[r * 8 + c], f16::ZERO);
            }
        }
        // And never read: NaN sentinels did not leak into the result.
        assert!(out.to_f32_vec().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_multi_wave_rows() {
        // 5000 columns -> tile 8192, 32 warps, 1024 lanes per wave.
        let cols = 5000;
        let values: Vec<f32> = (0..2 * cols).map(|i| ((i % 97) as f32 - 48.0) / 8.0).collect();
        let t = padded(&values, 2, cols, cols + 3);
        let out = silu_forward(&t).unwrap().to_f32_vec();
        for (i, (&got, &x)) in out.iter().zip(&values).enumerate() {
            let x = f16::from_f32(x).to_f64();
            assert!(close(got, silu_f64(x)), "index {}: {} vs {}", i, got, silu_f64(x));
        }
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let t = Tensor::zeros(Shape::new(vec![2, 2, 2]), DType::F16);
        assert!(matches!(
            silu_forward(&t),
            Err(KernelError::InvalidShape { .. })
        ));
        assert!(matches!(
            silu_local_grad(&t),
            Err(KernelError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_rejects_f32_input() {
        let t = Tensor::zeros(Shape::new(vec![2, 2]), DType::F32);
        assert!(matches!(
            silu_forward(&t),
            Err(KernelError::Tensor(TensorError::DTypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_tile_must_cover_row() {
        let t = f16_tensor(&[1.0; 8], 1, 8);
        let cfg = LaunchConfig::with_params(1, 4, 4).unwrap();
        assert!(matches!(
            launch_unary(&SiluForward, &t, &cfg),
            Err(KernelError::LaunchConfiguration { .. })
        ));
    }

    #[test]
    fn test_small_waves_match_single_wave() {
        let values: Vec<f32> = (0..200).map(|i| (i as f32 - 100.0) / 16.0).collect();
        let t = f16_tensor(&values, 2, 100);
        let wide = silu_forward(&t).unwrap();
        // One warp per program: the 128-lane tile takes four waves.
        let cfg = LaunchConfig::with_params(2, 128, 1).unwrap();
        let narrow = launch_unary(&SiluForward, &t, &cfg).unwrap();
        assert_eq!(wide, narrow);
    }

    #[test]
    fn test_empty_inputs() {
        for dims in [vec![0, 7], vec![3, 0]] {
            let t = Tensor::zeros(Shape::new(dims.clone()), DType::F16);
            let out = silu_forward(&t).unwrap();
            assert_eq!(out.shape().dims(), dims.as_slice());
            assert!(out.to_f32_vec().is_empty());
        }
    }

    #[test]
    fn test_chained_scales_by_upstream() {
        let x = f16_tensor(&[0.0, 1.0, -1.0, 2.0], 2, 2);
        let g = padded(&[2.0, -1.0, 0.0, 0.5], 2, 2, 4);
        let local = silu_local_grad(&x).unwrap().to_f32_vec();
        let chained = silu_backward_chained(&x, &g).unwrap();
        assert_eq!(chained.strides(), x.strides());
        let chained = chained.to_f32_vec();
        for ((c, l), u) in chained.iter().zip(&local).zip([2.0f32, -1.0, 0.0, 0.5]) {
            assert_relative_eq!(*c, l * u, epsilon = 2e-3);
        }
    }

    #[test]
    fn test_chained_shape_mismatch() {
        let x = f16_tensor(&[0.0; 4], 2, 2);
        let g = f16_tensor(&[1.0; 6], 2, 3);
        assert!(matches!(
            silu_backward_chained(&x, &g),
            Err(KernelError::Tensor(TensorError::ShapeMismatch { .. }))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_forward_and_grad_match_f64(
            rows in 1usize..6,
            cols in 1usize..300,
            pad in 0usize..9,
            seed in any::<u64>(),
        ) {
            let n = rows * cols;
            let values: Vec<f32> = (0..n)
                .map(|i| {
                    let h = (seed ^ (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)) >> 40;
                    (h as f32 / (1u64 << 24) as f32) * 16.0 - 8.0
                })
                .collect();
            let t = padded(&values, rows, cols, cols + pad);

            let fwd = silu_forward(&t).unwrap();
            let grad = silu_local_grad(&t).unwrap();
            prop_assert_eq!(fwd.shape(), t.shape());
            prop_assert_eq!(fwd.strides(), t.strides());
            prop_assert_eq!(grad.strides(), t.strides());

            let xs = t.to_f32_vec();
            for ((&y, &g), &x) in fwd.to_f32_vec().iter().zip(&grad.to_f32_vec()).zip(&xs) {
                let x = x as f64;
                prop_assert!(close(y, silu_f64(x)), "silu({}) = {}", x, y);
                prop_assert!(close(g, silu_grad_f64(x)), "silu'({}) = {}", x, g);
            }
        }

        #[test]
        fn prop_full_f16_range_matches_f64(
            xs in proptest::collection::vec(-65504.0f32..=65504.0, 1..64),
        ) {
            let t = f16_tensor(&xs, 1, xs.len());
            let fwd = silu_forward(&t).unwrap().to_f32_vec();
            let grad = silu_local_grad(&t).unwrap().to_f32_vec();
            for ((&y, &g), &x) in fwd.iter().zip(&grad).zip(&t.to_f32_vec()) {
                let x = x as f64;
                prop_assert!(close(y, silu_f64(x)), "silu({}) = {}", x, y);
                prop_assert!(close(g, silu_grad_f64(x)), "silu'({}) = {}", x, g);
            }
        }
    }
}
