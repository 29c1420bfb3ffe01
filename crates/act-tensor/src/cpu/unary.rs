// Scalar activation math shared by the reference backend.

/// SiLU of a single value: `x / (1 + exp(-x))`.
#[inline]
pub fn silu(x: f32) -> f32 {
    x / (1.0 + (-x).exp())
}

/// Derivative of SiLU at `x`.
///
/// Equal to `(1 + e + x*e) / (1 + e)^2` with `e = exp(-x)`, but computed as
/// `sigmoid(x) * (1 + x * (1 - sigmoid(x)))` so it stays finite when `e`
/// overflows.
#[inline]
pub fn silu_grad(x: f32) -> f32 {
    let s = 1.0 / (1.0 + (-x).exp());
    s * (1.0 + x * (1.0 - s))
}
