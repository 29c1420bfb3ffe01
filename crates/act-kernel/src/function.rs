use std::sync::Arc;

use act_tensor::Tensor;
use tracing::trace;

use crate::error::Result;
use crate::kernel;
use crate::launch::dims_2d;

/// What the backward pass returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackwardMode {
    /// The local derivative `silu'(x)` alone. The upstream gradient is
    /// accepted but not multiplied in, which is only the true gradient when
    /// the operator is the last node of the graph with an implicit upstream
    /// gradient of ones.
    #[default]
    LocalDerivative,
    /// `upstream * silu'(x)`, the reverse-mode chain rule.
    ChainRule,
}

/// SiLU as a differentiable operator backed by the tiled row kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiluFunction {
    mode: BackwardMode,
}

impl SiluFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// An operator whose contexts run `mode` on backward.
    pub fn with_mode(mode: BackwardMode) -> Self {
        SiluFunction { mode }
    }

    pub fn mode(&self) -> BackwardMode {
        self.mode
    }

    /// Forward pass.
    ///
    /// Runs the forward kernel and returns the output together with a
    /// context holding `input` (not the output) for the backward pass.
    pub fn apply_forward(&self, input: impl Into<Arc<Tensor>>) -> Result<(Tensor, SiluContext)> {
        let input = input.into();
        let output = kernel::silu_forward(&input)?;
        let ctx = SiluContext {
            saved_input: input,
            mode: self.mode,
        };
        Ok((output, ctx))
    }

    /// Backward pass returning the local derivative at `saved_input`.
    ///
    /// `upstream_gradient` must be rank 2 but its values are not used.
    pub fn apply_backward(saved_input: &Tensor, upstream_gradient: &Tensor) -> Result<Tensor> {
        dims_2d(upstream_gradient)?;
        kernel::silu_local_grad(saved_input)
    }

    /// Backward pass returning `upstream_gradient * silu'(saved_input)`.
    pub fn apply_backward_chained(
        saved_input: &Tensor,
        upstream_gradient: &Tensor,
    ) -> Result<Tensor> {
        kernel::silu_backward_chained(saved_input, upstream_gradient)
    }
}

/// State saved by a forward pass for its matching backward pass.
///
/// Cloning shares the saved input, so a clone per call supports running
/// backward repeatedly against one forward.
#[derive(Debug, Clone)]
pub struct SiluContext {
    saved_input: Arc<Tensor>,
    mode: BackwardMode,
}

impl SiluContext {
    /// The forward pass's input.
    pub fn saved_input(&self) -> &Tensor {
        &self.saved_input
    }

    pub fn mode(&self) -> BackwardMode {
        self.mode
    }

    /// Gradient with respect to the forward input, consuming the context.
    pub fn backward(self, upstream_gradient: &Tensor) -> Result<Tensor> {
        trace!(mode = ?self.mode, "silu backward");
        match self.mode {
            BackwardMode::LocalDerivative => {
                SiluFunction::apply_backward(&self.saved_input, upstream_gradient)
            }
            BackwardMode::ChainRule => {
                SiluFunction::apply_backward_chained(&self.saved_input, upstream_gradient)
            }
        }
    }
}
