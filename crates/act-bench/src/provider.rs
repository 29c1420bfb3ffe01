use std::fmt::Debug;
use std::sync::Arc;

use act_kernel::{SiluContext, SiluFunction};
use act_tensor::{ComputeBackend, CpuBackend, Tensor};

use crate::config::ProviderKind;
use crate::error::Result;

/// A SiLU implementation the harness can time.
pub trait SiluProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "tiled").
    fn name(&self) -> &str;

    /// Forward pass only.
    fn forward(&self, input: &Arc<Tensor>) -> Result<Tensor>;

    /// Runs forward once and keeps what backward needs, so backward can be
    /// timed on its own.
    fn record(&self, input: &Arc<Tensor>) -> Result<Box<dyn GradTape>>;
}

/// Saved forward state that can run backward any number of times.
pub trait GradTape: Send {
    fn backward(&self, upstream: &Tensor) -> Result<Tensor>;
}

/// Build the provider for `kind`.
pub fn make_provider(kind: ProviderKind) -> Box<dyn SiluProvider> {
    match kind {
        ProviderKind::Tiled => Box::new(TiledSilu::default()),
        ProviderKind::Reference => Box::new(ReferenceSilu::default()),
    }
}

/// The tiled row kernels behind [`SiluFunction`].
#[derive(Debug, Clone, Default)]
pub struct TiledSilu {
    function: SiluFunction,
}

impl TiledSilu {
    pub fn new(function: SiluFunction) -> Self {
        TiledSilu { function }
    }
}

impl SiluProvider for TiledSilu {
    fn name(&self) -> &str {
        "tiled"
    }

    fn forward(&self, input: &Arc<Tensor>) -> Result<Tensor> {
        let (output, _) = self.function.apply_forward(Arc::clone(input))?;
        Ok(output)
    }

    fn record(&self, input: &Arc<Tensor>) -> Result<Box<dyn GradTape>> {
        let (_, ctx) = self.function.apply_forward(Arc::clone(input))?;
        Ok(Box::new(TiledTape(ctx)))
    }
}

struct TiledTape(SiluContext);

impl GradTape for TiledTape {
    fn backward(&self, upstream: &Tensor) -> Result<Tensor> {
        // The context is consumed by backward; clones share the saved input.
        Ok(self.0.clone().backward(upstream)?)
    }
}

/// Contiguous f32 loops from [`CpuBackend`], widening and narrowing at the
/// tensor boundary.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSilu {
    backend: CpuBackend,
}

impl SiluProvider for ReferenceSilu {
    fn name(&self) -> &str {
        "reference"
    }

    fn forward(&self, input: &Arc<Tensor>) -> Result<Tensor> {
        let y = self.backend.silu(&input.to_f32_vec())?;
        Ok(Tensor::from_f32_values(&y, input.shape().clone(), input.dtype()))
    }

    fn record(&self, input: &Arc<Tensor>) -> Result<Box<dyn GradTape>> {
        let x = input.to_f32_vec();
        self.backend.silu(&x)?;
        Ok(Box::new(ReferenceTape {
            x,
            like: Arc::clone(input),
            backend: self.backend.clone(),
        }))
    }
}

/// Keeps the input already widened, so backward only widens `upstream`.
struct ReferenceTape {
    x: Vec<f32>,
    like: Arc<Tensor>,
    backend: CpuBackend,
}

impl GradTape for ReferenceTape {
    fn backward(&self, upstream: &Tensor) -> Result<Tensor> {
        let g = self.backend.silu_backward(&self.x, &upstream.to_f32_vec())?;
        Ok(Tensor::from_f32_values(&g, self.like.shape().clone(), self.like.dtype()))
    }
}
