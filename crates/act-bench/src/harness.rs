use std::hint::black_box;
use std::sync::Arc;

use act_kernel::launch::dims_2d;
use act_tensor::{DType, Shape, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BenchConfig, Mode, ProviderKind, TimingConfig};
use crate::error::Result;
use crate::provider::{make_provider, SiluProvider};
use crate::report::Report;
use crate::timing::do_bench;

/// Bandwidth of one case, in GB/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub provider: ProviderKind,
    pub rows: usize,
    pub cols: usize,
    pub mode: Mode,
    /// Bandwidth at the first requested quantile (the median by default).
    pub gbps: f64,
    /// Bandwidth at the slowest requested quantile.
    pub gbps_low: f64,
    /// Bandwidth at the fastest requested quantile.
    pub gbps_high: f64,
    /// Per-call time at the first requested quantile.
    pub ms: f64,
}

/// Bytes the timed pass is credited with moving.
pub fn bytes_moved(numel: usize, element_size: usize, mode: Mode) -> f64 {
    mode.traffic_factor() * (numel * element_size) as f64
}

/// `bytes / ms * 1e-6`, i.e. GB/s.
pub fn gbps(bytes: f64, ms: f64) -> f64 {
    bytes / ms * 1e-6
}

/// Time one provider on one problem size.
pub fn run_case(
    provider: &dyn SiluProvider,
    kind: ProviderKind,
    input: &Arc<Tensor>,
    mode: Mode,
    timing: &TimingConfig,
) -> Result<Measurement> {
    let (rows, cols) = dims_2d(input)?;

    let timings = match mode {
        Mode::Forward => do_bench(
            || {
                black_box(provider.forward(input)?);
                Ok(())
            },
            timing,
        )?,
        Mode::Backward => {
            let tape = provider.record(input)?;
            let upstream = Tensor::ones(input.shape().clone(), input.dtype());
            do_bench(
                || {
                    black_box(tape.backward(&upstream)?);
                    Ok(())
                },
                timing,
            )?
        }
    };

    let bytes = bytes_moved(input.numel(), input.element_size(), mode);
    let ms = timings.quantiles_ms[0];
    let (fastest, slowest) = timings
        .quantiles_ms
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), &t| (lo.min(t), hi.max(t)));

    let m = Measurement {
        provider: kind,
        rows,
        cols,
        mode,
        gbps: gbps(bytes, ms),
        gbps_low: gbps(bytes, slowest),
        gbps_high: gbps(bytes, fastest),
        ms,
    };
    info!(
        provider = provider.name(),
        rows,
        cols,
        mode = %mode,
        gbps = m.gbps,
        low = m.gbps_low,
        high = m.gbps_high,
        "measured"
    );
    Ok(m)
}

/// Run every (cols, provider) pair of `config`.
pub fn run(config: &BenchConfig) -> Result<Report> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = Report::new(config.rows, config.mode, config.providers.clone());

    for &cols in &config.cols {
        let shape = Shape::new(vec![config.rows, cols]);
        let input = Arc::new(Tensor::rand(shape, DType::F16, &mut rng));
        let mut row = Vec::with_capacity(config.providers.len());
        for &kind in &config.providers {
            let provider = make_provider(kind);
            row.push(run_case(
                provider.as_ref(),
                kind,
                &input,
                config.mode,
                &config.timing,
            )?);
        }
        report.push(cols, row);
    }
    Ok(report)
}
