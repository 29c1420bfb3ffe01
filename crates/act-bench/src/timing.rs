use std::hint::black_box;
use std::time::Instant;

use tracing::debug;

use crate::config::TimingConfig;
use crate::error::{BenchError, Result};

/// Calls used to estimate the cost of one call.
const ESTIMATE_CALLS: usize = 5;

/// Per-call timings of one benchmarked closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// Measured per-call durations in milliseconds, sorted ascending.
    pub samples_ms: Vec<f64>,
    /// The requested quantiles of `samples_ms`, in request order.
    pub quantiles_ms: Vec<f64>,
}

/// Time `f` the way GPU microbenchmarks are usually timed.
///
/// One untimed call, a cost estimate over a few calls, warmup calls filling
/// `warmup_ms`, then as many measured calls as fit in `rep_ms` (capped at
/// `max_reps`). A scratch buffer is overwritten before every measured call
/// so the operands do not stay resident in cache.
pub fn do_bench<F>(mut f: F, cfg: &TimingConfig) -> Result<Timings>
where
    F: FnMut() -> Result<()>,
{
    if cfg.quantiles.is_empty() {
        return Err(BenchError::InvalidConfig(
            "at least one quantile is required".to_string(),
        ));
    }

    f()?;

    let mut cache = vec![0u8; cfg.flush_bytes];
    let start = Instant::now();
    for _ in 0..ESTIMATE_CALLS {
        flush(&mut cache);
        f()?;
    }
    // Floor the estimate so trivially cheap closures still get bounded counts.
    let estimate_ms = (elapsed_ms(start) / ESTIMATE_CALLS as f64).max(1e-6);

    let n_warmup = ((cfg.warmup_ms / estimate_ms) as usize).clamp(1, cfg.max_reps);
    let n_repeat = ((cfg.rep_ms / estimate_ms) as usize).clamp(1, cfg.max_reps);
    debug!(estimate_ms, n_warmup, n_repeat, "timing plan");

    for _ in 0..n_warmup {
        f()?;
    }

    let mut samples_ms = Vec::with_capacity(n_repeat);
    for _ in 0..n_repeat {
        flush(&mut cache);
        let start = Instant::now();
        f()?;
        samples_ms.push(elapsed_ms(start));
    }
    samples_ms.sort_by(|a, b| a.total_cmp(b));

    let quantiles_ms = cfg
        .quantiles
        .iter()
        .map(|&q| quantile(&samples_ms, q))
        .collect();
    Ok(Timings {
        samples_ms,
        quantiles_ms,
    })
}

/// Quantile `q` of ascending `sorted` data with linear interpolation
/// between the two nearest ranks.
///
/// # Panics
/// Panics if `sorted` is empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty(), "quantile of empty sample");
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn flush(cache: &mut [u8]) {
    cache.fill(0);
    black_box(cache);
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quick() -> TimingConfig {
        TimingConfig {
            warmup_ms: 1.0,
            rep_ms: 2.0,
            flush_bytes: 1024,
            max_reps: 50,
            quantiles: vec![0.5, 0.2, 0.8],
        }
    }

    #[test]
    fn test_quantile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(quantile(&data, 0.5), 3.0);
        assert_relative_eq!(quantile(&data, 0.0), 1.0);
        assert_relative_eq!(quantile(&data, 1.0), 5.0);
        // pos = 0.2 * 4 = 0.8
        assert_relative_eq!(quantile(&data, 0.2), 1.8);
        assert_relative_eq!(quantile(&[1.0, 3.0], 0.5), 2.0);
        assert_relative_eq!(quantile(&[7.0], 0.8), 7.0);
    }

    #[test]
    fn test_do_bench_counts_and_order() {
        let mut calls = 0usize;
        let t = do_bench(
            || {
                calls += 1;
                black_box((0..1000u64).sum::<u64>());
                Ok(())
            },
            &quick(),
        )
        .unwrap();
        assert!(!t.samples_ms.is_empty());
        assert!(t.samples_ms.len() <= 50);
        assert!(t.samples_ms.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(t.quantiles_ms.len(), 3);
        // 20th percentile <= median <= 80th percentile.
        assert!(t.quantiles_ms[1] <= t.quantiles_ms[0]);
        assert!(t.quantiles_ms[0] <= t.quantiles_ms[2]);
        assert!(calls >= 1 + ESTIMATE_CALLS + 1 + t.samples_ms.len());
    }

    #[test]
    fn test_do_bench_propagates_errors() {
        let err = do_bench(
            || Err(BenchError::InvalidConfig("boom".to_string())),
            &quick(),
        )
        .unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }
}
