use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Which pass is timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Time the forward pass alone.
    Forward,
    /// Run forward once, then time repeated backward passes.
    Backward,
}

impl Mode {
    /// Memory traffic multiplier for the bandwidth figure.
    pub fn traffic_factor(&self) -> f64 {
        match self {
            Mode::Forward => 1.0,
            Mode::Backward => 2.0,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Forward => write!(f, "forward"),
            Mode::Backward => write!(f, "backward"),
        }
    }
}

/// Implementation under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Row-parallel tiled kernels with the differentiable wrapper.
    Tiled,
    /// Straightforward contiguous loops from the reference backend.
    Reference,
}

impl ProviderKind {
    /// Column heading used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Tiled => "Tiled",
            ProviderKind::Reference => "Reference",
        }
    }
}

/// Parameters of the timing loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Time budget for warmup calls, in milliseconds.
    pub warmup_ms: f64,
    /// Time budget for measured calls, in milliseconds.
    pub rep_ms: f64,
    /// Size of the buffer overwritten before each measured call to evict
    /// the input from cache. 0 disables flushing.
    pub flush_bytes: usize,
    /// Upper bound on measured calls regardless of the time budget.
    pub max_reps: usize,
    /// Quantiles reported, in order. The first is the headline figure.
    pub quantiles: Vec<f64>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            warmup_ms: 25.0,
            rep_ms: 100.0,
            flush_bytes: 256 * 1024 * 1024,
            max_reps: 10_000,
            quantiles: vec![0.5, 0.2, 0.8],
        }
    }
}

/// A full benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Rows of the input matrix (M).
    pub rows: usize,
    /// Column counts swept (N).
    pub cols: Vec<usize>,
    pub mode: Mode,
    pub providers: Vec<ProviderKind>,
    /// Seed for the random input.
    pub seed: u64,
    pub timing: TimingConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            rows: 1024,
            cols: vec![11008],
            mode: Mode::Backward,
            providers: vec![ProviderKind::Tiled, ProviderKind::Reference],
            seed: 0,
            timing: TimingConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Checks the config describes a runnable benchmark.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(BenchError::InvalidConfig("rows must be > 0".to_string()));
        }
        if self.cols.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one column count is required".to_string(),
            ));
        }
        if self.cols.contains(&0) {
            return Err(BenchError::InvalidConfig("cols must be > 0".to_string()));
        }
        if self.providers.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one provider is required".to_string(),
            ));
        }
        let t = &self.timing;
        if t.quantiles.is_empty() {
            return Err(BenchError::InvalidConfig(
                "at least one quantile is required".to_string(),
            ));
        }
        if let Some(q) = t.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(BenchError::InvalidConfig(format!(
                "quantile {} is outside [0, 1]",
                q
            )));
        }
        if !(t.warmup_ms >= 0.0 && t.rep_ms > 0.0) {
            return Err(BenchError::InvalidConfig(format!(
                "warmup_ms must be >= 0 and rep_ms > 0, got {} and {}",
                t.warmup_ms, t.rep_ms
            )));
        }
        if t.max_reps == 0 {
            return Err(BenchError::InvalidConfig("max_reps must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_problem() {
        let c = BenchConfig::default();
        assert_eq!(c.rows, 1024);
        assert_eq!(c.cols, vec![11008]);
        assert_eq!(c.mode, Mode::Backward);
        assert_eq!(c.timing.quantiles, vec![0.5, 0.2, 0.8]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let mut c = BenchConfig::default();
        c.rows = 0;
        assert!(c.validate().is_err());

        let mut c = BenchConfig::default();
        c.cols = vec![128, 0];
        assert!(c.validate().is_err());

        let mut c = BenchConfig::default();
        c.providers.clear();
        assert!(c.validate().is_err());

        let mut c = BenchConfig::default();
        c.timing.quantiles = vec![0.5, 1.5];
        assert!(c.validate().is_err());

        let mut c = BenchConfig::default();
        c.timing.rep_ms = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_traffic_factor() {
        assert_eq!(Mode::Forward.traffic_factor(), 1.0);
        assert_eq!(Mode::Backward.traffic_factor(), 2.0);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&(Mode::Backward, ProviderKind::Tiled)).unwrap();
        assert_eq!(json, r#"["backward","tiled"]"#);
        let back: BenchConfig =
            serde_json::from_str(&serde_json::to_string(&BenchConfig::default()).unwrap()).unwrap();
        assert_eq!(back, BenchConfig::default());
    }
}
