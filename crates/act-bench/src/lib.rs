//! `act-bench` - Throughput harness for the SiLU kernels.
//!
//! Times the tiled kernels from `act-kernel` and the reference loops from
//! `act-tensor` on the same random half-precision input and reports
//! bandwidth in GB/s, for the forward pass or for repeated backward passes.

pub mod config;
pub mod error;
pub mod harness;
pub mod provider;
pub mod report;
pub mod timing;

pub use config::{BenchConfig, Mode, ProviderKind, TimingConfig};
pub use error::{BenchError, Result};
pub use harness::{run, run_case, Measurement};
pub use provider::{make_provider, GradTape, ReferenceSilu, SiluProvider, TiledSilu};
pub use report::Report;
