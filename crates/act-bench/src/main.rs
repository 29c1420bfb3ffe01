//! SiLU bandwidth benchmark
//!
//! Compares the tiled row kernels against the reference backend on an
//! `M x N` half-precision input and prints GB/s per provider.
//!
//! ```bash
//! # Backward pass, default 1024 x 11008 problem
//! act-bench
//!
//! # Forward pass over several widths, results to JSON
//! act-bench --mode forward --cols 4096 --cols 11008 --json silu.json
//! ```

use std::path::PathBuf;

use act_bench::{BenchConfig, Mode, ProviderKind, TimingConfig};
use anyhow::{Context, Result};
use clap::Parser;

/// SiLU forward/backward bandwidth benchmark
#[derive(Parser, Debug)]
#[command(name = "act-bench")]
#[command(about = "Benchmark the tiled SiLU kernels against the reference backend")]
#[command(version)]
struct Args {
    /// Rows of the input matrix (M)
    #[arg(long, default_value_t = 1024)]
    rows: usize,

    /// Columns of the input matrix (N); repeat to sweep several widths
    #[arg(long, default_values_t = [11008])]
    cols: Vec<usize>,

    /// Pass to time
    #[arg(long, value_enum, default_value_t = Mode::Backward)]
    mode: Mode,

    /// Implementations to compare; repeat to select several
    #[arg(long, value_enum, default_values_t = [ProviderKind::Tiled, ProviderKind::Reference])]
    provider: Vec<ProviderKind>,

    /// Warmup budget per case, in milliseconds
    #[arg(long, default_value_t = 25.0)]
    warmup_ms: f64,

    /// Measurement budget per case, in milliseconds
    #[arg(long, default_value_t = 100.0)]
    rep_ms: f64,

    /// Bytes overwritten before each measured call (0 disables)
    #[arg(long, default_value_t = 256 * 1024 * 1024)]
    flush_bytes: usize,

    /// Upper bound on measured calls per case
    #[arg(long, default_value_t = 10_000)]
    max_reps: usize,

    /// Seed for the random input
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker threads for the row programs (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Write the report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write the report as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> BenchConfig {
        BenchConfig {
            rows: self.rows,
            cols: self.cols.clone(),
            mode: self.mode,
            providers: self.provider.clone(),
            seed: self.seed,
            timing: TimingConfig {
                warmup_ms: self.warmup_ms,
                rep_ms: self.rep_ms,
                flush_bytes: self.flush_bytes,
                max_reps: self.max_reps,
                ..TimingConfig::default()
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the worker pool")?;
    }

    let config = args.to_config();
    tracing::info!(
        rows = config.rows,
        cols = ?config.cols,
        mode = %config.mode,
        threads = rayon::current_num_threads(),
        "starting benchmark"
    );

    let report = act_bench::run(&config).context("benchmark failed")?;
    print!("{}", report.render_table());

    if let Some(path) = &args.json {
        report
            .write_json(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
    }
    if let Some(path) = &args.csv {
        report
            .write_csv(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Wrote {}", path.display());
    }

    Ok(())
}
