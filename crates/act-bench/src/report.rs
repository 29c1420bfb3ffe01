use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{Mode, ProviderKind};
use crate::error::Result;
use crate::harness::Measurement;

/// Plot/table name of the sweep.
pub const REPORT_NAME: &str = "silu-performance";

/// Bandwidth results of a sweep: one entry per column count, one
/// measurement per provider within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub matrix_rows: usize,
    pub mode: Mode,
    pub providers: Vec<ProviderKind>,
    entries: Vec<(usize, Vec<Measurement>)>,
}

impl Report {
    pub fn new(matrix_rows: usize, mode: Mode, providers: Vec<ProviderKind>) -> Self {
        Report {
            name: REPORT_NAME.to_string(),
            matrix_rows,
            mode,
            providers,
            entries: Vec::new(),
        }
    }

    /// Append the measurements for `cols`, ordered as `providers`.
    pub fn push(&mut self, cols: usize, measurements: Vec<Measurement>) {
        self.entries.push((cols, measurements));
    }

    pub fn entries(&self) -> &[(usize, Vec<Measurement>)] {
        &self.entries
    }

    /// Fixed-width text table of the headline GB/s per provider.
    pub fn render_table(&self) -> String {
        let mut out = format!(
            "{} (GB/s, {}, M={}):\n",
            self.name, self.mode, self.matrix_rows
        );
        out.push_str(&format!("{:>4} {:>10}", "", "N"));
        for p in &self.providers {
            out.push_str(&format!(" {:>12}", p.label()));
        }
        out.push('\n');
        for (i, (cols, row)) in self.entries.iter().enumerate() {
            out.push_str(&format!("{:>4} {:>10.1}", i, *cols as f64));
            for m in row {
                out.push_str(&format!(" {:>12.6}", m.gbps));
            }
            out.push('\n');
        }
        out
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    /// Write the report as CSV: `N` then, per provider, the headline,
    /// low and high GB/s.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        write!(w, "N")?;
        for p in &self.providers {
            let l = p.label();
            write!(w, ",{l},{l}-min,{l}-max")?;
        }
        writeln!(w)?;
        for (cols, row) in &self.entries {
            write!(w, "{}", cols)?;
            for m in row {
                write!(w, ",{},{},{}", m.gbps, m.gbps_low, m.gbps_high)?;
            }
            writeln!(w)?;
        }
        w.flush()?;
        Ok(())
    }
}
