//! JSON run records for tracking solver performance across changes.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One timed solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Solve family ("tv1_1d", "tv1_2d", ...).
    pub family: String,
    /// Method tag within the family.
    pub method: String,
    /// Total signal elements.
    pub n: usize,
    /// Penalty weight (nominal weight for the weighted families).
    pub weight: f64,
    /// Iterations reported by the solver.
    pub iters: usize,
    /// Final dual gap or outer stopping metric.
    pub gap: f64,
    /// Whether the stopping tolerance was reached.
    pub converged: bool,
    /// Wall-clock solve time in milliseconds.
    pub time_ms: f64,
}

/// A full benchmark sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Every timed solve, in execution order.
    pub runs: Vec<RunRecord>,
    /// Wall-clock time of the whole sweep in milliseconds.
    pub total_time_ms: f64,
}

impl Report {
    pub fn new(runs: Vec<RunRecord>, total_time_ms: f64) -> Self {
        Self {
            runs,
            total_time_ms,
        }
    }

    /// Save to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create file {}", path.as_ref().display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.as_ref().display()))?;
        Ok(())
    }
}
