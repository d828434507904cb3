#![deny(warnings)]

//! Telemetry export for simulation runs.
//!
//! Each processed burst can append one [`TickRow`] to a JSON-lines file;
//! `read_rows` and `summarize` turn a finished run back into headline
//! numbers. The writer knows nothing about the simulation crates — callers
//! flatten their reports into plain rows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One telemetry row, written after a processed burst.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickRow {
    /// World clock after the burst.
    pub tick: u64,
    /// Gold balance after the burst.
    pub gold: f64,
    /// Nodes currently held.
    pub claimed_nodes: u64,
    /// Timers drained during the burst.
    pub timers_fired: u64,
}

/// Append-only JSON-lines writer.
pub struct TelemetryWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl TelemetryWriter {
    /// Create (truncating) a telemetry file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating telemetry dir for {}", path.display()))?;
        }
        let file = File::create(&path)
            .with_context(|| format!("creating telemetry file {}", path.display()))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn append(&mut self, row: &TickRow) -> Result<()> {
        let line = serde_json::to_string(row)?;
        writeln!(self.out, "{line}")?;
        debug!(tick = row.tick, "telemetry row appended");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("flushing telemetry file {}", self.path.display()))
    }
}

/// Read every row of a telemetry file, skipping blank lines.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<TickRow>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("opening telemetry file {}", path.as_ref().display()))?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

/// Headline numbers for a finished run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub rows: usize,
    pub final_tick: u64,
    pub gold_delta: f64,
    pub timers_fired_total: u64,
}

/// Summarize rows in file order; `None` for an empty run.
pub fn summarize(rows: &[TickRow]) -> Option<TelemetrySummary> {
    let first = rows.first()?;
    let last = rows.last()?;
    Some(TelemetrySummary {
        rows: rows.len(),
        final_tick: last.tick,
        gold_delta: last.gold - first.gold,
        timers_fired_total: rows.iter().map(|r| r.timers_fired).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tick: u64, gold: f64, fired: u64) -> TickRow {
        TickRow {
            tick,
            gold,
            claimed_nodes: 2,
            timers_fired: fired,
        }
    }

    #[test]
    fn rows_roundtrip_through_the_file() {
        let dir = std::env::temp_dir().join("hearthvale-telemetry-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.jsonl");

        let rows = vec![row(5, 10.0, 0), row(10, 35.5, 1), row(15, 62.0, 2)];
        let mut writer = TelemetryWriter::create(&path).unwrap();
        for r in &rows {
            writer.append(r).unwrap();
        }
        writer.flush().unwrap();

        let back = read_rows(&path).unwrap();
        assert_eq!(back, rows);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn summary_reports_deltas_and_totals() {
        let rows = vec![row(5, 10.0, 0), row(15, 62.0, 3)];
        let summary = summarize(&rows).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.final_tick, 15);
        assert!((summary.gold_delta - 52.0).abs() < 1e-9);
        assert_eq!(summary.timers_fired_total, 3);
    }

    #[test]
    fn empty_runs_have_no_summary() {
        assert_eq!(summarize(&[]), None);
    }
}
