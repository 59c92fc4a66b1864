//! Optional append-only snapshot log.
//!
//! One JSON document per line. The log only ever consumes the read-only
//! history sequence; nothing is written back into the pipeline. Malformed
//! lines (a truncated final write, say) are skipped on load rather than
//! failing the whole file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::snapshot::MetricsSnapshot;

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(snapshot)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    pub fn append_all<'a>(
        &self,
        snapshots: impl IntoIterator<Item = &'a MetricsSnapshot>,
    ) -> Result<()> {
        for snapshot in snapshots {
            self.append(snapshot)?;
        }
        Ok(())
    }

    /// Load up to the last `max_points` snapshots, oldest-to-newest.
    pub fn load(&self, max_points: usize) -> Result<Vec<MetricsSnapshot>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut snapshots = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MetricsSnapshot>(&line) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed history line");
                }
            }
        }
        if snapshots.len() > max_points {
            snapshots.drain(..snapshots.len() - max_points);
        }
        Ok(snapshots)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
