//! Session history as JSON lines.

use reptrack_core::error::{Result, TrackerError};
use reptrack_core::session::{SessionRecord, SessionSink};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Keeps every record for the final report and optionally appends it to a file.
#[derive(Debug, Default)]
pub struct HistorySink {
    file: Option<File>,
    records: Vec<SessionRecord>,
}

impl HistorySink {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(|p| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(p)
                    .map_err(|e| TrackerError::Sink(format!("open {}: {e}", p.display())))
            })
            .transpose()?;
        Ok(Self {
            file,
            records: Vec::new(),
        })
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }
}

impl SessionSink for HistorySink {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            let line =
                serde_json::to_string(record).map_err(|e| TrackerError::Sink(e.to_string()))?;
            writeln!(file, "{line}").map_err(|e| TrackerError::Sink(e.to_string()))?;
            file.flush().map_err(|e| TrackerError::Sink(e.to_string()))?;
        }
        tracing::info!(kind = ?record.kind, sets = record.set_count, "session recorded");
        self.records.push(record.clone());
        Ok(())
    }
}
