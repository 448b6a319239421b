//! JSON-lines pose input.
//!
//! One frame per line:
//! `{"timestamp_ms": 1200, "landmarks": [{"x": 0.5, "y": 0.4, "z": 0.0, "visibility": 0.9}, ...]}`.
//! `z` and `visibility` may be omitted. Blank lines are skipped.

use reptrack_traits::{Landmark, PoseFrame, PoseSource};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LandmarkLine {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
    #[serde(default)]
    visibility: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct FrameLine {
    timestamp_ms: u64,
    #[serde(default)]
    landmarks: Vec<LandmarkLine>,
}

impl From<FrameLine> for PoseFrame {
    fn from(f: FrameLine) -> Self {
        let landmarks = f
            .landmarks
            .into_iter()
            .map(|l| Landmark {
                x: l.x,
                y: l.y,
                z: l.z,
                visibility: l.visibility,
            })
            .collect();
        PoseFrame::new(f.timestamp_ms, landmarks)
    }
}

pub struct JsonlPoseSource<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> JsonlPoseSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

/// Frames from `path`, or stdin when `path` is `-`.
pub fn open(path: &Path) -> eyre::Result<JsonlPoseSource<Box<dyn BufRead + Send>>> {
    let reader: Box<dyn BufRead + Send> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file =
            File::open(path).map_err(|e| eyre::eyre!("open frames {}: {e}", path.display()))?;
        Box::new(BufReader::new(file))
    };
    Ok(JsonlPoseSource::new(reader))
}

impl<R: BufRead> PoseSource for JsonlPoseSource<R> {
    fn next_frame(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<Option<PoseFrame>, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            let frame: FrameLine = serde_json::from_str(line)
                .map_err(|e| format!("frame line {}: {e}", self.line_no))?;
            return Ok(Some(frame.into()));
        }
    }
}
