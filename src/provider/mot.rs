//! Data provider for MOT (Multi-Object Tracking) text files.
//!
//! One detection per line:
//! `frame,track_id,bb_left,bb_top,bb_width,bb_height,confidence,x,y[,z]`
//! The trailing `z` coordinate is optional and defaults to 0.
//!
//! The file is read and parsed once at open; `load` then serves a frame's
//! detections from the in-memory index.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::provider::DataProvider;
use crate::Key;

#[derive(Error, Debug)]
pub enum MotDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed detection at {path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("frame {0} not present in data file")]
    UnknownFrame(Key),
}

/// A single detection row.
#[derive(Debug, Clone, PartialEq)]
pub struct MotDetection {
    pub frame: u64,
    pub track_id: u64,
    pub bb_left: f64,
    pub bb_top: f64,
    pub bb_width: f64,
    pub bb_height: f64,
    pub confidence: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotDetection {
    /// Parse one CSV line (9 or 10 fields).
    fn parse(line: &str) -> Result<Self, String> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 9 && fields.len() != 10 {
            return Err(format!("expected 9 or 10 fields, got {}", fields.len()));
        }

        let int = |idx: usize, name: &str| -> Result<u64, String> {
            fields[idx]
                .parse::<u64>()
                .map_err(|e| format!("bad {name} {:?}: {e}", fields[idx]))
        };
        let float = |idx: usize, name: &str| -> Result<f64, String> {
            fields[idx]
                .parse::<f64>()
                .map_err(|e| format!("bad {name} {:?}: {e}", fields[idx]))
        };

        Ok(Self {
            frame: int(0, "frame")?,
            track_id: int(1, "track_id")?,
            bb_left: float(2, "bb_left")?,
            bb_top: float(3, "bb_top")?,
            bb_width: float(4, "bb_width")?,
            bb_height: float(5, "bb_height")?,
            confidence: float(6, "confidence")?,
            x: float(7, "x")?,
            y: float(8, "y")?,
            z: if fields.len() == 10 {
                float(9, "z")?
            } else {
                0.0
            },
        })
    }
}

/// All detections belonging to one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MotFrameData {
    pub frame_number: u64,
    pub detections: Vec<MotDetection>,
}

/// [`DataProvider`] over an in-memory index of a MOT file.
#[derive(Debug)]
pub struct MotDataProvider {
    path: PathBuf,
    frames: HashMap<u64, Vec<MotDetection>>,
    total_detections: usize,
    load_calls: AtomicU64,
}

impl MotDataProvider {
    /// Read and index a MOT data file. Blank lines are skipped; any
    /// malformed line fails the whole open.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, MotDataError> {
        let path = path.as_ref().to_path_buf();
        let data = fs::read_to_string(&path).await?;

        let mut frames: HashMap<u64, Vec<MotDetection>> = HashMap::new();
        let mut total_detections = 0;

        for (idx, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let detection =
                MotDetection::parse(line).map_err(|reason| MotDataError::Malformed {
                    path: path.clone(),
                    line: idx + 1,
                    reason,
                })?;
            frames.entry(detection.frame).or_default().push(detection);
            total_detections += 1;
        }

        info!(
            path = %path.display(),
            frames = frames.len(),
            detections = total_detections,
            "Indexed MOT data file"
        );

        Ok(Self {
            path,
            frames,
            total_detections,
            load_calls: AtomicU64::new(0),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataProvider for MotDataProvider {
    type Value = MotFrameData;

    async fn load(&self, key: Key) -> anyhow::Result<MotFrameData> {
        self.load_calls.fetch_add(1, Ordering::Relaxed);
        let detections = self
            .frames
            .get(&key)
            .ok_or(MotDataError::UnknownFrame(key))?;
        Ok(MotFrameData {
            frame_number: key,
            detections: detections.clone(),
        })
    }

    fn available_keys(&self) -> BTreeSet<Key> {
        self.frames.keys().copied().collect()
    }

    fn total_keys(&self) -> usize {
        self.frames.len()
    }

    fn value_weight(&self, value: &MotFrameData) -> usize {
        value.detections.len()
    }

    fn stats(&self) -> HashMap<String, serde_json::Value> {
        let mut stats = HashMap::new();
        stats.insert("total_frames".to_string(), json!(self.frames.len()));
        stats.insert(
            "total_detections".to_string(),
            json!(self.total_detections),
        );
        stats.insert(
            "load_calls".to_string(),
            json!(self.load_calls.load(Ordering::Relaxed)),
        );
        stats
    }
}
