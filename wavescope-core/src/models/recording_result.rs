use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::{ByteOrder, SampleFormat};

/// Result returned when a recording has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub frame_count: u64,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the optional JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub frame_count: u64,
    pub sample_rate: f64,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub byte_order: ByteOrder,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(format: &SampleFormat, frame_count: u64, file_path: &str, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs: frame_count as f64 / format.sample_rate(),
            frame_count,
            sample_rate: format.sample_rate(),
            bits_per_sample: format.bits_per_sample(),
            channels: format.channels(),
            byte_order: format.byte_order(),
            checksum: checksum.to_string(),
        }
    }
}
