use std::path::PathBuf;
use std::time::Duration;

use super::error::CaptureError;
use super::format::SampleFormat;

/// Bytes pulled from the line per read cycle.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// How long `stop_capture` waits for the producer before force-closing the line.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// File written by `stop_recording` unless configured otherwise.
pub const DEFAULT_RECORDING_FILENAME: &str = "recording.wav";

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfiguration {
    /// PCM layout requested from every device (default: 44.1 kHz, 16-bit, mono, big-endian).
    pub format: SampleFormat,

    /// Size of the raw read buffer in bytes (default: 4096).
    pub chunk_size: usize,

    /// Bounded wait for the producer thread on stop (default: 1 s).
    pub stop_timeout: Duration,

    /// Where `stop_recording` saves the container (default: `recording.wav`).
    pub output_path: PathBuf,

    /// Write a `<file>.metadata.json` sidecar next to every recording.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.format.validate()?;
        if self.chunk_size == 0 {
            return Err(CaptureError::InvalidArgument("chunk size must be non-zero".into()));
        }
        if self.chunk_size % self.format.frame_size() != 0 {
            return Err(CaptureError::InvalidArgument(format!(
                "chunk size {} is not a multiple of the {}-byte frame",
                self.chunk_size,
                self.format.frame_size()
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CaptureError::InvalidArgument("output path is empty".into()));
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            format: SampleFormat::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            output_path: PathBuf::from(DEFAULT_RECORDING_FILENAME),
            write_metadata: false,
        }
    }
}
