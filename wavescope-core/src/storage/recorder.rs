use std::mem;
use std::path::Path;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::format::SampleFormat;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::storage::metadata;
use crate::storage::wav_writer::WavFileWriter;

struct RecordingBuffer {
    armed: bool,
    // Bumped on every arm/reset; a failed save only restores into the same take.
    generation: u64,
    bytes: Vec<u8>,
}

/// Accumulates raw captured bytes and writes them out as a WAV container.
///
/// The armed flag lives under the same lock as the bytes, so append-if-armed,
/// reset-and-arm and disarm-and-take are each a single critical section. Disk
/// I/O always happens outside the lock.
pub struct Recorder {
    format: SampleFormat,
    buffer: Mutex<RecordingBuffer>,
    write_metadata: bool,
}

impl Recorder {
    pub fn new(format: SampleFormat) -> Self {
        Self {
            format,
            buffer: Mutex::new(RecordingBuffer {
                armed: false,
                generation: 0,
                bytes: Vec::new(),
            }),
            write_metadata: false,
        }
    }

    /// Also write a `.metadata.json` sidecar on every save.
    pub fn with_metadata_sidecar(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }

    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    /// Append captured bytes. Growth is bounded only by memory.
    pub fn write_data(&self, bytes: &[u8]) {
        self.buffer.lock().bytes.extend_from_slice(bytes);
    }

    /// Append `bytes` only while armed. Returns whether they were kept.
    pub fn append_if_armed(&self, bytes: &[u8]) -> bool {
        let mut buffer = self.buffer.lock();
        if buffer.armed {
            buffer.bytes.extend_from_slice(bytes);
        }
        buffer.armed
    }

    /// Discard everything buffered and start accepting appends.
    ///
    /// Returns `true` if the recorder was already armed.
    pub fn arm(&self) -> bool {
        let mut buffer = self.buffer.lock();
        let was_armed = buffer.armed;
        buffer.bytes.clear();
        buffer.generation += 1;
        buffer.armed = true;
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.buffer.lock().armed
    }

    /// Discard everything buffered so far.
    pub fn reset(&self) {
        let mut buffer = self.buffer.lock();
        buffer.bytes.clear();
        buffer.generation += 1;
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().bytes.is_empty()
    }

    /// Disarm and save what was recorded to `path`.
    ///
    /// Fails with `InvalidArgument` when not armed.
    pub fn disarm_and_save(&self, path: &Path) -> Result<RecordingResult, CaptureError> {
        let (snapshot, generation) = {
            let mut buffer = self.buffer.lock();
            if !buffer.armed {
                return Err(CaptureError::InvalidArgument("recording is not armed".into()));
            }
            buffer.armed = false;
            (mem::take(&mut buffer.bytes), buffer.generation)
        };
        self.save_snapshot(path, snapshot, generation)
    }

    /// Take the buffered bytes and write them to `path`.
    ///
    /// Only whole frames are written. If writing fails the taken bytes are
    /// put back in front of anything appended since, so a later save can
    /// retry.
    pub fn save_recording(&self, path: &Path) -> Result<RecordingResult, CaptureError> {
        let (snapshot, generation) = {
            let mut buffer = self.buffer.lock();
            (mem::take(&mut buffer.bytes), buffer.generation)
        };
        self.save_snapshot(path, snapshot, generation)
    }

    fn save_snapshot(
        &self,
        path: &Path,
        snapshot: Vec<u8>,
        generation: u64,
    ) -> Result<RecordingResult, CaptureError> {
        match self.write_container(path, &snapshot) {
            Ok(result) => {
                log::info!(
                    "Recording saved to {} ({} frames, {:.2}s)",
                    result.file_path.display(),
                    result.frame_count,
                    result.duration_secs
                );
                Ok(result)
            }
            Err(e) => {
                log::error!("Failed to save recording to {}: {}", path.display(), e);
                self.restore(snapshot, generation);
                Err(e)
            }
        }
    }

    fn restore(&self, mut snapshot: Vec<u8>, generation: u64) {
        let mut buffer = self.buffer.lock();
        if buffer.generation != generation {
            log::warn!(
                "Recording restarted during a failed save; {} unsaved bytes dropped",
                snapshot.len()
            );
            return;
        }
        if !buffer.bytes.is_empty() {
            snapshot.extend_from_slice(&buffer.bytes);
        }
        buffer.bytes = snapshot;
    }

    fn write_container(&self, path: &Path, snapshot: &[u8]) -> Result<RecordingResult, CaptureError> {
        let frame_count = self.format.frames_in(snapshot.len());
        let payload = &snapshot[..frame_count * self.format.frame_size()];

        let mut writer = WavFileWriter::create(path, self.format)?;
        writer.write(payload)?;
        let checksum = writer.finish()?;

        let metadata =
            RecordingMetadata::new(&self.format, frame_count as u64, &path.to_string_lossy(), &checksum);
        if self.write_metadata {
            if let Err(e) = metadata::write_metadata(&metadata, path) {
                log::warn!("Recording written but sidecar failed: {}", e);
            }
        }

        Ok(RecordingResult {
            file_path: path.to_path_buf(),
            frame_count: frame_count as u64,
            duration_secs: metadata.duration_secs,
            metadata,
            checksum,
        })
    }
}
