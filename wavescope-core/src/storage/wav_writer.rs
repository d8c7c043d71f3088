use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::models::format::SampleFormat;
use crate::processing::wav_format;

/// Streaming WAV writer.
///
/// Writes a placeholder header on creation, streams payload bytes verbatim,
/// and patches the size fields on [`finish`](Self::finish).
///
/// ```text
/// [44-byte RIFF/RIFX header]
/// [raw 16-bit PCM data, byte order as declared by the header]
/// ```
pub struct WavFileWriter {
    file_path: PathBuf,
    format: SampleFormat,
    file: Option<File>,
    data_bytes: u64,
}

impl WavFileWriter {
    /// Create the file (and missing parent directories) and write the header.
    pub fn create(file_path: impl Into<PathBuf>, format: SampleFormat) -> Result<Self, CaptureError> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::IoFailure(format!("failed to create directory: {}", e)))?;
        }

        let mut file = File::create(&file_path).map_err(|e| {
            CaptureError::IoFailure(format!("failed to create {}: {}", file_path.display(), e))
        })?;

        let header = wav_format::generate_wav_header(&format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::IoFailure(format!("failed to write header: {}", e)))?;

        Ok(Self {
            file_path,
            format,
            file: Some(file),
            data_bytes: 0,
        })
    }

    /// Append payload bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.data_bytes + data.len() as u64 > wav_format::MAX_DATA_SIZE {
            return Err(CaptureError::IoFailure(
                "recording exceeds the 4 GiB WAV size limit".into(),
            ));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::IoFailure("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::IoFailure(format!("write failed: {}", e)))?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }

    /// Patch the header sizes, flush, close, and return the file's SHA-256.
    pub fn finish(mut self) -> Result<String, CaptureError> {
        let order = self.format.byte_order();
        let data_size = self.data_bytes as u32;
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::IoFailure("file is not open".into()))?;

        file.seek(SeekFrom::Start(wav_format::CHUNK_SIZE_OFFSET as u64))
            .map_err(|e| CaptureError::IoFailure(e.to_string()))?;
        file.write_all(&wav_format::chunk_size_field(data_size, order))
            .map_err(|e| CaptureError::IoFailure(e.to_string()))?;

        file.seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET as u64))
            .map_err(|e| CaptureError::IoFailure(e.to_string()))?;
        file.write_all(&wav_format::data_size_field(data_size, order))
            .map_err(|e| CaptureError::IoFailure(e.to_string()))?;

        file.flush().map_err(|e| CaptureError::IoFailure(e.to_string()))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// Payload bytes written so far (header excluded).
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data = fs::read(path)
        .map_err(|e| CaptureError::IoFailure(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
