use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Default capture rate (CD quality).
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Highest rate whose 16-bit mono byte rate still fits the 32-bit WAV header field.
pub const MAX_SAMPLE_RATE: f64 = (u32::MAX / 2) as f64;

/// Byte order of 16-bit samples on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Big,
    Little,
}

/// PCM layout of the captured stream.
///
/// Immutable once built; shared by the capture session and the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleFormat {
    sample_rate: f64,
    bits_per_sample: u16,
    channels: u16,
    signed: bool,
    byte_order: ByteOrder,
}

impl SampleFormat {
    /// 16-bit signed mono at `sample_rate`.
    pub fn mono_16bit(sample_rate: f64, byte_order: ByteOrder) -> Self {
        Self {
            sample_rate,
            bits_per_sample: 16,
            channels: 1,
            signed: true,
            byte_order,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn is_big_endian(&self) -> bool {
        self.byte_order == ByteOrder::Big
    }

    /// Bytes per frame (one sample for every channel).
    pub fn frame_size(&self) -> usize {
        usize::from(self.bits_per_sample / 8) * usize::from(self.channels)
    }

    /// Whole frames contained in `byte_len` bytes.
    pub fn frames_in(&self, byte_len: usize) -> usize {
        byte_len / self.frame_size()
    }

    pub fn duration_secs(&self, byte_len: usize) -> f64 {
        self.frames_in(byte_len) as f64 / self.sample_rate
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(CaptureError::InvalidArgument(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.sample_rate.round() > MAX_SAMPLE_RATE {
            return Err(CaptureError::InvalidArgument(format!(
                "sample rate {} exceeds {}",
                self.sample_rate, MAX_SAMPLE_RATE
            )));
        }
        if self.bits_per_sample != 16 {
            return Err(CaptureError::InvalidArgument(format!(
                "unsupported bit depth: {}",
                self.bits_per_sample
            )));
        }
        if self.channels != 1 {
            return Err(CaptureError::InvalidArgument(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if !self.signed {
            return Err(CaptureError::InvalidArgument("unsigned PCM is not supported".into()));
        }
        Ok(())
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self::mono_16bit(DEFAULT_SAMPLE_RATE, ByteOrder::Big)
    }
}
