use std::sync::Arc;

use crate::models::audio_models::{AudioSource, FrameOrigin};
use crate::models::error::CaptureError;
use crate::models::format::SampleFormat;

/// Callback invoked with every decoded (and possibly filtered) frame.
///
/// Runs on the producer thread while the session's frame lock is held: it must
/// return promptly, copy anything it keeps, and must not call back into the
/// session's processor or capture controls.
pub type FrameSink = Arc<dyn Fn(&[f32], FrameOrigin) + Send + Sync + 'static>;

/// An open input line delivering raw PCM bytes.
///
/// Shared between the producer (which reads) and the control thread (which may
/// close the line while a read is blocked), so every method takes `&self`.
pub trait CaptureLine: Send + Sync {
    /// Begin delivering audio.
    fn start(&self) -> Result<(), CaptureError>;

    /// Pause delivery without releasing the device.
    fn stop(&self) -> Result<(), CaptureError>;

    /// Release the device. Idempotent; a blocked `read` must return soon after.
    fn close(&self);

    fn is_open(&self) -> bool;

    /// Block until bytes are available and copy them into `buf`.
    ///
    /// `Ok(0)` means "nothing yet, try again". An error ends the capture run.
    fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError>;
}

/// Source of input devices and the lines that read from them.
pub trait DeviceProvider: Send + Sync {
    /// Input devices able to capture in `format`.
    fn list_input_devices(&self, format: &SampleFormat) -> Result<Vec<AudioSource>, CaptureError>;

    /// Open a line on `device_id` in `format`.
    ///
    /// Fails with `DeviceUnsupported` when the device cannot deliver `format`
    /// and `DeviceUnavailable` when it is missing or busy.
    fn open_line(
        &self,
        device_id: &str,
        format: &SampleFormat,
    ) -> Result<Arc<dyn CaptureLine>, CaptureError>;
}
