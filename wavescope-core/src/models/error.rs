use thiserror::Error;

/// Errors raised by capture, recording and processing operations.
///
/// None of these are fatal to the hosting process; the caller decides.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The device cannot deliver the session's sample format.
    #[error("device unsupported: {0}")]
    DeviceUnsupported(String),

    /// The line is busy, missing, closed, or failed mid-read.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Writing a recording to disk failed. The buffered audio is kept.
    #[error("i/o failure: {0}")]
    IoFailure(String),

    /// Rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
