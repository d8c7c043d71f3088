use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → capturing ──(stop / device switch)──→ idle
///            │
///            └──(read failure)──→ failed ──(start / stop)──→ capturing / idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing { device_id: String },
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Device the producer is reading from, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Capturing { device_id } => Some(device_id),
            _ => None,
        }
    }
}
