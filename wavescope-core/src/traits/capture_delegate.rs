use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// Callbacks run with no session lock held and may arrive on whichever thread
/// last changed the state, including the producer thread. Transitions are
/// delivered in the order they happened.
///
/// A delegate may call back into the session (for example `stop_capture` on
/// `Capturing`), except when the callback is running on the producer thread,
/// where control calls fail with `InvalidArgument`. Implementations should
/// marshal to a UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when the producer loop ends on an error.
    fn on_error(&self, error: &CaptureError);

    /// Called after a recording has been written.
    fn on_recording_saved(&self, _result: &RecordingResult) {}
}
