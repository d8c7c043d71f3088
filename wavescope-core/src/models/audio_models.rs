use serde::{Deserialize, Serialize};

/// An input device able to deliver the session's sample format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Why the sink is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOrigin {
    /// Fresh audio from a completed read cycle.
    Captured,
    /// The previous frame re-run through a newly installed transform.
    /// Replaces, rather than follows, the last frame the sink saw.
    Rerendered,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    pub producer_runs: u64,
    pub reads: u64,
    pub empty_reads: u64,
    pub bytes_read: u64,
    pub frames_dispatched: u64,
    pub rerenders: u64,
    pub bytes_recorded: u64,
}
