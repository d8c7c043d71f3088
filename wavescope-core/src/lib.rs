//! # wavescope-core
//!
//! Device-agnostic live capture core.
//!
//! Reads 16-bit mono PCM from an input line on a dedicated producer thread,
//! decodes it for display, runs it through an optional swappable transform,
//! and records the raw stream to a WAV container on demand. Device backends
//! implement the `DeviceProvider` and `CaptureLine` traits and plug into
//! `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! wavescope-core (this crate)
//! ├── traits/       ← DeviceProvider, CaptureLine, CaptureDelegate, SampleTransform
//! ├── models/       ← SampleFormat, CaptureConfiguration, CaptureError, CaptureState, etc.
//! ├── processing/   ← PCM decoding, ProcessingSlot, LowPassFilter, WAV header generation
//! ├── session/      ← CaptureSession (producer thread + control operations)
//! └── storage/      ← Recorder, WavFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioSource, CaptureSessionDiagnostics, FrameOrigin};
pub use models::config::{CaptureConfiguration, DEFAULT_CHUNK_SIZE, DEFAULT_RECORDING_FILENAME};
pub use models::error::CaptureError;
pub use models::format::{ByteOrder, SampleFormat};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::low_pass::{LowPassFilter, ALPHA_FLOOR};
pub use processing::slot::ProcessingSlot;
pub use session::capture::CaptureSession;
pub use storage::recorder::Recorder;
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::device_provider::{CaptureLine, DeviceProvider, FrameSink};
pub use traits::sample_transform::{FnTransform, SampleTransform};
