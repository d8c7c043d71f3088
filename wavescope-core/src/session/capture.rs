use std::cell::Cell;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::{AudioSource, CaptureSessionDiagnostics, FrameOrigin};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::format::SampleFormat;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::processing::pcm;
use crate::processing::slot::ProcessingSlot;
use crate::storage::recorder::Recorder;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::device_provider::{CaptureLine, DeviceProvider, FrameSink};
use crate::traits::sample_transform::SampleTransform;

thread_local! {
    static ON_PRODUCER: Cell<bool> = const { Cell::new(false) };
    static IN_SINK: Cell<bool> = const { Cell::new(false) };
}

fn on_producer_thread() -> bool {
    ON_PRODUCER.with(Cell::get)
}

/// True on the producer thread and inside any sink call.
fn in_capture_callback() -> bool {
    on_producer_thread() || IN_SINK.with(Cell::get)
}

/// Marks the current thread as inside the sink until dropped.
struct SinkScope {
    outer: bool,
}

impl SinkScope {
    fn enter() -> Self {
        Self {
            outer: IN_SINK.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for SinkScope {
    fn drop(&mut self) {
        IN_SINK.with(|flag| flag.set(self.outer));
    }
}

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: CaptureState,
    diagnostics: CaptureSessionDiagnostics,
    // Transitions not yet delivered to the delegate, oldest first.
    pending: VecDeque<CaptureState>,
}

/// Everything the producer thread touches.
struct Shared {
    format: SampleFormat,
    sink: FrameSink,
    delegate: Mutex<Option<Arc<dyn CaptureDelegate>>>,
    recorder: Recorder,
    // Held across every sink call; the sink itself never takes it.
    dispatch: Mutex<()>,
    // Transform and last dispatched frame share one lock, never held across the sink.
    frames: Mutex<ProcessingSlot>,
    session_state: Mutex<SessionState>,
    notifying: Mutex<()>,
}

impl Shared {
    fn process_chunk(&self, bytes: &[u8]) {
        let recorded = if self.recorder.append_if_armed(bytes) {
            bytes.len() as u64
        } else {
            0
        };

        let decoded = pcm::decode_frame(bytes, &self.format);
        {
            let _dispatch = self.dispatch.lock();
            let frame = self.frames.lock().apply(decoded);
            self.deliver(&frame, FrameOrigin::Captured);
        }

        let mut s = self.session_state.lock();
        s.diagnostics.reads += 1;
        s.diagnostics.bytes_read += bytes.len() as u64;
        s.diagnostics.frames_dispatched += 1;
        s.diagnostics.bytes_recorded += recorded;
    }

    fn deliver(&self, frame: &[f32], origin: FrameOrigin) {
        let _scope = SinkScope::enter();
        (self.sink)(frame, origin);
    }

    /// Record a transition; delegates hear about it on the next flush.
    fn set_state(&self, new_state: CaptureState) {
        let mut s = self.session_state.lock();
        s.state = new_state.clone();
        s.pending.push_back(new_state);
    }

    /// Deliver queued transitions in order with no session lock held.
    ///
    /// A delegate that calls back into the session queues further transitions;
    /// whichever thread is already flushing delivers them after it returns.
    fn flush_state_events(&self) {
        loop {
            let Some(guard) = self.notifying.try_lock() else {
                return;
            };
            loop {
                let next = self.session_state.lock().pending.pop_front();
                let Some(state) = next else {
                    break;
                };
                let delegate = self.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    delegate.on_state_changed(&state);
                }
            }
            drop(guard);
            if self.session_state.lock().pending.is_empty() {
                return;
            }
        }
    }

    fn fail(&self, error: CaptureError) {
        let delegate = self.delegate.lock().clone();
        if let Some(ref delegate) = delegate {
            delegate.on_error(&error);
        }
        self.set_state(CaptureState::Failed(error));
        self.flush_state_events();
    }

    fn report_saved(&self, result: &RecordingResult) {
        let delegate = self.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_recording_saved(result);
        }
    }
}

/// One capture run: the open line, its producer, and the producer's exit signal.
struct ActiveCapture {
    device_id: String,
    line: Arc<dyn CaptureLine>,
    running: Arc<AtomicBool>,
    exited: Receiver<()>,
    handle: thread::JoinHandle<()>,
}

/// Owns one producer thread at a time and drives read → decode → transform →
/// dispatch, recording raw bytes on the side.
///
/// ```text
/// [CaptureLine] → raw chunk ─┬→ [Recorder] (while armed)
///                            └→ decode → [ProcessingSlot] → sink(frame)
/// ```
///
/// Control operations take `&self` and may be called from any thread except
/// the producer itself or from inside the sink. Start/stop transitions are
/// serialized by a control lock, so a session never has two producers reading
/// two lines at once. Delegate callbacks run after that lock is released.
pub struct CaptureSession<P: DeviceProvider> {
    provider: P,
    config: CaptureConfiguration,
    shared: Arc<Shared>,
    control: Mutex<Option<ActiveCapture>>,
}

impl<P: DeviceProvider> CaptureSession<P> {
    pub fn new(provider: P, config: CaptureConfiguration, sink: FrameSink) -> Result<Self, CaptureError> {
        config.validate()?;

        let recorder = Recorder::new(config.format).with_metadata_sidecar(config.write_metadata);
        let shared = Shared {
            format: config.format,
            sink,
            delegate: Mutex::new(None),
            recorder,
            dispatch: Mutex::new(()),
            frames: Mutex::new(ProcessingSlot::new()),
            session_state: Mutex::new(SessionState {
                state: CaptureState::Idle,
                diagnostics: CaptureSessionDiagnostics::default(),
                pending: VecDeque::new(),
            }),
            notifying: Mutex::new(()),
        };

        Ok(Self {
            provider,
            config,
            shared: Arc::new(shared),
            control: Mutex::new(None),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn format(&self) -> &SampleFormat {
        &self.config.format
    }

    pub fn state(&self) -> CaptureState {
        self.shared.session_state.lock().state.clone()
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.shared.session_state.lock().diagnostics.clone()
    }

    pub fn is_capturing(&self) -> bool {
        self.state().is_capturing()
    }

    /// Device the producer is currently reading from.
    pub fn current_device(&self) -> Option<String> {
        self.state().device_id().map(str::to_string)
    }

    /// Input devices that can capture in the session's format.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        self.provider.list_input_devices(&self.config.format)
    }

    /// Stop any running capture, open `device_id`, and spawn a new producer.
    ///
    /// Returns once the producer is running. On failure the session is left
    /// with no active capture.
    pub fn start_capture(&self, device_id: &str) -> Result<(), CaptureError> {
        if device_id.trim().is_empty() {
            return Err(CaptureError::InvalidArgument("device id is empty".into()));
        }
        if in_capture_callback() {
            return Err(CaptureError::InvalidArgument(
                "start_capture cannot run inside a capture callback".into(),
            ));
        }

        let result = {
            let mut active = self.control.lock();
            self.teardown(&mut active);
            self.open_and_spawn(&mut active, device_id)
        };
        self.shared.flush_state_events();
        result
    }

    /// Stop the producer and release the line.
    ///
    /// Safe to call with nothing running and safe to call repeatedly.
    pub fn stop_capture(&self) -> Result<(), CaptureError> {
        if in_capture_callback() {
            return Err(CaptureError::InvalidArgument(
                "stop_capture cannot run inside a capture callback".into(),
            ));
        }
        self.teardown(&mut self.control.lock());
        self.shared.flush_state_events();
        Ok(())
    }

    /// Arm the recorder. An already-armed recorder starts over.
    pub fn start_recording(&self) {
        if self.shared.recorder.arm() {
            log::warn!("Recording restarted; unsaved audio discarded");
        } else {
            log::info!("Recording started");
        }
    }

    /// Disarm the recorder and save to the configured output path.
    pub fn stop_recording(&self) -> Result<RecordingResult, CaptureError> {
        let result = self.shared.recorder.disarm_and_save(&self.config.output_path)?;
        self.shared.report_saved(&result);
        Ok(result)
    }

    /// Save whatever the recorder holds to `path`.
    ///
    /// After a failed save the audio is still buffered, so this is also the
    /// retry path.
    pub fn save_recording_to(&self, path: &Path) -> Result<RecordingResult, CaptureError> {
        let result = self.shared.recorder.save_recording(path)?;
        self.shared.report_saved(&result);
        Ok(result)
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recorder.is_armed()
    }

    /// Bytes waiting in the recorder.
    pub fn buffered_recording_bytes(&self) -> usize {
        self.shared.recorder.len()
    }

    /// Install `transform` for all following cycles and re-render the last
    /// frame through it.
    ///
    /// The re-rendered frame reaches the sink tagged [`FrameOrigin::Rerendered`]
    /// before the producer can dispatch another frame. Installing the instance
    /// that is already active changes nothing.
    pub fn install_processor(&self, transform: Arc<dyn SampleTransform>) -> Result<(), CaptureError> {
        if in_capture_callback() {
            return Err(CaptureError::InvalidArgument(
                "processors cannot be changed inside a capture callback".into(),
            ));
        }

        let name = transform.name().to_string();
        let _dispatch = self.shared.dispatch.lock();
        let rerendered = {
            let mut slot = self.shared.frames.lock();
            if !slot.install(transform) {
                log::debug!("Processor '{}' already installed", name);
                return Ok(());
            }
            slot.rerender()
        };
        log::info!("Installed '{}' processor", name);

        match rerendered {
            Some(frame) => {
                self.shared.deliver(&frame, FrameOrigin::Rerendered);
                self.shared.session_state.lock().diagnostics.rerenders += 1;
            }
            None => log::debug!("No frame captured yet; '{}' applies from the next read", name),
        }
        Ok(())
    }

    /// Remove the active transform, returning it.
    pub fn remove_processor(&self) -> Result<Option<Arc<dyn SampleTransform>>, CaptureError> {
        if in_capture_callback() {
            return Err(CaptureError::InvalidArgument(
                "processors cannot be changed inside a capture callback".into(),
            ));
        }
        let removed = self.shared.frames.lock().remove();
        if let Some(ref transform) = removed {
            log::info!("Removed '{}' processor", transform.name());
        }
        Ok(removed)
    }

    pub fn processor_installed(&self) -> bool {
        self.shared.frames.lock().is_armed()
    }

    /// Copy of the most recently dispatched frame.
    pub fn last_frame(&self) -> Option<Vec<f32>> {
        self.shared.frames.lock().last_frame().map(<[f32]>::to_vec)
    }

    // --- Internal helpers ---

    fn open_and_spawn(
        &self,
        active: &mut Option<ActiveCapture>,
        device_id: &str,
    ) -> Result<(), CaptureError> {
        let line = self
            .provider
            .open_line(device_id, &self.config.format)
            .inspect_err(|e| log::error!("Failed to open '{}': {}", device_id, e))?;

        if let Err(e) = line.start() {
            log::error!("Failed to start '{}': {}", device_id, e);
            line.close();
            return Err(e);
        }

        let running = Arc::new(AtomicBool::new(true));
        let (exit_tx, exit_rx) = bounded::<()>(1);

        // Recorded before the producer exists so an immediate failure is not overwritten.
        self.shared.set_state(CaptureState::Capturing {
            device_id: device_id.to_string(),
        });

        let shared = Arc::clone(&self.shared);
        let producer_line = Arc::clone(&line);
        let producer_running = Arc::clone(&running);
        let chunk_size = self.config.chunk_size;
        let producer_device = device_id.to_string();

        let spawned = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                run_producer(
                    shared,
                    producer_line,
                    producer_running,
                    chunk_size,
                    producer_device,
                    exit_tx,
                )
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                line.close();
                self.shared.set_state(CaptureState::Idle);
                return Err(CaptureError::DeviceUnavailable(format!(
                    "failed to spawn capture thread: {}",
                    e
                )));
            }
        };

        self.shared.session_state.lock().diagnostics.producer_runs += 1;
        log::info!("Capturing from '{}'", device_id);

        *active = Some(ActiveCapture {
            device_id: device_id.to_string(),
            line,
            running,
            exited: exit_rx,
            handle,
        });
        Ok(())
    }

    /// Flag → bounded wait → line close. Always leaves the line closed.
    fn teardown(&self, active: &mut Option<ActiveCapture>) {
        let Some(capture) = active.take() else {
            return;
        };

        capture.running.store(false, Ordering::Release);
        let timeout = self.config.stop_timeout;

        let exited = wait_for_exit(&capture.exited, timeout);
        if !exited {
            log::warn!(
                "Capture thread for '{}' did not exit within {:?}; closing line anyway",
                capture.device_id,
                timeout
            );
        }

        if let Err(e) = capture.line.stop() {
            log::debug!("Stopping '{}' failed: {}", capture.device_id, e);
        }
        capture.line.close();

        // Closing unblocks a pending read, so give the producer one more window.
        if exited || wait_for_exit(&capture.exited, timeout) {
            if capture.handle.join().is_err() {
                log::error!("Capture thread for '{}' panicked", capture.device_id);
            }
        } else {
            log::error!(
                "Capture thread for '{}' is still blocked after its line closed; detaching",
                capture.device_id
            );
        }

        self.shared.set_state(CaptureState::Idle);
        log::info!("Capture on '{}' stopped", capture.device_id);
    }
}

impl<P: DeviceProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        if on_producer_thread() {
            // Cannot join ourselves; signal and release the line only.
            if let Some(capture) = self.control.lock().take() {
                capture.running.store(false, Ordering::Release);
                capture.line.close();
            }
            return;
        }
        self.teardown(&mut self.control.lock());
        self.shared.flush_state_events();
    }
}

fn wait_for_exit(exited: &Receiver<()>, timeout: Duration) -> bool {
    match exited.recv_timeout(timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

/// Producer loop. `_exit` is dropped when the thread ends, which wakes the
/// control thread waiting in `teardown`.
fn run_producer(
    shared: Arc<Shared>,
    line: Arc<dyn CaptureLine>,
    running: Arc<AtomicBool>,
    chunk_size: usize,
    device_id: String,
    _exit: Sender<()>,
) {
    ON_PRODUCER.with(|flag| flag.set(true));
    let mut raw = vec![0u8; chunk_size];

    while running.load(Ordering::Acquire) && line.is_open() {
        match line.read(&mut raw) {
            Ok(0) => {
                shared.session_state.lock().diagnostics.empty_reads += 1;
            }
            Ok(n) => shared.process_chunk(&raw[..n.min(raw.len())]),
            Err(e) => {
                // A failure after stop was requested is just the line closing under us.
                if running.swap(false, Ordering::AcqRel) {
                    log::error!("Capture on '{}' aborted: {}", device_id, e);
                    line.close();
                    shared.fail(e);
                }
                break;
            }
        }
    }

    if running.swap(false, Ordering::AcqRel) {
        log::warn!("Line for '{}' closed while capturing", device_id);
        shared.fail(CaptureError::DeviceUnavailable(format!("line for '{}' closed", device_id)));
    }
    log::debug!("Capture thread for '{}' exiting", device_id);
}
