//! In-memory device provider and line for driving sessions in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::models::audio_models::AudioSource;
use crate::models::error::CaptureError;
use crate::models::format::SampleFormat;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::device_provider::{CaptureLine, DeviceProvider};

type Chunk = Result<Vec<u8>, CaptureError>;

#[derive(Default)]
struct OpenCounter {
    now: AtomicUsize,
    max: AtomicUsize,
}

impl OpenCounter {
    fn opened(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A line fed by the test through [`push`](Self::push) and [`fail`](Self::fail).
pub(crate) struct ScriptedLine {
    tx: Sender<Chunk>,
    rx: Receiver<Chunk>,
    open: AtomicBool,
    hold: AtomicBool,
    blocked: AtomicBool,
    counter: Arc<OpenCounter>,
}

impl ScriptedLine {
    fn new(counter: Arc<OpenCounter>) -> Self {
        let (tx, rx) = unbounded();
        counter.opened();
        Self {
            tx,
            rx,
            open: AtomicBool::new(true),
            hold: AtomicBool::new(false),
            blocked: AtomicBool::new(false),
            counter,
        }
    }

    pub(crate) fn push(&self, bytes: &[u8]) {
        let _ = self.tx.send(Ok(bytes.to_vec()));
    }

    pub(crate) fn fail(&self, error: CaptureError) {
        let _ = self.tx.send(Err(error));
    }

    /// Make the next read block until the line is closed.
    pub(crate) fn hold_reads(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }
}

impl CaptureLine for ScriptedLine {
    fn start(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.counter.closed();
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        if self.hold.load(Ordering::SeqCst) {
            self.blocked.store(true, Ordering::SeqCst);
            while self.is_open() {
                thread::sleep(Duration::from_millis(2));
            }
            self.blocked.store(false, Ordering::SeqCst);
        }
        if !self.is_open() {
            return Err(CaptureError::DeviceUnavailable("line closed".into()));
        }
        match self.rx.recv_timeout(Duration::from_millis(5)) {
            Ok(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(0),
        }
    }
}

/// Provider over a fixed device list; remembers the last line opened per device.
#[derive(Clone)]
pub(crate) struct MockProvider {
    devices: Vec<String>,
    unsupported: Vec<String>,
    lines: Arc<Mutex<HashMap<String, Arc<ScriptedLine>>>>,
    counter: Arc<OpenCounter>,
}

impl MockProvider {
    pub(crate) fn new(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            unsupported: Vec::new(),
            lines: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(OpenCounter::default()),
        }
    }

    pub(crate) fn unsupported(mut self, device_id: &str) -> Self {
        self.unsupported.push(device_id.to_string());
        self
    }

    pub(crate) fn line(&self, device_id: &str) -> Arc<ScriptedLine> {
        self.lines
            .lock()
            .get(device_id)
            .cloned()
            .unwrap_or_else(|| panic!("no line opened for '{}'", device_id))
    }

    pub(crate) fn open_now(&self) -> usize {
        self.counter.now.load(Ordering::SeqCst)
    }

    pub(crate) fn max_open(&self) -> usize {
        self.counter.max.load(Ordering::SeqCst)
    }
}

impl DeviceProvider for MockProvider {
    fn list_input_devices(&self, _format: &SampleFormat) -> Result<Vec<AudioSource>, CaptureError> {
        Ok(self
            .devices
            .iter()
            .filter(|id| !self.unsupported.contains(*id))
            .enumerate()
            .map(|(i, id)| AudioSource {
                id: id.clone(),
                name: id.clone(),
                is_default: i == 0,
            })
            .collect())
    }

    fn open_line(
        &self,
        device_id: &str,
        _format: &SampleFormat,
    ) -> Result<Arc<dyn CaptureLine>, CaptureError> {
        if !self.devices.iter().any(|d| d == device_id) {
            return Err(CaptureError::DeviceUnavailable(format!("no device '{}'", device_id)));
        }
        if self.unsupported.iter().any(|d| d == device_id) {
            return Err(CaptureError::DeviceUnsupported(format!(
                "'{}' cannot capture 16-bit mono",
                device_id
            )));
        }
        let line = Arc::new(ScriptedLine::new(Arc::clone(&self.counter)));
        self.lines.lock().insert(device_id.to_string(), Arc::clone(&line));
        Ok(line as Arc<dyn CaptureLine>)
    }
}

/// Delegate that records every callback.
#[derive(Default)]
pub(crate) struct RecordingDelegate {
    states: Mutex<Vec<CaptureState>>,
    errors: Mutex<Vec<CaptureError>>,
    saved: AtomicUsize,
}

impl RecordingDelegate {
    pub(crate) fn states(&self) -> Vec<CaptureState> {
        self.states.lock().clone()
    }

    pub(crate) fn errors(&self) -> Vec<CaptureError> {
        self.errors.lock().clone()
    }

    pub(crate) fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.states.lock().push(state.clone());
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_recording_saved(&self, _result: &RecordingResult) {
        self.saved.fetch_add(1, Ordering::SeqCst);
    }
}
