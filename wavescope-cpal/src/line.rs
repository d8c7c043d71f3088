//! cpal-backed capture line.
//!
//! cpal delivers audio through a callback and its `Stream` handle is not `Send`,
//! so each line owns a dedicated thread that builds the stream, keeps it alive,
//! and serves play/pause/shutdown commands. The data callback encodes channel 0
//! as 16-bit PCM in the session's byte order and pushes the bytes into a
//! bounded queue that `read` drains.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use wavescope_core::models::error::CaptureError;
use wavescope_core::models::format::{ByteOrder, SampleFormat};
use wavescope_core::processing::pcm::encode_i16;
use wavescope_core::traits::device_provider::CaptureLine;

/// Tuning for lines opened by [`CpalDeviceProvider`](crate::CpalDeviceProvider).
#[derive(Debug, Clone)]
pub struct CpalLineConfig {
    /// Callback buffers held between the audio thread and `read` before
    /// new ones are dropped (default: 64).
    pub queue_depth: usize,

    /// Longest a single `read` waits for its buffer to fill (default: 50 ms).
    pub poll_interval: Duration,
}

impl Default for CpalLineConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            poll_interval: Duration::from_millis(50),
        }
    }
}

type Reply = Sender<Result<(), CaptureError>>;

enum StreamCommand {
    Play(Reply),
    Pause(Reply),
    Shutdown,
}

/// State shared with the cpal callbacks.
#[derive(Default)]
struct StreamHealth {
    failed: AtomicBool,
    overruns: AtomicU64,
}

/// An open cpal input stream exposed as a blocking [`CaptureLine`].
pub struct CpalLine {
    device_name: String,
    frame_size: usize,
    poll_interval: Duration,
    commands: Sender<StreamCommand>,
    chunks: Receiver<Vec<u8>>,
    pending: Mutex<Vec<u8>>,
    open: AtomicBool,
    health: Arc<StreamHealth>,
    owner: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalLine {
    /// Build a stream on `device_name` and wait until it is ready (not yet playing).
    pub(crate) fn open(
        device_name: &str,
        format: &SampleFormat,
        config: &CpalLineConfig,
    ) -> Result<Self, CaptureError> {
        let (chunk_tx, chunk_rx) = bounded(config.queue_depth.max(1));
        let (command_tx, command_rx) = bounded(4);
        let (ready_tx, ready_rx) = bounded(1);
        let health = Arc::new(StreamHealth::default());

        let owner = {
            let device_name = device_name.to_string();
            let format = *format;
            let health = Arc::clone(&health);
            thread::Builder::new()
                .name("cpal-stream-owner".into())
                .spawn(move || {
                    stream_owner(device_name, format, chunk_tx, health, ready_tx, command_rx)
                })
                .map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("failed to spawn stream thread: {}", e))
                })?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = owner.join();
                return Err(e);
            }
            Err(_) => {
                let _ = owner.join();
                return Err(CaptureError::DeviceUnavailable(format!(
                    "stream thread for '{}' exited during setup",
                    device_name
                )));
            }
        }

        log::info!("Opened input line on '{}'", device_name);

        Ok(Self {
            device_name: device_name.to_string(),
            frame_size: format.frame_size(),
            poll_interval: config.poll_interval,
            commands: command_tx,
            chunks: chunk_rx,
            pending: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            health,
            owner: Mutex::new(Some(owner)),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Callback buffers dropped because `read` fell behind.
    pub fn overruns(&self) -> u64 {
        self.health.overruns.load(Ordering::Relaxed)
    }

    fn closed_error(&self) -> CaptureError {
        CaptureError::DeviceUnavailable(format!("line on '{}' is closed", self.device_name))
    }

    fn request(&self, command: impl FnOnce(Reply) -> StreamCommand) -> Result<(), CaptureError> {
        if !self.is_open() {
            return Err(self.closed_error());
        }
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(command(reply_tx))
            .map_err(|_| self.closed_error())?;
        reply_rx.recv().map_err(|_| self.closed_error())?
    }
}

impl CaptureLine for CpalLine {
    fn start(&self) -> Result<(), CaptureError> {
        self.request(StreamCommand::Play)
    }

    fn stop(&self) -> Result<(), CaptureError> {
        self.request(StreamCommand::Pause)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.commands.send(StreamCommand::Shutdown);
            log::debug!("Closing input line on '{}'", self.device_name);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let wanted = buf.len() - buf.len() % self.frame_size;
        if !self.is_open() {
            return Err(self.closed_error());
        }
        if wanted == 0 {
            return Ok(0);
        }

        let deadline = Instant::now() + self.poll_interval;
        let mut pending = self.pending.lock();
        while pending.len() < wanted {
            if self.health.failed.load(Ordering::SeqCst) {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "stream on '{}' reported an error",
                    self.device_name
                )));
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.chunks.recv_timeout(deadline - now) {
                Ok(chunk) => pending.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    if !self.is_open() {
                        return Err(self.closed_error());
                    }
                    if pending.len() < self.frame_size {
                        return Err(CaptureError::DeviceUnavailable(format!(
                            "stream on '{}' has stopped",
                            self.device_name
                        )));
                    }
                    break;
                }
            }
            if !self.is_open() {
                return Err(self.closed_error());
            }
        }

        let available = pending.len().min(wanted);
        let n = available - available % self.frame_size;
        buf[..n].copy_from_slice(&pending[..n]);
        pending.drain(..n);
        Ok(n)
    }
}

impl Drop for CpalLine {
    fn drop(&mut self) {
        self.close();
        if let Some(owner) = self.owner.lock().take() {
            if owner.join().is_err() {
                log::warn!("Stream thread for '{}' panicked", self.device_name);
            }
        }
    }
}

/// Body of the stream-owner thread.
fn stream_owner(
    device_name: String,
    format: SampleFormat,
    chunks: Sender<Vec<u8>>,
    health: Arc<StreamHealth>,
    ready: Sender<Result<(), CaptureError>>,
    commands: Receiver<StreamCommand>,
) {
    let stream = match open_stream(&device_name, &format, chunks, health) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(e) => {
            log::warn!("Cannot open '{}': {}", device_name, e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    for command in commands.iter() {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream.play().map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("failed to start stream: {}", e))
                });
                let _ = reply.send(result);
            }
            StreamCommand::Pause(reply) => {
                let result = stream.pause().map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("failed to pause stream: {}", e))
                });
                let _ = reply.send(result);
            }
            StreamCommand::Shutdown => break,
        }
    }

    drop(stream);
    log::debug!("Stream thread for '{}' finished", device_name);
}

pub(crate) fn find_input_device(
    host: &cpal::Host,
    device_name: &str,
) -> Result<cpal::Device, CaptureError> {
    host.input_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to enumerate devices: {}", e)))?
        .find(|d| d.name().map(|n| n == device_name).unwrap_or(false))
        .ok_or_else(|| CaptureError::DeviceUnavailable(format!("device not found: {}", device_name)))
}

/// Sample rate of `format` as an integral cpal rate.
pub(crate) fn target_rate(format: &SampleFormat) -> u32 {
    format.sample_rate().round() as u32
}

/// Preference among the sample types we can convert to i16.
fn format_rank(sample_format: cpal::SampleFormat) -> Option<u8> {
    match sample_format {
        cpal::SampleFormat::I16 => Some(0),
        cpal::SampleFormat::F32 => Some(1),
        cpal::SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Pick the best input config that covers `rate`.
pub(crate) fn select_config(
    configs: impl Iterator<Item = SupportedStreamConfigRange>,
    rate: u32,
) -> Option<SupportedStreamConfig> {
    configs
        .filter(|c| c.min_sample_rate().0 <= rate && c.max_sample_rate().0 >= rate)
        .filter_map(|c| format_rank(c.sample_format()).map(|rank| (rank, c)))
        .min_by_key(|(rank, c)| (*rank, c.channels()))
        .map(|(_, c)| c.with_sample_rate(cpal::SampleRate(rate)))
}

fn open_stream(
    device_name: &str,
    format: &SampleFormat,
    chunks: Sender<Vec<u8>>,
    health: Arc<StreamHealth>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = find_input_device(&host, device_name)?;
    let rate = target_rate(format);

    let configs = device.supported_input_configs().map_err(|e| {
        CaptureError::DeviceUnavailable(format!("failed to query '{}': {}", device_name, e))
    })?;
    let supported = select_config(configs, rate).ok_or_else(|| {
        CaptureError::DeviceUnsupported(format!(
            "'{}' has no input config at {} Hz",
            device_name, rate
        ))
    })?;

    log::info!(
        "Input config for '{}': {} channels @ {}Hz ({:?})",
        device_name,
        supported.channels(),
        rate,
        supported.sample_format()
    );

    let stream_config = supported.config();
    let order = format.byte_order();
    match supported.sample_format() {
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, order, chunks, health),
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, order, chunks, health),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, order, chunks, health),
        other => Err(CaptureError::DeviceUnsupported(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    order: ByteOrder,
    chunks: Sender<Vec<u8>>,
    health: Arc<StreamHealth>,
) -> Result<cpal::Stream, CaptureError>
where
    T: Sample + SizedSample + Send + Sync + 'static,
    i16: FromSample<T>,
{
    let channels = config.channels as usize;
    let data_health = Arc::clone(&health);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let bytes = encode_first_channel(data, channels, order);
                if bytes.is_empty() {
                    return;
                }
                if let Err(TrySendError::Full(_)) = chunks.try_send(bytes) {
                    let dropped = data_health.overruns.fetch_add(1, Ordering::Relaxed) + 1;
                    if dropped == 1 || dropped % 100 == 0 {
                        log::warn!("Input queue full, {} buffers dropped", dropped);
                    }
                }
            },
            move |err: cpal::StreamError| {
                log::error!("Audio stream error: {}", err);
                health.failed.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to build stream: {}", e)))
}

/// Channel 0 of every interleaved frame as 16-bit PCM in `order`.
pub(crate) fn encode_first_channel<T>(data: &[T], channels: usize, order: ByteOrder) -> Vec<u8>
where
    T: Sample,
    i16: FromSample<T>,
{
    let channels = channels.max(1);
    let mut bytes = Vec::with_capacity(data.len() / channels * 2);
    for frame in data.chunks(channels) {
        if let Some(sample) = frame.first() {
            bytes.extend_from_slice(&encode_i16(i16::from_sample(*sample), order));
        }
    }
    bytes
}
