//! Input device enumeration and line opening on the default cpal host.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};

use wavescope_core::models::audio_models::AudioSource;
use wavescope_core::models::error::CaptureError;
use wavescope_core::models::format::SampleFormat;
use wavescope_core::traits::device_provider::{CaptureLine, DeviceProvider};

use crate::line::{select_config, target_rate, CpalLine, CpalLineConfig};

/// [`DeviceProvider`] over the platform's default audio host.
///
/// Devices are identified by their cpal name.
#[derive(Debug, Clone, Default)]
pub struct CpalDeviceProvider {
    config: CpalLineConfig,
}

impl CpalDeviceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CpalLineConfig) -> Self {
        Self { config }
    }

    pub fn line_config(&self) -> &CpalLineConfig {
        &self.config
    }
}

impl DeviceProvider for CpalDeviceProvider {
    fn list_input_devices(&self, format: &SampleFormat) -> Result<Vec<AudioSource>, CaptureError> {
        format.validate()?;
        let host = cpal::default_host();
        let rate = target_rate(format);

        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        let devices = host.input_devices().map_err(|e| {
            CaptureError::DeviceUnavailable(format!("failed to enumerate devices: {}", e))
        })?;

        let mut sources = Vec::new();
        for device in devices {
            let name = match device.name() {
                Ok(name) => name,
                Err(e) => {
                    log::debug!("Skipping unnamed input device: {}", e);
                    continue;
                }
            };
            let configs = match device.supported_input_configs() {
                Ok(configs) => configs,
                Err(e) => {
                    log::debug!("Skipping '{}': {}", name, e);
                    continue;
                }
            };
            if select_config(configs, rate).is_none() {
                log::debug!("Skipping '{}': no input config at {} Hz", name, rate);
                continue;
            }
            sources.push(AudioSource {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
            });
        }

        log::debug!("Found {} usable input devices", sources.len());
        Ok(sources)
    }

    fn open_line(
        &self,
        device_id: &str,
        format: &SampleFormat,
    ) -> Result<Arc<dyn CaptureLine>, CaptureError> {
        format.validate()?;
        if device_id.is_empty() {
            return Err(CaptureError::InvalidArgument("device id is empty".into()));
        }
        let line = CpalLine::open(device_id, format, &self.config)?;
        Ok(Arc::new(line) as Arc<dyn CaptureLine>)
    }
}
