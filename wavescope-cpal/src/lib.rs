//! # wavescope-cpal
//!
//! cpal input-device backend for wavescope.
//!
//! Provides:
//! - `CpalDeviceProvider`: input device enumeration on the default host
//! - `CpalLine`: a blocking `CaptureLine` over a cpal input stream
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use wavescope_core::{CaptureConfiguration, CaptureSession};
//! use wavescope_cpal::CpalDeviceProvider;
//!
//! let sink = Arc::new(|frame: &[f32], _origin| println!("{} samples", frame.len()));
//! let session = CaptureSession::new(CpalDeviceProvider::new(), CaptureConfiguration::default(), sink)?;
//! let devices = session.list_input_devices()?;
//! session.start_capture(&devices[0].id)?;
//! ```

pub mod device_provider;
pub mod line;

pub use device_provider::CpalDeviceProvider;
pub use line::{CpalLine, CpalLineConfig};
