// SPDX-License-Identifier: GPL-3.0-only

//! Frame source abstraction
//!
//! The recording loop only knows the [`FrameSource`] trait. Concrete
//! sources:
//!
//! ```text
//! ┌──────────────────────┐
//! │    RecordingLoop     │
//! └──────────┬───────────┘
//!            │ poll_capture()
//!            ▼
//! ┌──────────────────────┐
//! │  FrameSource trait   │
//! └──────┬────────┬──────┘
//!        ▼        ▼
//!   ┌────────┐ ┌──────────┐
//!   │  V4L2  │ │Synthetic │
//!   └────────┘ └──────────┘
//! ```
//!
//! - [`v4l2`]: paired color + depth V4L2 nodes of one Kinect (feature `v4l2`)
//! - [`synthetic`]: generated frames on an emulated device clock

pub mod format_converters;
pub mod frame_loop;
pub mod synthetic;
pub mod types;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use types::*;

use crate::config::{SourceConfig, SourceKind};
use crate::errors::CameraError;
use std::time::Duration;
use tracing::info;

/// Producer of synchronized color + depth captures
pub trait FrameSource {
    /// Name for logging
    fn name(&self) -> &str;

    /// Pull one capture
    ///
    /// `timeout = None` never blocks. `Some(t)` may block up to `t` waiting
    /// for a frame. `Ok(None)` means nothing was ready, which is expected
    /// and frequent. `Err` means the device is unusable.
    fn poll_capture(&mut self, timeout: Option<Duration>) -> BackendResult<Option<Capture>>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn poll_capture(&mut self, timeout: Option<Duration>) -> BackendResult<Option<Capture>> {
        (**self).poll_capture(timeout)
    }
}

/// Open the source selected by the configuration
///
/// Fails with a fatal [`CameraError`] when no device is found or it cannot
/// be started.
pub fn open_source(config: &SourceConfig) -> BackendResult<Box<dyn FrameSource>> {
    info!(kind = %config.kind, "Opening frame source");

    match config.kind {
        SourceKind::Synthetic => Ok(Box::new(synthetic::SyntheticSource::new(
            synthetic::SyntheticConfig::from_source_config(config),
        ))),
        SourceKind::V4l2 => open_v4l2(config),
    }
}

#[cfg(feature = "v4l2")]
fn open_v4l2(config: &SourceConfig) -> BackendResult<Box<dyn FrameSource>> {
    let device = match (&config.color_device, &config.depth_device) {
        (Some(color), Some(depth)) => DeviceInfo {
            name: "Manual".to_string(),
            color_path: color.clone(),
            depth_path: depth.clone(),
            ..Default::default()
        },
        _ => v4l2::find_kinect_pairs()
            .into_iter()
            .next()
            .ok_or(CameraError::NoCameraFound)?,
    };

    let source = v4l2::V4l2PairSource::open(&device, config.depth_width, config.depth_height)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "v4l2"))]
fn open_v4l2(_config: &SourceConfig) -> BackendResult<Box<dyn FrameSource>> {
    Err(CameraError::OpenFailed(
        "built without the v4l2 feature".to_string(),
    ))
}

/// Enumerate devices the hardware source can open
pub fn list_devices() -> Vec<DeviceInfo> {
    #[cfg(feature = "v4l2")]
    {
        v4l2::find_kinect_pairs()
    }
    #[cfg(not(feature = "v4l2"))]
    {
        Vec::new()
    }
}
