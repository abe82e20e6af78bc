// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ ScanSessionManager  │
//! └──────────┬──────────┘
//!            │ list_devices()
//!            ▼
//! ┌─────────────────────┐
//! │ DeviceEnumerator    │  ← SystemEnumerator: V4L2 + virtual files
//! └─────────────────────┘
//!
//! ┌─────────────────────┐
//! │ FrameDecodeEngine   │
//! └──────────┬──────────┘
//!            │ open_frame_source(device_id)
//!            ▼
//! ┌─────────────────────┐
//! │ FrameSource         │  ← V4l2Source / ImageFileSource
//! └─────────────────────┘
//! ```

pub mod frame_loop;
pub mod types;
pub mod v4l2;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use types::*;

use crate::backends::virtual_camera::ImageFileSource;
use crate::config::Config;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Supplies the ordered list of available video input devices
///
/// Queried once when a scan session initializes.
pub trait DeviceEnumerator {
    fn list_devices(&self) -> impl Future<Output = BackendResult<Vec<VideoDevice>>> + Send;
}

/// Enumerates V4L2 capture devices followed by configured virtual sources
#[derive(Debug, Clone, Default)]
pub struct SystemEnumerator {
    virtual_sources: Vec<PathBuf>,
}

impl SystemEnumerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_virtual_sources(virtual_sources: Vec<PathBuf>) -> Self {
        Self { virtual_sources }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_virtual_sources(config.virtual_sources.clone())
    }
}

impl DeviceEnumerator for SystemEnumerator {
    async fn list_devices(&self) -> BackendResult<Vec<VideoDevice>> {
        let virtual_sources = self.virtual_sources.clone();

        // V4L2 queries are blocking ioctls
        tokio::task::spawn_blocking(move || {
            let mut devices = v4l2::enumerate_capture_devices()?;
            devices.extend(
                virtual_sources
                    .iter()
                    .map(|path| VideoDevice::virtual_source(path)),
            );
            info!(count = devices.len(), "Enumerated video devices");
            Ok(devices)
        })
        .await
        .map_err(|e| BackendError::Other(format!("Device enumeration task failed: {}", e)))?
    }
}

/// Prepared source of frames, validated on the caller's thread
pub trait FrameSource: Send {
    /// Human-readable name for logging
    fn describe(&self) -> String;

    /// Start streaming; called on the capture thread
    fn open_stream(self: Box<Self>) -> BackendResult<Box<dyn FrameStream>>;
}

/// Blocking frame iterator owned by a capture thread
pub trait FrameStream {
    /// Next frame, or `None` once the source is exhausted
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>>;
}

/// Parameters used when opening a device for capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub capture_width: u32,
    pub capture_height: u32,
    /// Replay interval for virtual sources
    pub frame_interval: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SourceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture_width: config.capture_width,
            capture_height: config.capture_height,
            frame_interval: config.frame_interval(),
        }
    }
}

/// Open the frame source behind a device id
pub fn open_frame_source(
    device_id: &str,
    options: &SourceOptions,
) -> BackendResult<Box<dyn FrameSource>> {
    debug!(device = %device_id, "Opening frame source");
    match DeviceKind::from_id(device_id) {
        DeviceKind::Virtual(path) => Ok(Box::new(ImageFileSource::open(
            &path,
            options.frame_interval,
        )?)),
        DeviceKind::V4l2(path) => Ok(Box::new(v4l2::V4l2Source::open(
            &path,
            options.capture_width,
            options.capture_height,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_virtual_source() {
        let result = open_frame_source("file:/nonexistent/label.png", &SourceOptions::default());
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn test_source_options_from_config() {
        let config = Config {
            capture_width: 1280,
            capture_height: 720,
            frame_interval_ms: 10,
            ..Config::default()
        };
        let options = SourceOptions::from_config(&config);
        assert_eq!(options.capture_width, 1280);
        assert_eq!(options.frame_interval, Duration::from_millis(10));
    }
}
