// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::constants::VIRTUAL_DEVICE_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// A video input device as reported by a device enumerator
///
/// The `id` is opaque to the scan session: for V4L2 devices it is the device
/// node path (`/dev/video0`), for virtual devices it is `file:<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoDevice {
    pub id: String,
    pub label: String,
}

impl VideoDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Create a virtual device backed by an image file
    pub fn virtual_source(path: &std::path::Path) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: format!("{}{}", VIRTUAL_DEVICE_PREFIX, path.display()),
            label: format!("{} (file)", label),
        }
    }
}

impl std::fmt::Display for VideoDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

/// Backend that serves a device id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    /// V4L2 capture node
    V4l2(String),
    /// Still image streamed as a camera
    Virtual(PathBuf),
}

impl DeviceKind {
    pub fn from_id(id: &str) -> Self {
        match id.strip_prefix(VIRTUAL_DEVICE_PREFIX) {
            Some(path) => DeviceKind::Virtual(PathBuf::from(path)),
            None => DeviceKind::V4l2(id.to_string()),
        }
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    /// Also used for decoded MJPEG frames, which are only needed as luma
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
}

impl PixelFormat {
    /// Bytes per pixel in the packed row layout
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::RGBA => 4,
            Self::RGB24 => 3,
            Self::Gray8 => 1,
            Self::YUYV => 2,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame (stride = width * bytes per pixel)
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format,
            stride: width * format.bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }

    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }

    /// Luma (0-255) of the pixel at `(x, y)`, clamped to the frame
    ///
    /// Out-of-range buffer reads yield black rather than panicking; drivers
    /// occasionally hand out short buffers.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let row = y * self.stride as usize;
        let data = self.data_slice();

        match self.format {
            PixelFormat::Gray8 => data.get(row + x).copied().unwrap_or(0),
            PixelFormat::YUYV => data.get(row + x * 2).copied().unwrap_or(0),
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                let idx = row + x * self.format.bytes_per_pixel() as usize;
                match data.get(idx..idx + 3) {
                    Some(&[r, g, b]) => rgb_to_luma(r, g, b),
                    _ => 0,
                }
            }
        }
    }
}

/// ITU-R BT.601 luma with integer weights
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Camera access refused by the platform
    PermissionDenied(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_from_id() {
        assert_eq!(
            DeviceKind::from_id("/dev/video0"),
            DeviceKind::V4l2("/dev/video0".to_string())
        );
        assert_eq!(
            DeviceKind::from_id("file:/tmp/code.png"),
            DeviceKind::Virtual(PathBuf::from("/tmp/code.png"))
        );
    }

    #[test]
    fn test_virtual_source_label() {
        let device = VideoDevice::virtual_source(std::path::Path::new("/tmp/ticket.png"));
        assert_eq!(device.id, "file:/tmp/ticket.png");
        assert_eq!(device.label, "ticket.png (file)");
        assert!(matches!(
            DeviceKind::from_id(&device.id),
            DeviceKind::Virtual(_)
        ));
    }

    #[test]
    fn test_luma_per_format() {
        let gray = CameraFrame::packed(2, 1, PixelFormat::Gray8, vec![10, 200]);
        assert_eq!(gray.luma_at(1, 0), 200);

        // Y0 U Y1 V
        let yuyv = CameraFrame::packed(2, 1, PixelFormat::YUYV, vec![30, 128, 220, 128]);
        assert_eq!(yuyv.luma_at(0, 0), 30);
        assert_eq!(yuyv.luma_at(1, 0), 220);

        let rgba = CameraFrame::packed(1, 1, PixelFormat::RGBA, vec![255, 255, 255, 255]);
        assert!(rgba.luma_at(0, 0) >= 254);

        let rgb = CameraFrame::packed(1, 1, PixelFormat::RGB24, vec![0, 0, 0]);
        assert_eq!(rgb.luma_at(0, 0), 0);
    }

    #[test]
    fn test_luma_clamps_and_tolerates_short_buffers() {
        let frame = CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![1, 2, 3, 4]);
        assert_eq!(frame.luma_at(10, 10), 4);

        let short = CameraFrame {
            width: 4,
            height: 4,
            data: Arc::from(vec![9u8; 3].into_boxed_slice()),
            format: PixelFormat::Gray8,
            stride: 4,
            captured_at: Instant::now(),
        };
        assert_eq!(short.luma_at(3, 3), 0);
    }

    #[test]
    fn test_io_error_mapping() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "video0");
        assert!(matches!(
            BackendError::from(err),
            BackendError::PermissionDenied(_)
        ));
    }
}
