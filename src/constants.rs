// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier used for config and cache directories
pub const APP_ID: &str = "barcode-scanner";

/// Prefix marking a virtual (image file) device id
pub const VIRTUAL_DEVICE_PREFIX: &str = "file:";

/// Default identifier of the preview surface a decode loop renders into
pub const DEFAULT_RENDER_TARGET_ID: &str = "video";

/// Decoding constants
pub mod decode {
    /// Frames are downscaled so their longest side is at most this many pixels
    /// before detection. Codes held up to a webcam survive this comfortably.
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;
}

/// V4L2 capture constants
pub mod capture {
    /// Requested capture width (drivers may adjust)
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Requested capture height (drivers may adjust)
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Number of mmap buffers
    pub const BUFFER_COUNT: u32 = 4;

    /// Pixel formats accepted from the driver, in order of preference
    pub const PREFERRED_FOURCCS: &[&[u8; 4]] = &[b"YUYV", b"MJPG", b"GREY"];
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame interval for image-file sources (~30fps)
    pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

    /// Back-off after a failed frame read before trying again
    pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(100);

    /// Consecutive failed frame reads after which a capture loop gives up
    pub const MAX_CAPTURE_ERRORS: u32 = 20;

    /// How often a waiting session checks that its capture loop is alive
    pub const LOOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

    /// Terminal UI input poll timeout (also the redraw cadence)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Headless scan loop poll interval
    pub const CLI_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 300;
}

/// Supported file formats for virtual sources
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
