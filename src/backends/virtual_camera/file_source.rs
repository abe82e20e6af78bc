// SPDX-License-Identifier: GPL-3.0-only

//! File source streaming for virtual cameras
//!
//! A still image is decoded once and replayed at a fixed frame interval, so
//! a printed label saved to disk can be scanned exactly like a camera feed.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use crate::backends::camera::{FrameSource, FrameStream};
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    debug!(width, height, "Image loaded successfully");

    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::RGBA,
        rgba.into_raw(),
    ))
}

/// Virtual camera replaying one image file
pub struct ImageFileSource {
    path: PathBuf,
    frame: CameraFrame,
    frame_interval: Duration,
}

impl ImageFileSource {
    /// Validate and decode the file up front so a bad path fails the bind
    pub fn open(path: &Path, frame_interval: Duration) -> BackendResult<Self> {
        if !path.exists() {
            return Err(BackendError::DeviceNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !file_formats::is_image_extension(extension) {
            return Err(BackendError::FormatNotSupported(format!(
                "Unsupported file format: {}",
                extension
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            frame: load_image_as_frame(path)?,
            frame_interval,
        })
    }
}

impl FrameSource for ImageFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open_stream(self: Box<Self>) -> BackendResult<Box<dyn FrameStream>> {
        Ok(Box::new(ImageFileStream {
            frame: self.frame,
            frame_interval: self.frame_interval,
            started: false,
        }))
    }
}

struct ImageFileStream {
    frame: CameraFrame,
    frame_interval: Duration,
    started: bool,
}

impl FrameStream for ImageFileStream {
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        if self.started {
            std::thread::sleep(self.frame_interval);
        }
        self.started = true;

        let mut frame = self.frame.clone();
        frame.captured_at = Instant::now();
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_image(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.png", name, std::process::id()));
        image::RgbaImage::from_pixel(4, 3, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_load_image_as_frame() {
        let path = write_test_image("scanner-load");
        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.format, PixelFormat::RGBA);
        assert_eq!(frame.stride, 16);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_stream_repeats_frame() {
        let path = write_test_image("scanner-stream");
        let source = ImageFileSource::open(&path, Duration::from_millis(1)).unwrap();
        let mut stream = Box::new(source).open_stream().unwrap();

        for _ in 0..3 {
            let frame = stream.next_frame().unwrap().unwrap();
            assert_eq!(frame.width, 4);
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = ImageFileSource::open(Path::new("/nonexistent/code.png"), Duration::ZERO);
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join(format!("scanner-{}.txt", std::process::id()));
        std::fs::write(&path, b"not an image").unwrap();
        let result = ImageFileSource::open(&path, Duration::ZERO);
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
        std::fs::remove_file(path).ok();
    }
}
