// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 device enumeration and capture
//!
//! Devices are listed from `/dev/video*` and filtered to capture-capable
//! nodes. Capture negotiates YUYV first (luma is read directly from the
//! packed buffer) and falls back to MJPG or GREY.

use super::types::{BackendError, BackendResult, CameraFrame, PixelFormat, VideoDevice};
use super::{FrameSource, FrameStream};
use crate::constants::capture::{BUFFER_COUNT, PREFERRED_FOURCCS};
use crate::constants::timing::FRAME_LOG_INTERVAL;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::capability::Flags;
use v4l::{
    Device, Format, FourCC, buffer::Type, io::mmap::Stream as MmapStream,
    io::traits::CaptureStream, video::Capture,
};

/// Enumerate V4L2 capture devices, ordered by node index
///
/// Fails with `PermissionDenied` only when video nodes exist but none of
/// them could be opened.
pub fn enumerate_capture_devices() -> BackendResult<Vec<VideoDevice>> {
    let mut nodes = v4l::context::enum_devices();
    nodes.sort_by_key(|node| node.index());

    let mut devices = Vec::new();
    let mut denied = Vec::new();

    for node in nodes {
        let path = node.path().to_string_lossy().to_string();

        let device = match Device::with_path(node.path()) {
            Ok(device) => device,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                debug!(path = %path, "Permission denied opening video node");
                denied.push(path);
                continue;
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Could not open video node");
                continue;
            }
        };

        let caps = match device.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "VIDIOC_QUERYCAP failed");
                continue;
            }
        };

        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!(path = %path, card = %caps.card, "Skipping non-capture node");
            continue;
        }

        let label = if caps.card.trim().is_empty() {
            node.name().unwrap_or_else(|| path.clone())
        } else {
            caps.card.trim().to_string()
        };

        info!(path = %path, label = %label, driver = %caps.driver, "Found camera");
        devices.push(VideoDevice::new(path, label));
    }

    if devices.is_empty() && !denied.is_empty() {
        warn!(nodes = ?denied, "No accessible video devices");
        return Err(BackendError::PermissionDenied(denied.join(", ")));
    }

    Ok(devices)
}

/// Wire encoding negotiated with the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEncoding {
    Yuyv,
    Mjpeg,
    Grey,
}

impl StreamEncoding {
    pub fn from_fourcc(repr: &[u8; 4]) -> Option<Self> {
        match repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"GREY" => Some(Self::Grey),
            _ => None,
        }
    }
}

/// An opened, format-negotiated V4L2 device
///
/// Streaming starts on the capture thread in [`FrameSource::open_stream`].
pub struct V4l2Source {
    path: String,
    device: Device,
    width: u32,
    height: u32,
    stride: u32,
    encoding: StreamEncoding,
}

impl V4l2Source {
    pub fn open(path: &str, width: u32, height: u32) -> BackendResult<Self> {
        let device = Device::with_path(path)?;
        let (format, encoding) = negotiate_format(&device, width, height)?;

        let bytes_per_pixel = match encoding {
            StreamEncoding::Yuyv => 2,
            StreamEncoding::Grey | StreamEncoding::Mjpeg => 1,
        };
        let stride = if format.stride > 0 {
            format.stride
        } else {
            format.width * bytes_per_pixel
        };

        info!(
            path,
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "Negotiated capture format"
        );

        Ok(Self {
            path: path.to_string(),
            device,
            width: format.width,
            height: format.height,
            stride,
            encoding,
        })
    }
}

fn negotiate_format(
    device: &Device,
    width: u32,
    height: u32,
) -> BackendResult<(Format, StreamEncoding)> {
    for fourcc in PREFERRED_FOURCCS {
        let requested = Format::new(width, height, FourCC::new(*fourcc));
        match Capture::set_format(device, &requested) {
            Ok(actual) => {
                if let Some(encoding) = StreamEncoding::from_fourcc(&actual.fourcc.repr) {
                    return Ok((actual, encoding));
                }
                debug!(got = %actual.fourcc, "Driver substituted an unsupported format");
            }
            Err(e) => debug!(error = %e, "Could not set format"),
        }
    }
    Err(BackendError::FormatNotSupported(
        "device offers none of YUYV, MJPG, GREY".to_string(),
    ))
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        self.path.clone()
    }

    fn open_stream(self: Box<Self>) -> BackendResult<Box<dyn FrameStream>> {
        let stream = MmapStream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| BackendError::IoError(format!("Failed to create buffer stream: {}", e)))?;

        info!(path = %self.path, "V4L2 capture stream started");

        Ok(Box::new(V4l2Stream {
            stream,
            width: self.width,
            height: self.height,
            stride: self.stride,
            encoding: self.encoding,
            frames: 0,
        }))
    }
}

struct V4l2Stream {
    stream: MmapStream<'static>,
    width: u32,
    height: u32,
    stride: u32,
    encoding: StreamEncoding,
    frames: u64,
}

impl FrameStream for V4l2Stream {
    fn next_frame(&mut self) -> BackendResult<Option<CameraFrame>> {
        let (buf, meta) = CaptureStream::next(&mut self.stream)?;

        let used = if meta.bytesused > 0 {
            (meta.bytesused as usize).min(buf.len())
        } else {
            buf.len()
        };
        let data = &buf[..used];

        self.frames += 1;
        if self.frames % FRAME_LOG_INTERVAL == 0 {
            debug!(frames = self.frames, bytes = used, "Capture progress");
        }

        let frame = match self.encoding {
            StreamEncoding::Yuyv => CameraFrame {
                width: self.width,
                height: self.height,
                data: Arc::from(data),
                format: PixelFormat::YUYV,
                stride: self.stride,
                captured_at: Instant::now(),
            },
            StreamEncoding::Grey => CameraFrame {
                width: self.width,
                height: self.height,
                data: Arc::from(data),
                format: PixelFormat::Gray8,
                stride: self.stride,
                captured_at: Instant::now(),
            },
            StreamEncoding::Mjpeg => decode_mjpeg(data)?,
        };

        Ok(Some(frame))
    }
}

/// Decode an MJPG buffer straight to greyscale
fn decode_mjpeg(data: &[u8]) -> BackendResult<CameraFrame> {
    let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::Other(format!("MJPEG decode failed: {}", e)))?;
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();
    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::Gray8,
        luma.into_raw(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_from_fourcc() {
        assert_eq!(StreamEncoding::from_fourcc(b"YUYV"), Some(StreamEncoding::Yuyv));
        assert_eq!(StreamEncoding::from_fourcc(b"MJPG"), Some(StreamEncoding::Mjpeg));
        assert_eq!(StreamEncoding::from_fourcc(b"GREY"), Some(StreamEncoding::Grey));
        assert_eq!(StreamEncoding::from_fourcc(b"NV12"), None);
    }

    #[test]
    fn test_decode_mjpeg_to_gray() {
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([255, 255, 255]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let frame = decode_mjpeg(&jpeg).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.format, PixelFormat::Gray8);
        assert!(frame.luma_at(3, 2) > 240);
    }

    #[test]
    fn test_decode_mjpeg_rejects_garbage() {
        assert!(decode_mjpeg(&[0, 1, 2, 3]).is_err());
    }
}
