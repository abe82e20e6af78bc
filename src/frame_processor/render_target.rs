// SPDX-License-Identifier: GPL-3.0-only

//! Preview surface shared between a decode loop and the presentation layer

use crate::backends::camera::types::CameraFrame;
use std::sync::{Arc, Mutex, MutexGuard};

/// Named preview surface
///
/// The decode loop writes the most recent frame; the UI reads it. Only the
/// active binding presents frames, and the engine clears the surface when the
/// binding stops so a stale picture never outlives its loop.
#[derive(Clone)]
pub struct RenderTarget {
    id: Arc<str>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
}

impl RenderTarget {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the displayed frame
    pub fn present(&self, frame: CameraFrame) {
        *self.slot() = Some(frame);
    }

    /// Most recent frame, if any (cheap: frame data is reference counted)
    pub fn latest(&self) -> Option<CameraFrame> {
        self.slot().clone()
    }

    pub fn has_frame(&self) -> bool {
        self.slot().is_some()
    }

    /// Release the surface
    pub fn clear(&self) {
        self.slot().take();
    }

    fn slot(&self) -> MutexGuard<'_, Option<CameraFrame>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("id", &self.id)
            .field("has_frame", &self.has_frame())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_present_and_clear() {
        let target = RenderTarget::new("video");
        assert_eq!(target.id(), "video");
        assert!(target.latest().is_none());

        let reader = target.clone();
        target.present(CameraFrame::packed(1, 1, PixelFormat::Gray8, vec![7]));
        assert_eq!(reader.latest().map(|f| f.luma_at(0, 0)), Some(7));

        reader.clear();
        assert!(!target.has_frame());
    }
}
