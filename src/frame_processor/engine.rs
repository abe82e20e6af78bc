// SPDX-License-Identifier: GPL-3.0-only

//! Continuous decode engine
//!
//! Binds one device to one render target at a time. Every captured frame is
//! presented to the target, decoded, and reported through the binding's
//! callback until [`DecodeEngine::stop`] is called or the capture loop ends
//! on its own.

use crate::backends::camera::{
    BackendResult, CaptureLoopController, FrameSource, LoopAction, SourceOptions,
    open_frame_source,
};
use crate::config::Config;
use crate::constants::timing::{CAPTURE_RETRY_DELAY, MAX_CAPTURE_ERRORS};
use crate::frame_processor::render_target::RenderTarget;
use crate::frame_processor::tasks::BarcodeDetector;
use crate::frame_processor::types::{DecodeOutcome, SymbologySet};
use tracing::{debug, info, warn};

/// Receives one outcome per analysed frame, on the capture thread
pub type DecodeCallback = Box<dyn FnMut(DecodeOutcome) + Send + 'static>;

/// Runs a barcode decode loop against a video device
pub trait DecodeEngine: Send {
    /// Bind `device_id` to `target` and start decoding
    ///
    /// Any existing binding is stopped first. Errors opening the device are
    /// returned here; per-frame failures are reported through `callback`.
    fn decode_continuously(
        &mut self,
        device_id: &str,
        target: &RenderTarget,
        formats: &SymbologySet,
        callback: DecodeCallback,
    ) -> BackendResult<()>;

    /// Whether the current binding can still deliver outcomes
    ///
    /// Turns false when the capture loop exits without `stop`, for example
    /// when the stream cannot be started or the device disappears.
    fn is_running(&self) -> bool;

    /// Stop the active binding and release the device
    ///
    /// Returns once the callback can no longer be invoked. Safe to call when
    /// nothing is bound.
    fn stop(&mut self);
}

/// Decode engine backed by V4L2/image-file sources and the barcode detector
pub struct FrameDecodeEngine {
    detector: BarcodeDetector,
    options: SourceOptions,
    controller: Option<CaptureLoopController>,
    bound_target: Option<RenderTarget>,
}

impl Default for FrameDecodeEngine {
    fn default() -> Self {
        Self::new(BarcodeDetector::new(), SourceOptions::default())
    }
}

impl FrameDecodeEngine {
    pub fn new(detector: BarcodeDetector, options: SourceOptions) -> Self {
        Self {
            detector,
            options,
            controller: None,
            bound_target: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            BarcodeDetector::with_max_dimension(config.max_dimension),
            SourceOptions::from_config(config),
        )
    }

    /// Start the capture thread for an opened source
    fn bind_source(
        &mut self,
        source: Box<dyn FrameSource>,
        target: &RenderTarget,
        formats: &SymbologySet,
        mut callback: DecodeCallback,
    ) {
        let name = format!("decode:{}", source.describe());
        let detector = self.detector.clone();
        let formats = formats.clone();
        let frame_target = target.clone();
        let mut consecutive_errors = 0u32;

        let controller = CaptureLoopController::start_with_init(
            &name,
            move || source.open_stream(),
            move |stream| match stream.next_frame() {
                Ok(Some(frame)) => {
                    consecutive_errors = 0;
                    frame_target.present(frame.clone());
                    callback(detector.decode(&frame, &formats));
                    LoopAction::Continue
                }
                Ok(None) => {
                    debug!("Frame source exhausted");
                    LoopAction::Stop
                }
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CAPTURE_ERRORS {
                        warn!(error = %e, errors = consecutive_errors, "Giving up on capture");
                        return LoopAction::Stop;
                    }
                    if consecutive_errors == 1 {
                        warn!(error = %e, "Frame capture failed");
                    } else {
                        debug!(error = %e, errors = consecutive_errors, "Frame capture failed");
                    }
                    std::thread::sleep(CAPTURE_RETRY_DELAY);
                    LoopAction::Continue
                }
            },
        );

        self.controller = Some(controller);
        self.bound_target = Some(target.clone());
    }
}

impl DecodeEngine for FrameDecodeEngine {
    fn decode_continuously(
        &mut self,
        device_id: &str,
        target: &RenderTarget,
        formats: &SymbologySet,
        callback: DecodeCallback,
    ) -> BackendResult<()> {
        self.stop();

        let source = open_frame_source(device_id, &self.options)?;
        info!(device = %device_id, target = %target.id(), "Binding decode loop");
        self.bind_source(source, target, formats, callback);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| c.is_running())
            .unwrap_or(false)
    }

    fn stop(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
        }
        if let Some(target) = self.bound_target.take() {
            debug!(target = %target.id(), "Releasing render target");
            target.clear();
        }
    }
}

impl Drop for FrameDecodeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
