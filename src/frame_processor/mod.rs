// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for barcode decoding
//!
//! The decode engine pulls frames from a [`FrameSource`], shows them on a
//! [`RenderTarget`] and runs the barcode detector on each one, reporting a
//! [`DecodeOutcome`] per frame.
//!
//! [`FrameSource`]: crate::backends::camera::FrameSource

pub mod engine;
pub mod render_target;
pub mod tasks;
pub mod types;

pub use engine::{DecodeCallback, DecodeEngine, FrameDecodeEngine};
pub use render_target::RenderTarget;
pub use tasks::BarcodeDetector;
pub use types::{
    DecodeFailure, DecodeOutcome, DecodedPayload, FrameRegion, Symbology, SymbologySet,
};
