// SPDX-License-Identifier: MPL-2.0

//! Barcode Scanner - scan barcodes and QR codes from a camera
//!
//! This library binds a video input device to a barcode decode loop and
//! keeps the most recent decoded payload.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Device enumeration and frame sources (V4L2, image files)
//! - [`frame_processor`]: Barcode detection, decode engine and render target
//! - [`session`]: Scan session lifecycle and outcome classification
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal user interface
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load();
//! let mut session = ScanSessionManager::new(
//!     SystemEnumerator::from_config(&config),
//!     FrameDecodeEngine::from_config(&config),
//!     config.symbology_set(),
//!     RenderTarget::new(&config.render_target_id),
//! );
//! session.initialize().await?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use backends::camera::{DeviceEnumerator, SystemEnumerator, VideoDevice};
pub use config::Config;
pub use errors::{AppError, AppResult, ScanError};
pub use frame_processor::{
    DecodeEngine, DecodeFailure, DecodeOutcome, DecodedPayload, FrameDecodeEngine, RenderTarget,
    Symbology, SymbologySet,
};
pub use session::{LoopState, OutcomeDisposition, ScanSessionManager};
