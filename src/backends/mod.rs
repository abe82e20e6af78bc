// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for video input
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Scan session                   │
//! └────────────────────┬────────────────────────┘
//!                      │ DeviceEnumerator / FrameSource
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │     Camera       │  │ Virtual Camera  │  │
//! │  │     (V4L2)       │  │  (image files)  │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device enumeration, frame types and V4L2 capture
//! - [`virtual_camera`]: Image files served as cameras

pub mod camera;
pub mod virtual_camera;
