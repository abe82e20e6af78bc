// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera sources
//!
//! Image files listed in the configuration appear as extra video devices
//! with ids of the form `file:<path>`.

mod file_source;

pub use file_source::{ImageFileSource, load_image_as_frame};
