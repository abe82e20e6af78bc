// SPDX-License-Identifier: GPL-3.0-only

//! Frame analysis tasks

pub mod barcode_detector;

pub use barcode_detector::BarcodeDetector;
