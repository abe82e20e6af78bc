// SPDX-License-Identifier: GPL-3.0-only

//! Barcode detection task
//!
//! Decodes camera frames in two passes. QR codes go through rqrr; every
//! other allowed symbology goes through rxing's multi-format reader with
//! the allow-list passed as its `PossibleFormats` hint. Frames are
//! converted to greyscale and downscaled first, and engine errors are
//! mapped onto the closed [`DecodeFailure`] set.

use crate::backends::camera::types::CameraFrame;
use crate::constants::decode::DEFAULT_MAX_DIMENSION;
use crate::frame_processor::types::{
    DecodeFailure, DecodeOutcome, DecodedPayload, FrameRegion, Symbology, SymbologySet,
};
use rxing::{BarcodeFormat, DecodeHints, Exceptions, RXingResult};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Barcode detector
#[derive(Debug, Clone)]
pub struct BarcodeDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for BarcodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BarcodeDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode one frame
    ///
    /// When several codes are visible the first successful decode wins.
    /// Otherwise a located-but-unreadable code is reported in preference
    /// to `NotFound`.
    pub fn decode(&self, frame: &CameraFrame, formats: &SymbologySet) -> DecodeOutcome {
        if formats.is_empty() || frame.width == 0 || frame.height == 0 {
            return DecodeOutcome::not_found();
        }

        let start = std::time::Instant::now();
        let luma = LumaImage::from_frame(frame, self.max_dimension);
        trace!(
            width = luma.width,
            height = luma.height,
            scale = luma.scale,
            "Prepared greyscale image"
        );

        let mut failure = DecodeFailure::NotFound;

        if formats.contains(Symbology::QrCode) {
            match self.decode_qr(&luma, frame) {
                Ok(payload) => {
                    debug!(
                        content = %payload.text,
                        total_ms = start.elapsed().as_millis(),
                        "Decoded QR code"
                    );
                    return DecodeOutcome::Success(payload);
                }
                Err(qr_failure) => failure = qr_failure,
            }
        }

        let hints = linear_hints(formats);
        if hints.PossibleFormats.as_ref().is_some_and(|f| !f.is_empty()) {
            match self.decode_multi_format(&luma, frame, hints) {
                Ok(payload) => {
                    debug!(
                        content = %payload.text,
                        symbology = %payload.symbology,
                        total_ms = start.elapsed().as_millis(),
                        "Decoded barcode"
                    );
                    return DecodeOutcome::Success(payload);
                }
                Err(other) if failure == DecodeFailure::NotFound => failure = other,
                Err(other) => trace!(?other, "Multi-format pass failed"),
            }
        }

        DecodeOutcome::Failure(failure)
    }

    fn decode_qr(
        &self,
        luma: &LumaImage,
        frame: &CameraFrame,
    ) -> Result<DecodedPayload, DecodeFailure> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width as usize,
            luma.height as usize,
            |x, y| luma.pixel(x, y),
        );
        let grids = prepared.detect_grids();

        let mut first_failure = None;
        for grid in &grids {
            match grid.decode() {
                Ok((_meta, content)) => {
                    let bounds = luma.region_from_corners(&grid.bounds, frame);
                    return Ok(
                        DecodedPayload::new(content, Symbology::QrCode).with_bounds(bounds)
                    );
                }
                Err(e) => {
                    trace!(error = %e, "Failed to decode QR grid");
                    first_failure.get_or_insert_with(|| classify_qr_error(&e));
                }
            }
        }

        Err(first_failure.unwrap_or(DecodeFailure::NotFound))
    }

    fn decode_multi_format(
        &self,
        luma: &LumaImage,
        frame: &CameraFrame,
        mut hints: DecodeHints,
    ) -> Result<DecodedPayload, DecodeFailure> {
        let result = rxing::helpers::detect_in_luma_with_hints(
            luma.data.clone(),
            luma.width,
            luma.height,
            None,
            &mut hints,
        )
        .map_err(|e| classify_rxing_error(&e))?;

        let Some(symbology) = symbology_of(result.getBarcodeFormat()) else {
            trace!(format = ?result.getBarcodeFormat(), "Ignoring unexpected format");
            return Err(DecodeFailure::NotFound);
        };

        let payload = DecodedPayload::new(result.getText(), symbology);
        Ok(match luma.region_from_result(&result, frame) {
            Some(bounds) => payload.with_bounds(bounds),
            None => payload,
        })
    }
}

/// Hints restricting rxing to the allowed symbologies other than QR
fn linear_hints(formats: &SymbologySet) -> DecodeHints {
    let possible: HashSet<BarcodeFormat> = formats
        .iter()
        .filter(|s| **s != Symbology::QrCode)
        .map(|s| barcode_format(*s))
        .collect();

    DecodeHints {
        PossibleFormats: Some(possible),
        TryHarder: Some(true),
        ..DecodeHints::default()
    }
}

fn barcode_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Code93 => BarcodeFormat::CODE_93,
        Symbology::Codabar => BarcodeFormat::CODABAR,
        Symbology::DataMatrix => BarcodeFormat::DATA_MATRIX,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::Itf => BarcodeFormat::ITF,
        Symbology::QrCode => BarcodeFormat::QR_CODE,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
        Symbology::UpcEanExtension => BarcodeFormat::UPC_EAN_EXTENSION,
    }
}

fn symbology_of(format: &BarcodeFormat) -> Option<Symbology> {
    Symbology::ALL
        .into_iter()
        .find(|s| barcode_format(*s) == *format)
}

/// Map an rqrr error onto the failure taxonomy
fn classify_qr_error(err: &rqrr::DeQRError) -> DecodeFailure {
    use rqrr::DeQRError;

    match err {
        DeQRError::DataEcc | DeQRError::FormatEcc => DecodeFailure::ChecksumInvalid,
        DeQRError::InvalidVersion
        | DeQRError::InvalidGridSize
        | DeQRError::UnknownDataType
        | DeQRError::EncodingError
        | DeQRError::DataOverflow
        | DeQRError::DataUnderflow => DecodeFailure::FormatInvalid,
        other => DecodeFailure::Unclassified(other.to_string()),
    }
}

/// Map an rxing error onto the failure taxonomy
fn classify_rxing_error(err: &Exceptions) -> DecodeFailure {
    match err {
        Exceptions::NotFoundException(_) => DecodeFailure::NotFound,
        Exceptions::ChecksumException(_) => DecodeFailure::ChecksumInvalid,
        Exceptions::FormatException(_) => DecodeFailure::FormatInvalid,
        other => DecodeFailure::Unclassified(format!("{:?}", other)),
    }
}

/// Greyscale copy of a frame, downscaled to fit `max_dimension`
struct LumaImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    /// Source pixels per processed pixel
    scale: f32,
}

impl LumaImage {
    fn from_frame(frame: &CameraFrame, max_dimension: u32) -> Self {
        let scale = if frame.width > max_dimension || frame.height > max_dimension {
            (frame.width as f32 / max_dimension as f32)
                .max(frame.height as f32 / max_dimension as f32)
        } else {
            1.0
        };
        let width = ((frame.width as f32 / scale) as u32).max(1);
        let height = ((frame.height as f32 / scale) as u32).max(1);

        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            let src_y = (y as f32 * scale) as u32;
            for x in 0..width {
                let src_x = (x as f32 * scale) as u32;
                data.push(frame.luma_at(src_x, src_y));
            }
        }

        Self {
            width,
            height,
            data,
            scale,
        }
    }

    fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or(0)
    }

    /// Bounding box of a QR grid's corners in normalized source-frame coordinates
    fn region_from_corners(&self, points: &[rqrr::Point; 4], frame: &CameraFrame) -> FrameRegion {
        let corners: Vec<(f32, f32)> = points
            .iter()
            .map(|p| (p.x as f32, p.y as f32))
            .collect();
        self.region_from_points(&corners, frame)
    }

    /// Bounding box of the result points rxing reports, if any
    ///
    /// Linear codes report points along a single scan row, so the region
    /// may have zero height.
    fn region_from_result(
        &self,
        result: &RXingResult,
        frame: &CameraFrame,
    ) -> Option<FrameRegion> {
        let points: Vec<(f32, f32)> = result.getPoints().iter().map(|p| (p.x, p.y)).collect();
        if points.is_empty() {
            return None;
        }
        Some(self.region_from_points(&points, frame))
    }

    fn region_from_points(&self, points: &[(f32, f32)], frame: &CameraFrame) -> FrameRegion {
        let clamp_x = |v: f32| v.clamp(0.0, self.width as f32);
        let clamp_y = |v: f32| v.clamp(0.0, self.height as f32);

        let min_x = points.iter().map(|p| clamp_x(p.0)).fold(f32::MAX, f32::min);
        let max_x = points.iter().map(|p| clamp_x(p.0)).fold(0.0, f32::max);
        let min_y = points.iter().map(|p| clamp_y(p.1)).fold(f32::MAX, f32::min);
        let max_y = points.iter().map(|p| clamp_y(p.1)).fold(0.0, f32::max);

        FrameRegion::from_pixels(
            (min_x * self.scale) as u32,
            (min_y * self.scale) as u32,
            ((max_x - min_x) * self.scale) as u32,
            ((max_y - min_y) * self.scale) as u32,
            frame.width,
            frame.height,
        )
    }
}
