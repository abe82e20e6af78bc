// SPDX-License-Identifier: MPL-2.0

//! Core types for frame decoding results
//!
//! A decode engine reports exactly one [`DecodeOutcome`] per analysed frame.
//! Failures are a closed set so the session can switch on them exhaustively.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }
}

/// Barcode symbologies a decode engine can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Code128,
    Code39,
    Code93,
    Codabar,
    DataMatrix,
    Ean13,
    Ean8,
    Itf,
    QrCode,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl Symbology {
    /// Every symbology, in allow-list order
    pub const ALL: [Symbology; 12] = [
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Codabar,
        Symbology::DataMatrix,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Itf,
        Symbology::QrCode,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::UpcEanExtension,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Symbology::Code128 => "Code 128",
            Symbology::Code39 => "Code 39",
            Symbology::Code93 => "Code 93",
            Symbology::Codabar => "Codabar",
            Symbology::DataMatrix => "Data Matrix",
            Symbology::Ean13 => "EAN-13",
            Symbology::Ean8 => "EAN-8",
            Symbology::Itf => "ITF",
            Symbology::QrCode => "QR Code",
            Symbology::UpcA => "UPC-A",
            Symbology::UpcE => "UPC-E",
            Symbology::UpcEanExtension => "UPC/EAN extension",
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Ordered, duplicate-free allow-list of symbologies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Symbology>", into = "Vec<Symbology>")]
pub struct SymbologySet(Vec<Symbology>);

impl SymbologySet {
    /// The allow-list used when nothing is configured: all supported formats
    pub fn default_allow_list() -> Self {
        Self(Symbology::ALL.to_vec())
    }

    pub fn contains(&self, symbology: Symbology) -> bool {
        self.0.contains(&symbology)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbology> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SymbologySet {
    fn default() -> Self {
        Self::default_allow_list()
    }
}

impl From<Vec<Symbology>> for SymbologySet {
    fn from(list: Vec<Symbology>) -> Self {
        list.into_iter().collect()
    }
}

impl From<SymbologySet> for Vec<Symbology> {
    fn from(set: SymbologySet) -> Self {
        set.0
    }
}

impl FromIterator<Symbology> for SymbologySet {
    fn from_iter<T: IntoIterator<Item = Symbology>>(iter: T) -> Self {
        let mut list = Vec::new();
        for symbology in iter {
            if !list.contains(&symbology) {
                list.push(symbology);
            }
        }
        Self(list)
    }
}

/// A successfully decoded code
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    /// Decoded text
    pub text: String,
    /// Symbology the engine decoded
    pub symbology: Symbology,
    /// Location of the code in normalized frame coordinates, if known
    pub bounds: Option<FrameRegion>,
    /// When the frame was decoded
    pub decoded_at: DateTime<Local>,
}

impl DecodedPayload {
    pub fn new(text: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            text: text.into(),
            symbology,
            bounds: None,
            decoded_at: Local::now(),
        }
    }

    pub fn with_bounds(mut self, bounds: FrameRegion) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Why a frame produced no payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No code in the frame. The steady state between scans.
    NotFound,
    /// A code was located but its error correction or check digits failed
    ChecksumInvalid,
    /// A code was located but its structure could not be read
    FormatInvalid,
    /// Any other engine error, carried for debugging only
    Unclassified(String),
}

impl DecodeFailure {
    /// Diagnostic message for the classified failures
    pub fn log_message(&self) -> Option<&'static str> {
        match self {
            DecodeFailure::NotFound => Some("No barcode or QR code found"),
            DecodeFailure::ChecksumInvalid => {
                Some("A code was found, but its read value was not valid")
            }
            DecodeFailure::FormatInvalid => {
                Some("A code was found, but it was in an invalid format")
            }
            DecodeFailure::Unclassified(_) => None,
        }
    }
}

/// Result of analysing one frame
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Success(DecodedPayload),
    Failure(DecodeFailure),
}

impl DecodeOutcome {
    pub fn success(text: impl Into<String>, symbology: Symbology) -> Self {
        DecodeOutcome::Success(DecodedPayload::new(text, symbology))
    }

    pub fn not_found() -> Self {
        DecodeOutcome::Failure(DecodeFailure::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allow_list_has_all_formats() {
        let set = SymbologySet::default_allow_list();
        assert_eq!(set.len(), 12);
        assert!(set.contains(Symbology::QrCode));
        assert!(set.contains(Symbology::UpcEanExtension));
    }

    #[test]
    fn test_symbology_set_deduplicates() {
        let set: SymbologySet = [Symbology::QrCode, Symbology::Ean13, Symbology::QrCode]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().copied().collect::<Vec<_>>(),
            vec![Symbology::QrCode, Symbology::Ean13]
        );
    }

    #[test]
    fn test_symbology_serde_names() {
        let json = serde_json::to_string(&SymbologySet::from_iter([
            Symbology::UpcEanExtension,
            Symbology::Ean8,
        ]))
        .unwrap();
        assert_eq!(json, r#"["upc_ean_extension","ean8"]"#);
    }

    #[test]
    fn test_deserialize_drops_duplicates() {
        let set: SymbologySet =
            serde_json::from_str(r#"["qr_code","ean13","qr_code","ean13"]"#).unwrap();
        assert_eq!(
            set.iter().copied().collect::<Vec<_>>(),
            vec![Symbology::QrCode, Symbology::Ean13]
        );
    }

    #[test]
    fn test_failure_messages() {
        assert!(DecodeFailure::NotFound.log_message().is_some());
        assert!(DecodeFailure::ChecksumInvalid.log_message().is_some());
        assert!(DecodeFailure::Unclassified("x".into()).log_message().is_none());
    }

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(100, 50, 200, 100, 1000, 500);
        assert!((region.x - 0.1).abs() < 0.001);
        assert!((region.y - 0.1).abs() < 0.001);
        assert!((region.width - 0.2).abs() < 0.001);
        assert!((region.height - 0.2).abs() < 0.001);
    }
}
