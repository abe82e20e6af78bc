// SPDX-License-Identifier: MPL-2.0

//! Error types for the barcode scanner

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Scan session errors
    Scan(ScanError),
    /// Device or capture errors outside a session
    Backend(BackendError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Scan session errors
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The device enumerator failed; the session never starts decoding
    Enumeration(BackendError),
    /// Selection named a device that is not in the enumerated list
    UnknownDevice(String),
    /// The decode engine could not bind the device
    EngineStart(BackendError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Backend(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Enumeration(e) => write!(f, "Device enumeration failed: {}", e),
            ScanError::UnknownDevice(id) => write!(f, "Unknown device: {}", id),
            ScanError::EngineStart(e) => write!(f, "Failed to start decoding: {}", e),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for ScanError {}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        AppError::Scan(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::UnknownDevice("cam9".into());
        assert_eq!(err.to_string(), "Unknown device: cam9");

        let app: AppError = err.into();
        assert_eq!(app.to_string(), "Scan error: Unknown device: cam9");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(AppError::from(io), AppError::Io(_)));
    }
}
