// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanning
//!
//! This module provides command-line functionality for:
//! - Listing available video devices
//! - Scanning continuously from a device
//! - Decoding a single image file

use barcode_scanner::{Config, ScanError};
use barcode_scanner::backends::camera::{DeviceEnumerator, SystemEnumerator, VideoDevice};
use barcode_scanner::backends::virtual_camera::load_image_as_frame;
use barcode_scanner::constants::timing::CLI_POLL_INTERVAL;
use barcode_scanner::frame_processor::{
    BarcodeDetector, DecodeOutcome, FrameDecodeEngine, RenderTarget,
};
use barcode_scanner::session::{OutcomeDisposition, ScanSessionManager};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// List all available video devices
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let enumerator = SystemEnumerator::from_config(config);
    let rt = tokio::runtime::Runtime::new()?;
    let devices = rt.block_on(enumerator.list_devices())?;

    if devices.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device.label);
        println!("      Id: {}", device.id);
    }

    Ok(())
}

/// Scan continuously, printing each decoded payload
///
/// `camera` is either an index from `list` or a device id. Without it the
/// first device is used.
pub fn scan(
    config: &Config,
    camera: Option<String>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let mut session = ScanSessionManager::new(
        SystemEnumerator::from_config(config),
        FrameDecodeEngine::from_config(config),
        config.symbology_set(),
        RenderTarget::new(&config.render_target_id),
    );

    // A first device that fails to open is fine when another was requested
    match rt.block_on(session.initialize()) {
        Err(ScanError::EngineStart(_)) if camera.is_some() => {}
        result => result?,
    }

    if session.devices().is_empty() {
        return Err("No cameras found".into());
    }

    if let Some(camera) = camera {
        let device_id = resolve_camera(session.devices(), &camera)?;
        session.select_device(&device_id)?;
    }

    if let Some(device) = session.selected_device() {
        eprintln!("Using camera: {}", device.label);
    }
    eprintln!("Scanning... (press Ctrl+C to stop)");

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let mut last_printed = String::new();
    while !stop_flag.load(Ordering::SeqCst) {
        let stored = session
            .process_pending()
            .contains(&OutcomeDisposition::Stored);

        if stored && session.last_decoded_text() != last_printed {
            last_printed = session.last_decoded_text().to_string();
            if let Some(payload) = session.last_payload() {
                eprintln!(
                    "[{}] {}",
                    payload.decoded_at.format("%H:%M:%S"),
                    payload.symbology
                );
            }
            println!("{}", last_printed);

            if once {
                break;
            }
        }

        if session.loop_state().is_idle() {
            session.reset();
            return Err("Camera stopped delivering frames".into());
        }

        std::thread::sleep(CLI_POLL_INTERVAL);
    }

    session.reset();
    eprintln!("Scanned {} code(s)", session.scan_count());
    Ok(())
}

/// Decode a single image file
pub fn decode_image(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(path)?;
    let detector = BarcodeDetector::with_max_dimension(config.max_dimension);

    match detector.decode(&frame, &config.symbology_set()) {
        DecodeOutcome::Success(payload) => {
            eprintln!("{}", payload.symbology);
            println!("{}", payload.text);
            Ok(())
        }
        DecodeOutcome::Failure(failure) => {
            let reason = failure
                .log_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", failure));
            Err(format!("{}: {}", path.display(), reason).into())
        }
    }
}

/// Write the configuration so it can be edited by hand
///
/// Uses `path` when given, otherwise the user config file.
pub fn write_config(
    config: &Config,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            config.save_to(path)?;
            println!("{}", path.display());
        }
        None => {
            config.save()?;
            if let Some(path) = Config::config_path() {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

/// Map a `--camera` argument to a device id
fn resolve_camera(devices: &[VideoDevice], camera: &str) -> Result<String, String> {
    if let Ok(index) = camera.parse::<usize>() {
        return devices.get(index).map(|d| d.id.clone()).ok_or_else(|| {
            format!(
                "Camera index {} out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            )
        });
    }

    devices
        .iter()
        .find(|d| d.id == camera)
        .map(|d| d.id.clone())
        .ok_or_else(|| format!("Unknown camera: {}", camera))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_camera() {
        let devices = vec![
            VideoDevice::new("/dev/video0", "Front"),
            VideoDevice::new("/dev/video2", "Back"),
        ];
        assert_eq!(resolve_camera(&devices, "1").unwrap(), "/dev/video2");
        assert_eq!(
            resolve_camera(&devices, "/dev/video0").unwrap(),
            "/dev/video0"
        );
        assert!(resolve_camera(&devices, "5").is_err());
        assert!(resolve_camera(&devices, "/dev/video9").is_err());
    }

    #[test]
    fn test_write_config_to_path() {
        let dir = std::env::temp_dir().join(format!("barcode-scanner-cli-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = Config {
            max_dimension: 320,
            ..Config::default()
        };

        write_config(&config, Some(&path)).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(dir).ok();
    }
}
