// SPDX-License-Identifier: GPL-3.0-only

//! Scan session manager
//!
//! Engine callbacks run on the capture thread. They only post
//! `(generation, outcome)` pairs into a channel; the manager applies them on
//! its owner's task via [`ScanSessionManager::process_pending`] or
//! [`ScanSessionManager::next_outcome`]. Each binding gets a fresh
//! generation, so outcomes still queued from a stopped binding are dropped.
//! A binding whose capture loop ends on its own is noticed on the next
//! drain and the session falls back to idle.

use super::state::LoopState;
use crate::backends::camera::{DeviceEnumerator, VideoDevice};
use crate::constants::timing::LOOP_CHECK_INTERVAL;
use crate::errors::ScanError;
use crate::frame_processor::engine::DecodeEngine;
use crate::frame_processor::render_target::RenderTarget;
use crate::frame_processor::types::{DecodeFailure, DecodeOutcome, DecodedPayload, SymbologySet};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// What the session did with one decode outcome
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeDisposition {
    /// Success; the payload is now the current result
    Stored,
    /// Classified failure, logged only
    Logged(DecodeFailure),
    /// Unclassified failure, dropped without logging
    Ignored,
    /// Outcome belonged to a binding that is no longer active
    Discarded,
}

type TaggedOutcome = (u64, DecodeOutcome);

pub struct ScanSessionManager<E: DeviceEnumerator, D: DecodeEngine> {
    enumerator: E,
    engine: D,
    formats: SymbologySet,
    render_target: RenderTarget,
    devices: Vec<VideoDevice>,
    selected_device_id: Option<String>,
    last_decoded_text: String,
    last_payload: Option<DecodedPayload>,
    state: LoopState,
    /// Generation of the running binding
    active_generation: Option<u64>,
    next_generation: u64,
    scan_count: u64,
    outcome_tx: mpsc::UnboundedSender<TaggedOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<TaggedOutcome>,
}

impl<E: DeviceEnumerator, D: DecodeEngine> ScanSessionManager<E, D> {
    pub fn new(
        enumerator: E,
        engine: D,
        formats: SymbologySet,
        render_target: RenderTarget,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            enumerator,
            engine,
            formats,
            render_target,
            devices: Vec::new(),
            selected_device_id: None,
            last_decoded_text: String::new(),
            last_payload: None,
            state: LoopState::Idle,
            active_generation: None,
            next_generation: 0,
            scan_count: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Enumerate devices once and start decoding on the first one
    ///
    /// An enumeration failure is logged and returned; the session stays idle
    /// with nothing selected and is not retried.
    pub async fn initialize(&mut self) -> Result<(), ScanError> {
        let devices = match self.enumerator.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "Failed to enumerate video devices");
                return Err(ScanError::Enumeration(e));
            }
        };

        info!(count = devices.len(), "Device list ready");
        self.devices = devices;

        let Some(first) = self.devices.first().map(|d| d.id.clone()) else {
            info!("No video devices available");
            return Ok(());
        };

        self.select_device(&first)
    }

    /// Change the selected device and rebind the decode loop to it
    ///
    /// Reselecting the device that is already being scanned does nothing.
    pub fn select_device(&mut self, device_id: &str) -> Result<(), ScanError> {
        if !self.devices.iter().any(|d| d.id == device_id) {
            warn!(device = %device_id, "Ignoring selection of unknown device");
            return Err(ScanError::UnknownDevice(device_id.to_string()));
        }

        self.reap_ended_loop();
        if self.state.device_id() == Some(device_id) {
            debug!(device = %device_id, "Device already selected");
            return Ok(());
        }

        info!(device = %device_id, "Device selected");
        self.selected_device_id = Some(device_id.to_string());
        self.start_continuous_decode(device_id)
    }

    /// Bind the engine to `device_id`, replacing any running loop
    pub fn start_continuous_decode(&mut self, device_id: &str) -> Result<(), ScanError> {
        self.stop_loop();
        self.transition(LoopState::Starting);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.outcome_tx.clone();
        let callback = Box::new(move |outcome: DecodeOutcome| {
            // Receiver lives as long as the manager
            let _ = tx.send((generation, outcome));
        });

        match self.engine.decode_continuously(
            device_id,
            &self.render_target,
            &self.formats,
            callback,
        ) {
            Ok(()) => {
                self.active_generation = Some(generation);
                self.transition(LoopState::Running(device_id.to_string()));
                Ok(())
            }
            Err(e) => {
                error!(device = %device_id, error = %e, "Failed to start decoding");
                self.transition(LoopState::Idle);
                Err(ScanError::EngineStart(e))
            }
        }
    }

    /// Stop decoding and clear the current result
    pub fn reset(&mut self) {
        self.stop_loop();
        self.last_decoded_text.clear();
        self.last_payload = None;
        info!("Reset");
    }

    /// Restart decoding on the selected device after a reset
    pub fn resume(&mut self) -> Result<(), ScanError> {
        self.reap_ended_loop();
        if self.state.is_running() {
            return Ok(());
        }
        match self.selected_device_id.clone() {
            Some(device_id) => self.start_continuous_decode(&device_id),
            None => Ok(()),
        }
    }

    /// Apply every outcome already queued by the engine
    ///
    /// Moves the session to idle if the capture loop has ended.
    pub fn process_pending(&mut self) -> Vec<OutcomeDisposition> {
        let mut applied = Vec::new();
        while let Ok((generation, outcome)) = self.outcome_rx.try_recv() {
            applied.push(self.apply_tagged(generation, outcome));
        }
        self.reap_ended_loop();
        applied
    }

    /// Wait for the next outcome from the engine and apply it
    ///
    /// Returns `None` once no loop is running and nothing is queued.
    pub async fn next_outcome(&mut self) -> Option<OutcomeDisposition> {
        loop {
            if let Ok((generation, outcome)) = self.outcome_rx.try_recv() {
                return Some(self.apply_tagged(generation, outcome));
            }
            self.reap_ended_loop();
            if self.state.is_idle() {
                return None;
            }
            match tokio::time::timeout(LOOP_CHECK_INTERVAL, self.outcome_rx.recv()).await {
                Ok(Some((generation, outcome))) => {
                    return Some(self.apply_tagged(generation, outcome));
                }
                Ok(None) => return None,
                Err(_) => continue,
            }
        }
    }

    /// Apply an outcome as if reported by the running binding
    pub fn apply_outcome(&mut self, outcome: DecodeOutcome) -> OutcomeDisposition {
        match self.active_generation {
            Some(generation) => self.apply_tagged(generation, outcome),
            None => OutcomeDisposition::Discarded,
        }
    }

    fn apply_tagged(&mut self, generation: u64, outcome: DecodeOutcome) -> OutcomeDisposition {
        if self.active_generation != Some(generation) {
            trace!(generation, "Discarding outcome from stopped binding");
            return OutcomeDisposition::Discarded;
        }

        match outcome {
            DecodeOutcome::Success(payload) => {
                info!(
                    text = %payload.text,
                    symbology = %payload.symbology,
                    "Decoded code"
                );
                self.last_decoded_text = payload.text.clone();
                self.last_payload = Some(payload);
                self.scan_count += 1;
                OutcomeDisposition::Stored
            }
            DecodeOutcome::Failure(failure) => {
                let Some(message) = failure.log_message() else {
                    return OutcomeDisposition::Ignored;
                };
                if failure == DecodeFailure::NotFound {
                    trace!("{}", message);
                } else {
                    debug!("{}", message);
                }
                OutcomeDisposition::Logged(failure)
            }
        }
    }

    /// Drop a running binding whose capture loop has already exited
    fn reap_ended_loop(&mut self) {
        if self.state.is_running() && !self.engine.is_running() {
            warn!(state = %self.state, "Decode loop ended unexpectedly");
            self.stop_loop();
        }
    }

    fn stop_loop(&mut self) {
        if self.state.is_idle() {
            return;
        }
        self.transition(LoopState::Stopping);
        self.engine.stop();
        self.active_generation = None;
        self.transition(LoopState::Idle);
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = %self.state, to = %next, "Decode loop state");
        self.state = next;
    }

    pub fn devices(&self) -> &[VideoDevice] {
        &self.devices
    }

    pub fn selected_device_id(&self) -> Option<&str> {
        self.selected_device_id.as_deref()
    }

    pub fn selected_device(&self) -> Option<&VideoDevice> {
        let id = self.selected_device_id.as_deref()?;
        self.devices.iter().find(|d| d.id == id)
    }

    /// Text of the most recent successful decode, empty if none
    pub fn last_decoded_text(&self) -> &str {
        &self.last_decoded_text
    }

    pub fn last_payload(&self) -> Option<&DecodedPayload> {
        self.last_payload.as_ref()
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.state
    }

    pub fn render_target(&self) -> &RenderTarget {
        &self.render_target
    }

    pub fn formats(&self) -> &SymbologySet {
        &self.formats
    }

    /// Successful decodes since the session was created
    pub fn scan_count(&self) -> u64 {
        self.scan_count
    }
}

impl<E: DeviceEnumerator, D: DecodeEngine> Drop for ScanSessionManager<E, D> {
    fn drop(&mut self) {
        self.stop_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{BackendError, BackendResult};
    use crate::frame_processor::engine::DecodeCallback;
    use crate::frame_processor::types::Symbology;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct FixedEnumerator(Vec<VideoDevice>);

    impl DeviceEnumerator for FixedEnumerator {
        async fn list_devices(&self) -> BackendResult<Vec<VideoDevice>> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct StubEngine {
        callback: Arc<Mutex<Option<DecodeCallback>>>,
        running: Arc<AtomicBool>,
        fail_start: bool,
    }

    impl DecodeEngine for StubEngine {
        fn decode_continuously(
            &mut self,
            device_id: &str,
            _target: &RenderTarget,
            _formats: &SymbologySet,
            callback: DecodeCallback,
        ) -> BackendResult<()> {
            if self.fail_start {
                return Err(BackendError::DeviceNotFound(device_id.to_string()));
            }
            *self.callback.lock().unwrap() = Some(callback);
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn stop(&mut self) {
            self.callback.lock().unwrap().take();
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn two_camera_session(engine: StubEngine) -> ScanSessionManager<FixedEnumerator, StubEngine> {
        ScanSessionManager::new(
            FixedEnumerator(vec![
                VideoDevice::new("cam1", "Front"),
                VideoDevice::new("cam2", "Back"),
            ]),
            engine,
            SymbologySet::default(),
            RenderTarget::new("video"),
        )
    }

    #[tokio::test]
    async fn test_stale_generation_discarded() {
        let engine = StubEngine::default();
        let callback = Arc::clone(&engine.callback);
        let mut session = two_camera_session(engine);
        session.initialize().await.unwrap();

        // Capture the cam1 callback, then switch away
        let mut old = callback.lock().unwrap().take().unwrap();
        session.select_device("cam2").unwrap();
        old(DecodeOutcome::success("stale", Symbology::QrCode));

        assert_eq!(session.process_pending(), vec![OutcomeDisposition::Discarded]);
        assert_eq!(session.last_decoded_text(), "");
    }

    #[tokio::test]
    async fn test_engine_start_failure_leaves_idle() {
        let engine = StubEngine {
            fail_start: true,
            ..StubEngine::default()
        };
        let mut session = two_camera_session(engine);
        let result = session.initialize().await;

        assert!(matches!(result, Err(ScanError::EngineStart(_))));
        assert_eq!(session.selected_device_id(), Some("cam1"));
        assert!(session.loop_state().is_idle());
    }

    #[tokio::test]
    async fn test_unclassified_is_ignored() {
        let mut session = two_camera_session(StubEngine::default());
        session.initialize().await.unwrap();
        let disposition = session.apply_outcome(DecodeOutcome::Failure(
            DecodeFailure::Unclassified("IoError".into()),
        ));
        assert_eq!(disposition, OutcomeDisposition::Ignored);
    }

    #[tokio::test]
    async fn test_logged_exactly_when_failure_has_message() {
        let mut session = two_camera_session(StubEngine::default());
        session.initialize().await.unwrap();

        for failure in [
            DecodeFailure::NotFound,
            DecodeFailure::ChecksumInvalid,
            DecodeFailure::FormatInvalid,
            DecodeFailure::Unclassified("IoError".into()),
        ] {
            let expected = match failure.log_message() {
                Some(_) => OutcomeDisposition::Logged(failure.clone()),
                None => OutcomeDisposition::Ignored,
            };
            assert_eq!(
                session.apply_outcome(DecodeOutcome::Failure(failure)),
                expected
            );
        }
    }

    #[test]
    fn test_apply_without_binding_is_discarded() {
        let mut session = two_camera_session(StubEngine::default());
        let disposition = session.apply_outcome(DecodeOutcome::success("x", Symbology::Ean13));
        assert_eq!(disposition, OutcomeDisposition::Discarded);
        assert_eq!(session.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_ended_loop_returns_to_idle() {
        let engine = StubEngine::default();
        let running = Arc::clone(&engine.running);
        let mut session = two_camera_session(engine);
        session.initialize().await.unwrap();

        running.store(false, Ordering::SeqCst);

        assert!(session.process_pending().is_empty());
        assert!(session.loop_state().is_idle());
        assert_eq!(session.selected_device_id(), Some("cam1"));

        session.select_device("cam1").unwrap();
        assert_eq!(session.loop_state().device_id(), Some("cam1"));
    }

    #[tokio::test]
    async fn test_resume_after_reset() {
        let mut session = two_camera_session(StubEngine::default());
        session.initialize().await.unwrap();
        session.reset();
        assert!(session.loop_state().is_idle());

        session.resume().unwrap();
        assert_eq!(session.loop_state().device_id(), Some("cam1"));
    }
}
