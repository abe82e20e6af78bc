// SPDX-License-Identifier: GPL-3.0-only

//! Decode loop lifecycle state

use std::fmt;

/// Lifecycle of the session's single decode loop
///
/// `Starting` and `Stopping` only exist while the manager is inside a
/// transition; a binding is never started while another is still `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoopState {
    /// No loop bound
    #[default]
    Idle,
    /// The engine is being asked to bind a device
    Starting,
    /// A loop is bound to this device id
    Running(String),
    /// The engine is releasing the current binding
    Stopping,
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LoopState::Idle)
    }

    /// Device the loop is bound to, if running
    pub fn device_id(&self) -> Option<&str> {
        match self {
            LoopState::Running(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Idle => write!(f, "Idle"),
            LoopState::Starting => write!(f, "Starting"),
            LoopState::Running(id) => write!(f, "Scanning {}", id),
            LoopState::Stopping => write!(f, "Stopping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_exposes_device() {
        let state = LoopState::Running("/dev/video0".into());
        assert!(state.is_running());
        assert_eq!(state.device_id(), Some("/dev/video0"));
        assert_eq!(state.to_string(), "Scanning /dev/video0");
    }

    #[test]
    fn test_default_is_idle() {
        let state = LoopState::default();
        assert!(state.is_idle());
        assert_eq!(state.device_id(), None);
    }
}
