// SPDX-License-Identifier: MPL-2.0

//! Scan session management
//!
//! A [`ScanSessionManager`] owns one decode loop at a time. It selects the
//! first enumerated device, rebinds the engine when the selection changes,
//! and keeps the most recent successfully decoded payload until reset.

mod manager;
mod state;

pub use crate::errors::ScanError;
pub use manager::{OutcomeDisposition, ScanSessionManager};
pub use state::LoopState;
