//! Headless mode - NDJSON scan session for scripts and E2E testing
//!
//! Device lines are read from stdin (or a file) and every session event is
//! written to stdout as one JSON object per line, each stamped with a
//! `timestamp` in milliseconds.
//!
//! # Example Output
//!
//! ```json
//! {"event":"started","mode":"pick-room","host_available":true,"timestamp":1704700001000}
//! {"event":"permission_changed","state":"granted","timestamp":1704700001010}
//! {"event":"scan_accepted","payload":"ABC123","symbology":"QR","timestamp":1704700002000}
//! {"event":"continuation_invoked","continuation":"room","timestamp":1704700002001}
//! {"event":"picked","continuation":"room","value":"ABC123","timestamp":1704700002005}
//! {"event":"session_ended","resolutions":1,"torn_down":true,"timestamp":1704700002006}
//! ```

pub mod runner;

use std::io::Write;

use chrono::Utc;
use serde::Serialize;

use audit_scan_core::prelude::*;
use audit_scan_core::{ContinuationSlot, InteractionMode, ResolutionOutcome};

/// Events the headless runner writes around the session's own events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// The session is mounted and reading device lines
    Started {
        mode: InteractionMode,
        host_available: bool,
    },

    /// The value handed to the caller's continuation
    Picked {
        continuation: ContinuationSlot,
        value: String,
    },

    SessionEnded {
        resolutions: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        outcome: Option<ResolutionOutcome>,
        torn_down: bool,
        dropped_decodes: u64,
    },

    /// Error occurred
    Error { message: String, fatal: bool },
}

impl HeadlessEvent {
    pub fn error(err: &Error) -> Self {
        Self::Error {
            message: err.to_string(),
            fatal: err.is_fatal(),
        }
    }
}

/// Write `event` as one NDJSON line with a `timestamp` field, then flush.
///
/// Write failures are logged; headless output is best effort.
pub fn write_event<W: Write, T: Serialize>(out: &mut W, event: &T) {
    let mut value = match serde_json::to_value(event) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to serialize headless event: {}", e);
            return;
        }
    };
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "timestamp".to_string(),
            Utc::now().timestamp_millis().into(),
        );
    }

    if let Err(e) = writeln!(out, "{}", value) {
        error!("Failed to write headless event: {}", e);
        return;
    }
    if let Err(e) = out.flush() {
        error!("Failed to flush headless output: {}", e);
    }
}
