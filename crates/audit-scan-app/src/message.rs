//! Message types for the scan session (TEA pattern)

use serde::Deserialize;

use audit_scan_core::{Resolution, ResolutionOutcome};
use audit_scan_decoder::DecoderEvent;

use crate::services::ChecklistRecord;

/// How executing a resolution left the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// A terminal outcome ran; the session is leaving
    Terminated(ResolutionOutcome),
    /// A `Prompt`/`Unresolved` outcome is shown until acknowledged
    AwaitingAcknowledgement(ResolutionOutcome),
}

/// All messages that can be processed by the session
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Device
    // ─────────────────────────────────────────────────────────
    /// Normalized event from the decoder adapter
    Decoder(DecoderEvent),

    // ─────────────────────────────────────────────────────────
    // Resolution pipeline
    // ─────────────────────────────────────────────────────────
    /// The lookup task for `activation` answered
    LookupCompleted {
        activation: u64,
        code: String,
        record: Option<ChecklistRecord>,
    },

    /// The rule engine produced a resolution for `activation`
    Resolved {
        activation: u64,
        payload: String,
        resolution: Resolution,
    },

    /// The outcome for `activation` has been executed
    Executed {
        activation: u64,
        result: ExecutionResult,
    },

    // ─────────────────────────────────────────────────────────
    // User actions
    // ─────────────────────────────────────────────────────────
    /// Explicit camera permission re-request
    RequestPermission,

    /// Clear a device error or a prompt and scan again
    Retry,

    /// Dismiss a prompt ("scan another")
    Acknowledge,

    /// The user left the scan screen
    Teardown,
}

/// Control line accepted on the headless input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlLine {
    Retry,
    Acknowledge,
    RequestPermission,
    Teardown,
}

impl Message {
    /// Parse a `{"type":"retry"}`-style control line
    pub fn from_control_line(line: &str) -> Option<Message> {
        let control: ControlLine = serde_json::from_str(line.trim()).ok()?;
        Some(match control {
            ControlLine::Retry => Message::Retry,
            ControlLine::Acknowledge => Message::Acknowledge,
            ControlLine::RequestPermission => Message::RequestPermission,
            ControlLine::Teardown => Message::Teardown,
        })
    }
}
