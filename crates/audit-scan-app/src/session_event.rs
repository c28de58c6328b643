//! Domain events emitted by the session controller for external consumers
//!
//! Events are broadcast after each message processing cycle via
//! `ScanController::subscribe()`. The headless runner prints them as NDJSON.

use serde::Serialize;

use audit_scan_core::{
    ContinuationSlot, Destination, ErrorClass, NavParams, PermissionState, ResolutionOutcome,
    Rule, SessionState, Symbology, UnresolvedReason,
};

/// Domain events emitted by the scan session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    StateChanged {
        from: SessionState,
        to: SessionState,
    },

    PermissionChanged {
        state: PermissionState,
    },

    CameraReady,

    /// Camera mount/hardware failure, surfaced verbatim
    DeviceError {
        detail: String,
    },

    // ─────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────
    /// A decode passed the lock and is being resolved
    ScanAccepted {
        payload: String,
        symbology: Symbology,
    },

    LookupStarted {
        code: String,
    },

    RuleMatched {
        rule: Rule,
        outcomes: Vec<ResolutionOutcome>,
    },

    /// A lookup or resolution arrived for an activation that no longer exists
    StaleResultDiscarded,

    // ─────────────────────────────────────────────────────────
    // Execution
    // ─────────────────────────────────────────────────────────
    Navigated {
        destination: Destination,
        params: NavParams,
    },

    NavigationUnavailable,

    ContinuationInvoked {
        continuation: ContinuationSlot,
    },

    /// The continuation failed; logged and treated as a successful return
    ContinuationFailed {
        continuation: ContinuationSlot,
        message: String,
    },

    ReturnedToCaller,

    Prompted {
        message: String,
    },

    Unresolved {
        reason: UnresolvedReason,
    },

    /// Input ended while the session was blocked on a permission, device
    /// or resolution error
    EndedBlocked {
        class: ErrorClass,
        message: String,
    },

    TornDown,
}
