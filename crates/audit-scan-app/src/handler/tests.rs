//! Tests for handler module

use super::*;
use crate::message::ExecutionResult;
use crate::state::{ScanSession, Termination};
use audit_scan_core::{
    Destination, ErrorClass, NavParams, PermissionState, PropertyId, ResolutionOutcome, Rule, SessionState,
    UnresolvedReason,
};
use audit_scan_decoder::DecoderEvent;

fn granted(session: &mut ScanSession) {
    update(
        session,
        Message::Decoder(DecoderEvent::Permission(PermissionState::Granted)),
    );
}

fn ready(session: &mut ScanSession) {
    update(session, Message::Decoder(DecoderEvent::Ready));
}

/// A session that has reached `Scanning`
fn scanning_session() -> ScanSession {
    let mut session = ScanSession::new();
    granted(&mut session);
    ready(&mut session);
    assert_eq!(session.state, SessionState::Scanning);
    session
}

fn scan(payload: &str) -> Message {
    Message::Decoder(DecoderEvent::Scan(ScanEvent::qr(payload)))
}

fn prompt(message: &str) -> ResolutionOutcome {
    ResolutionOutcome::Prompt {
        message: message.to_string(),
    }
}

/// Lock the session on a scan and report a non-terminal outcome
fn prompted_session() -> ScanSession {
    let mut session = scanning_session();
    update(&mut session, scan("unknown-code"));
    let activation = session.activation;
    update(
        &mut session,
        Message::Executed {
            activation,
            result: ExecutionResult::AwaitingAcknowledgement(prompt("unknown-code")),
        },
    );
    session
}

// ─────────────────────────────────────────────────────────────────
// Permission / camera lifecycle
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_scanning_needs_both_grant_and_ready() {
    let mut session = ScanSession::new();
    ready(&mut session);
    assert_eq!(session.state, SessionState::AwaitingPermission);

    granted(&mut session);
    assert_eq!(session.state, SessionState::Scanning);
    assert_eq!(session.activation, 1);
}

#[test]
fn test_denied_moves_to_permission_denied() {
    let mut session = ScanSession::new();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::Permission(PermissionState::Denied)),
    );
    assert_eq!(session.state, SessionState::PermissionDenied);

    // Retry while denied becomes an explicit permission request
    let result = update(&mut session, Message::Retry);
    assert!(matches!(result.message, Some(Message::RequestPermission)));

    let result = update(&mut session, Message::RequestPermission);
    assert_eq!(result.action, Some(UpdateAction::RequestPermission));

    update(
        &mut session,
        Message::Decoder(DecoderEvent::Permission(PermissionState::Requesting)),
    );
    assert_eq!(session.state, SessionState::AwaitingPermission);
}

#[test]
fn test_request_permission_ignored_when_granted() {
    let mut session = scanning_session();
    let result = update(&mut session, Message::RequestPermission);
    assert!(result.action.is_none());
}

#[test]
fn test_mount_error_enters_error_and_retry_recovers() {
    let mut session = scanning_session();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::MountError {
            detail: "camera in use".to_string(),
        }),
    );
    assert_eq!(session.state, SessionState::Error);
    assert_eq!(session.error_detail.as_deref(), Some("camera in use"));

    // Decodes are not accepted in Error
    assert!(update(&mut session, scan("property-42")).action.is_none());

    // Retry clears the detail and scans again without waiting for the bridge
    let result = update(&mut session, Message::Retry);
    assert_eq!(result.action, Some(UpdateAction::RestartCamera));
    assert_eq!(session.error_detail, None);
    assert_eq!(session.state, SessionState::Scanning);
    assert!(session.camera_ready);
    assert_eq!(session.activation, 2);
}

#[test]
fn test_retry_after_error_while_denied_stays_denied() {
    let mut session = ScanSession::new();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::Permission(PermissionState::Denied)),
    );
    update(
        &mut session,
        Message::Decoder(DecoderEvent::MountError {
            detail: "camera in use".to_string(),
        }),
    );
    assert_eq!(session.state, SessionState::Error);

    let result = update(&mut session, Message::Retry);
    assert!(result.action.is_none());
    assert_eq!(session.state, SessionState::PermissionDenied);
}

#[test]
fn test_ready_does_not_leave_error_without_retry() {
    let mut session = scanning_session();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::MountError {
            detail: "lost".to_string(),
        }),
    );
    ready(&mut session);
    assert_eq!(session.state, SessionState::Error);
}

// ─────────────────────────────────────────────────────────────────
// Idempotency gate
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_first_scan_locks_and_resolves() {
    let mut session = scanning_session();
    let result = update(&mut session, scan("property-42"));

    assert_eq!(session.state, SessionState::Locked);
    assert_eq!(session.resolutions_started, 1);
    assert_eq!(
        result.action,
        Some(UpdateAction::Resolve {
            activation: 1,
            event: ScanEvent::qr("property-42"),
        })
    );
}

#[test]
fn test_duplicate_scan_while_locked_changes_nothing() {
    let mut session = scanning_session();
    update(&mut session, scan("property-42"));
    let snapshot = session.clone();

    let result = update(&mut session, scan("property-42"));

    assert!(result.action.is_none());
    assert!(result.message.is_none());
    assert_eq!(session.dropped_decodes, 1);
    assert_eq!(
        session,
        ScanSession {
            dropped_decodes: 1,
            ..snapshot
        }
    );
}

#[test]
fn test_scans_after_termination_are_counted() {
    let mut session = scanning_session();
    update(&mut session, scan("property-42"));
    update(
        &mut session,
        Message::Executed {
            activation: 1,
            result: ExecutionResult::Terminated(ResolutionOutcome::ReturnToCaller),
        },
    );

    let result = update(&mut session, scan("property-43"));
    assert!(result.action.is_none());
    assert_eq!(session.resolutions_started, 1);
    assert_eq!(session.dropped_decodes, 1);
}

#[test]
fn test_scans_before_scanning_are_dropped() {
    let mut session = ScanSession::new();
    let result = update(&mut session, scan("property-42"));
    assert!(result.action.is_none());
    assert_eq!(session.resolutions_started, 0);
}

// ─────────────────────────────────────────────────────────────────
// Resolution pipeline
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_lookup_then_resolution_then_execute() {
    let mut session = scanning_session();
    update(&mut session, scan("ABC123"));

    let result = update(
        &mut session,
        Message::LookupCompleted {
            activation: 1,
            code: "ABC123".to_string(),
            record: None,
        },
    );
    assert!(matches!(
        result.action,
        Some(UpdateAction::FinishResolution { activation: 1, .. })
    ));

    let resolution = Resolution::single(Rule::Fallback, ResolutionOutcome::ReturnToCaller);
    let result = update(
        &mut session,
        Message::Resolved {
            activation: 1,
            payload: "ABC123".to_string(),
            resolution: resolution.clone(),
        },
    );
    assert_eq!(
        result.action,
        Some(UpdateAction::Execute {
            activation: 1,
            payload: "ABC123".to_string(),
            resolution,
        })
    );
    assert!(!session.resolution_pending);
}

#[test]
fn test_duplicate_resolution_is_not_executed_twice() {
    let mut session = scanning_session();
    update(&mut session, scan("property-42"));

    let resolved = Message::Resolved {
        activation: 1,
        payload: "property-42".to_string(),
        resolution: Resolution::single(
            Rule::StructuredLocation,
            ResolutionOutcome::navigate(
                Destination::PropertyView,
                NavParams::property(&PropertyId::new("42")),
            ),
        ),
    };
    assert!(update(&mut session, resolved.clone()).action.is_some());
    assert!(update(&mut session, resolved).action.is_none());
    assert_eq!(session.stale_discarded, 1);
}

#[test]
fn test_terminal_execution_keeps_lock() {
    let mut session = scanning_session();
    update(&mut session, scan("property-42"));
    update(
        &mut session,
        Message::Executed {
            activation: 1,
            result: ExecutionResult::Terminated(ResolutionOutcome::ReturnToCaller),
        },
    );

    assert_eq!(session.state, SessionState::Locked);
    assert_eq!(
        session.termination,
        Some(Termination::Completed(ResolutionOutcome::ReturnToCaller))
    );

    // Nothing reopens a finished session
    update(&mut session, Message::Retry);
    update(&mut session, Message::Acknowledge);
    assert_eq!(session.state, SessionState::Locked);
}

// ─────────────────────────────────────────────────────────────────
// Acknowledgement
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_prompt_waits_for_acknowledgement() {
    let mut session = prompted_session();
    assert_eq!(session.state, SessionState::Locked);
    assert_eq!(session.pending_ack, Some(prompt("unknown-code")));

    // Late duplicates do not re-trigger resolution
    assert!(update(&mut session, scan("unknown-code")).action.is_none());

    update(&mut session, Message::Acknowledge);
    assert_eq!(session.state, SessionState::Scanning);
    assert_eq!(session.activation, 2);
    assert_eq!(session.pending_ack, None);
}

#[test]
fn test_retry_also_clears_prompt() {
    let mut session = prompted_session();
    update(&mut session, Message::Retry);
    assert_eq!(session.state, SessionState::Scanning);
}

#[test]
fn test_unresolved_waits_for_acknowledgement() {
    let mut session = scanning_session();
    update(&mut session, scan(""));
    update(
        &mut session,
        Message::Executed {
            activation: 1,
            result: ExecutionResult::AwaitingAcknowledgement(ResolutionOutcome::Unresolved {
                reason: UnresolvedReason::EmptyPayload,
            }),
        },
    );
    assert_eq!(session.state, SessionState::Locked);
    assert!(session.awaiting_acknowledgement());
}

#[test]
fn test_acknowledge_without_prompt_is_ignored() {
    let mut session = scanning_session();
    update(&mut session, Message::Acknowledge);
    assert_eq!(session.state, SessionState::Scanning);
    assert_eq!(session.activation, 1);
}

#[test]
fn test_camera_loss_while_prompted_enters_error_on_acknowledge() {
    let mut session = prompted_session();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::MountError {
            detail: "unplugged".to_string(),
        }),
    );
    // The prompt stays on screen; the detail is kept for later
    assert_eq!(session.state, SessionState::Locked);
    assert_eq!(session.error_detail.as_deref(), Some("unplugged"));

    update(&mut session, Message::Acknowledge);
    assert_eq!(session.state, SessionState::Error);
    assert_eq!(session.pending_ack, None);
    let err = session.blocking_error().expect("device error");
    assert_eq!(err.class(), ErrorClass::Device);
    assert_eq!(err.to_string(), "Camera error: unplugged");

    // Only retry leaves Error
    ready(&mut session);
    assert_eq!(session.state, SessionState::Error);
    update(&mut session, Message::Retry);
    assert_eq!(session.state, SessionState::Scanning);
}

#[test]
fn test_retry_while_prompted_clears_deferred_camera_error() {
    let mut session = prompted_session();
    update(
        &mut session,
        Message::Decoder(DecoderEvent::MountError {
            detail: "unplugged".to_string(),
        }),
    );

    let result = update(&mut session, Message::Retry);
    assert_eq!(result.action, Some(UpdateAction::RestartCamera));
    assert_eq!(session.state, SessionState::Scanning);
    assert_eq!(session.error_detail, None);
    assert_eq!(session.pending_ack, None);
}

// ─────────────────────────────────────────────────────────────────
// Teardown
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_teardown_discards_in_flight_lookup() {
    let mut session = scanning_session();
    update(&mut session, scan("ABC123"));

    let result = update(&mut session, Message::Teardown);
    assert_eq!(result.action, Some(UpdateAction::TearDown));
    assert!(session.is_torn_down());
    assert_eq!(session.termination, Some(Termination::TornDown));
    assert_ne!(session.state, SessionState::Locked);

    let result = update(
        &mut session,
        Message::LookupCompleted {
            activation: 1,
            code: "ABC123".to_string(),
            record: None,
        },
    );
    assert!(result.action.is_none());
    assert_eq!(session.stale_discarded, 1);
}

#[test]
fn test_teardown_after_completion_keeps_outcome() {
    let mut session = scanning_session();
    update(&mut session, scan("property-42"));
    update(
        &mut session,
        Message::Executed {
            activation: 1,
            result: ExecutionResult::Terminated(ResolutionOutcome::ReturnToCaller),
        },
    );

    update(&mut session, Message::Teardown);
    assert!(session.is_torn_down());
    assert!(matches!(session.termination, Some(Termination::Completed(_))));
    assert!(update(&mut session, Message::Teardown).action.is_none());
}
