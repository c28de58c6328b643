//! Main update function - handles session state transitions (TEA pattern)

use audit_scan_core::prelude::*;
use audit_scan_core::{PermissionState, ScanEvent, SessionState};
use audit_scan_decoder::DecoderEvent;

use crate::message::{ExecutionResult, Message};
use crate::state::{ScanSession, Termination};

use super::{UpdateAction, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(session: &mut ScanSession, message: Message) -> UpdateResult {
    match message {
        Message::Teardown => handle_teardown(session),

        // ─────────────────────────────────────────────────────────
        // Resolution pipeline
        // ─────────────────────────────────────────────────────────
        Message::LookupCompleted {
            activation,
            code,
            record,
        } => {
            if !session.is_current(activation) || !session.resolution_pending {
                return discard_stale(session, activation, "lookup result");
            }
            UpdateResult::action(UpdateAction::FinishResolution {
                activation,
                code,
                record,
            })
        }

        Message::Resolved {
            activation,
            payload,
            resolution,
        } => {
            if !session.is_current(activation) || !session.resolution_pending {
                return discard_stale(session, activation, "resolution");
            }
            session.resolution_pending = false;
            UpdateResult::action(UpdateAction::Execute {
                activation,
                payload,
                resolution,
            })
        }

        Message::Executed { activation, result } => {
            if !session.is_current(activation) {
                return discard_stale(session, activation, "execution report");
            }
            match result {
                ExecutionResult::Terminated(outcome) => {
                    // The lock is kept: the session is leaving
                    session.termination = Some(Termination::Completed(outcome));
                }
                ExecutionResult::AwaitingAcknowledgement(outcome) => {
                    session.pending_ack = Some(outcome);
                }
            }
            UpdateResult::none()
        }

        Message::Decoder(DecoderEvent::Scan(event)) if session.is_finished() => {
            trace!("Session finished, dropping decode {:?}", event.payload);
            session.dropped_decodes += 1;
            UpdateResult::none()
        }

        other if session.is_finished() => {
            trace!("Session finished, ignoring {:?}", other);
            UpdateResult::none()
        }

        Message::Decoder(event) => handle_decoder_event(session, event),

        // ─────────────────────────────────────────────────────────
        // User actions
        // ─────────────────────────────────────────────────────────
        Message::RequestPermission => handle_request_permission(session),
        Message::Retry => handle_retry(session),

        Message::Acknowledge => {
            if session.awaiting_acknowledgement() {
                session.resume_scanning();
            } else {
                debug!("Acknowledge ignored in state {}", session.state);
            }
            UpdateResult::none()
        }
    }
}

fn handle_decoder_event(session: &mut ScanSession, event: DecoderEvent) -> UpdateResult {
    match event {
        DecoderEvent::Ready => {
            session.camera_ready = true;
            session.maybe_start_scanning();
            UpdateResult::none()
        }

        DecoderEvent::MountError { detail } => {
            session.camera_ready = false;
            if session.state == SessionState::Locked {
                // The accepted scan still resolves; the session enters Error once it is acknowledged
                warn!("Camera error while resolving a scan: {}", detail);
                session.error_detail = Some(detail);
            } else {
                session.state = SessionState::Error;
                session.error_detail = Some(detail);
            }
            UpdateResult::none()
        }

        DecoderEvent::Permission(permission) => {
            session.permission = permission;
            match permission {
                PermissionState::Granted => {
                    session.maybe_start_scanning();
                }
                PermissionState::Denied => {
                    if matches!(
                        session.state,
                        SessionState::AwaitingPermission | SessionState::Scanning
                    ) {
                        session.state = SessionState::PermissionDenied;
                    }
                }
                PermissionState::Requesting | PermissionState::Undetermined => {
                    if matches!(
                        session.state,
                        SessionState::PermissionDenied | SessionState::Scanning
                    ) {
                        session.state = SessionState::AwaitingPermission;
                    }
                }
            }
            UpdateResult::none()
        }

        DecoderEvent::Scan(event) => handle_scan(session, event),
    }
}

/// The idempotency gate: the first decode in `Scanning` locks the session
fn handle_scan(session: &mut ScanSession, event: ScanEvent) -> UpdateResult {
    if session.state != SessionState::Scanning {
        trace!(
            "Dropped decode in state {}: {:?}",
            session.state,
            event.payload
        );
        session.dropped_decodes += 1;
        return UpdateResult::none();
    }

    session.state = SessionState::Locked;
    session.resolution_pending = true;
    session.resolutions_started += 1;

    UpdateResult::action(UpdateAction::Resolve {
        activation: session.activation,
        event,
    })
}

fn handle_request_permission(session: &mut ScanSession) -> UpdateResult {
    let may_request = matches!(
        session.permission,
        PermissionState::Undetermined | PermissionState::Denied
    ) && session.state != SessionState::Locked;

    if may_request {
        UpdateResult::action(UpdateAction::RequestPermission)
    } else {
        debug!(
            "Permission request ignored (permission: {:?}, state: {})",
            session.permission, session.state
        );
        UpdateResult::none()
    }
}

fn handle_retry(session: &mut ScanSession) -> UpdateResult {
    if session.awaiting_acknowledgement() {
        if session.error_detail.is_none() {
            session.resume_scanning();
            return UpdateResult::none();
        }
        session.pending_ack = None;
        session.resolution_pending = false;
        return restart_after_error(session);
    }

    match session.state {
        SessionState::Error => restart_after_error(session),
        SessionState::PermissionDenied => UpdateResult::message(Message::RequestPermission),
        _ => {
            debug!("Retry ignored in state {}", session.state);
            UpdateResult::none()
        }
    }
}

/// Clear the camera error and scan again, remounting the camera
fn restart_after_error(session: &mut ScanSession) -> UpdateResult {
    debug!("Retry after camera error");
    session.error_detail = None;
    match session.permission {
        PermissionState::Granted => {
            session.camera_ready = true;
            session.enter_scanning();
            UpdateResult::action(UpdateAction::RestartCamera)
        }
        PermissionState::Denied => {
            session.state = SessionState::PermissionDenied;
            UpdateResult::none()
        }
        PermissionState::Requesting | PermissionState::Undetermined => {
            session.state = SessionState::AwaitingPermission;
            UpdateResult::none()
        }
    }
}

fn handle_teardown(session: &mut ScanSession) -> UpdateResult {
    if session.torn_down {
        return UpdateResult::none();
    }

    info!("Scan session torn down (activation {})", session.activation);
    session.torn_down = true;
    session.activation += 1;
    session.state = SessionState::AwaitingPermission;
    session.permission = PermissionState::Undetermined;
    session.camera_ready = false;
    session.resolution_pending = false;
    session.pending_ack = None;
    session.error_detail = None;
    if session.termination.is_none() {
        session.termination = Some(Termination::TornDown);
    }

    UpdateResult::action(UpdateAction::TearDown)
}

fn discard_stale(session: &mut ScanSession, activation: u64, what: &str) -> UpdateResult {
    debug!(
        "Discarding stale {} for activation {} (current {})",
        what, activation, session.activation
    );
    session.stale_discarded += 1;
    UpdateResult::none()
}
