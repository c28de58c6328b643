//! Scan session state (the Model)

use audit_scan_core::{Error, PermissionState, ResolutionOutcome, SessionState};

/// How the terminating outcome of a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A terminal outcome executed; the session is leaving
    Completed(ResolutionOutcome),
    /// The scan screen was left before any terminal outcome
    TornDown,
}

/// State of one scan session, mutated only by `handler::update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSession {
    pub state: SessionState,
    pub permission: PermissionState,
    pub camera_ready: bool,

    /// Bumped on every entry into `Scanning` and on teardown. Asynchronous
    /// results tagged with an older activation are discarded.
    pub activation: u64,

    /// A decode has been accepted and its resolution has not arrived yet
    pub resolution_pending: bool,

    /// Verbatim device error; set while `Locked` it is deferred until the lock is released
    pub error_detail: Option<String>,

    /// Non-terminal outcome waiting for an explicit acknowledgement
    pub pending_ack: Option<ResolutionOutcome>,

    pub termination: Option<Termination>,

    /// The session has been torn down; its lock and continuations are released
    pub torn_down: bool,

    /// Number of resolutions started across all activations
    pub resolutions_started: u32,

    /// Number of late lookup/resolution results thrown away
    pub stale_discarded: u32,

    /// Decodes dropped by the adapter (added at teardown) or by the lock itself
    pub dropped_decodes: u64,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Scanning` once permission is granted and the camera is ready
    pub(crate) fn maybe_start_scanning(&mut self) -> bool {
        if self.state == SessionState::AwaitingPermission
            && self.permission == PermissionState::Granted
            && self.camera_ready
        {
            self.enter_scanning();
            true
        } else {
            false
        }
    }

    /// Leave an acknowledged prompt: scan again if the camera is still usable.
    ///
    /// A camera error that arrived while locked takes over here.
    pub(crate) fn resume_scanning(&mut self) {
        self.pending_ack = None;
        self.resolution_pending = false;
        if self.error_detail.is_some() {
            self.state = SessionState::Error;
        } else if self.permission == PermissionState::Granted && self.camera_ready {
            self.enter_scanning();
        } else {
            self.state = SessionState::AwaitingPermission;
        }
    }

    pub(crate) fn enter_scanning(&mut self) {
        self.state = SessionState::Scanning;
        self.activation += 1;
        self.resolution_pending = false;
        self.pending_ack = None;
        self.error_detail = None;
    }

    /// Whether `activation` still refers to the live resolution
    pub fn is_current(&self, activation: u64) -> bool {
        activation == self.activation
            && self.state == SessionState::Locked
            && self.termination.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn awaiting_acknowledgement(&self) -> bool {
        self.pending_ack.is_some()
    }

    /// The error keeping the session from scanning, if it is stuck on one
    pub fn blocking_error(&self) -> Option<Error> {
        if let Some(outcome) = &self.pending_ack {
            let message = match outcome {
                ResolutionOutcome::Prompt { message } => message.clone(),
                ResolutionOutcome::Unresolved { reason } => reason.to_string(),
                other => format!("{other:?}"),
            };
            return Some(Error::unrecognized(message));
        }

        match self.state {
            SessionState::PermissionDenied => Some(Error::Permission {
                state: self.permission,
            }),
            SessionState::Error => Some(Error::device(
                self.error_detail.clone().unwrap_or_default(),
            )),
            _ => None,
        }
    }
}
