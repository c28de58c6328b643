//! Decoder adapter - permission state machine and decode gating
//!
//! The adapter turns raw camera bridge events into [`DecoderEvent`]s and
//! enforces the delivery rules the session controller relies on:
//! - decodes are delivered only while permission is `Granted`
//! - decodes are dropped (never queued) while the consuming session is locked
//! - a denied permission is not re-requested without an explicit retry
//! - mount errors surface as their own event, never as a decode

use audit_scan_core::prelude::*;
use audit_scan_core::{PermissionState, ScanEvent, Symbology};

use crate::protocol::RawDeviceEvent;

/// Normalized lifecycle and decode signals for the session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    Ready,
    MountError { detail: String },
    Permission(PermissionState),
    Scan(ScanEvent),
}

/// Why a decode was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotGranted,
    Locked,
    SymbologyNotAllowed,
}

/// Counters for decodes the adapter swallowed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropStats {
    pub not_granted: u64,
    pub locked: u64,
    pub symbology_not_allowed: u64,
}

impl DropStats {
    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::NotGranted => self.not_granted += 1,
            DropReason::Locked => self.locked += 1,
            DropReason::SymbologyNotAllowed => self.symbology_not_allowed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.not_granted + self.locked + self.symbology_not_allowed
    }
}

/// Bridges one camera mount to the uniform event stream
#[derive(Debug, Default)]
pub struct DecoderAdapter {
    permission: PermissionState,
    /// Set once `Requesting` has been entered during this mount
    requested_this_mount: bool,
    camera_ready: bool,
    locked: bool,
    /// Empty means every symbology is accepted
    allowed_symbologies: Vec<Symbology>,
    drops: DropStats,
}

impl DecoderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_symbologies(allowed: Vec<Symbology>) -> Self {
        Self {
            allowed_symbologies: allowed,
            ..Self::default()
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn is_ready(&self) -> bool {
        self.camera_ready
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn drop_stats(&self) -> DropStats {
        self.drops
    }

    /// Reset for a fresh mount (the user entered the scan screen again)
    pub fn remount(&mut self) {
        debug!("Decoder adapter remounted");
        let allowed = std::mem::take(&mut self.allowed_symbologies);
        *self = Self::with_allowed_symbologies(allowed);
    }

    /// Lock or unlock decode delivery on behalf of the consuming session
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// User retry after a mount error: the bridge remounts the camera.
    ///
    /// The camera counts as ready until the bridge reports another error.
    pub fn restart_camera(&mut self) {
        info!("Restarting camera after mount error");
        self.camera_ready = true;
    }

    /// Enter `Requesting` once per mount.
    ///
    /// Returns `None` when a request has already been made during this mount
    /// or the permission is already settled.
    pub fn request_permission(&mut self) -> Option<DecoderEvent> {
        if self.requested_this_mount || self.permission != PermissionState::Undetermined {
            debug!(
                "Permission request ignored (state: {:?}, already requested: {})",
                self.permission, self.requested_this_mount
            );
            return None;
        }
        Some(self.enter_requesting())
    }

    /// Explicit user retry: re-enter `Requesting` from `Denied` or `Undetermined`
    pub fn retry_permission(&mut self) -> Option<DecoderEvent> {
        match self.permission {
            PermissionState::Denied | PermissionState::Undetermined => {
                Some(self.enter_requesting())
            }
            PermissionState::Requesting | PermissionState::Granted => None,
        }
    }

    fn enter_requesting(&mut self) -> DecoderEvent {
        self.requested_this_mount = true;
        self.permission = PermissionState::Requesting;
        debug!("Camera permission: Requesting");
        DecoderEvent::Permission(PermissionState::Requesting)
    }

    /// Feed one raw device event, returning the events to deliver
    pub fn ingest(&mut self, raw: RawDeviceEvent) -> Vec<DecoderEvent> {
        match raw {
            RawDeviceEvent::Ready => {
                self.camera_ready = true;
                vec![DecoderEvent::Ready]
            }
            RawDeviceEvent::MountError { detail } => {
                warn!("Camera mount error: {}", detail);
                self.camera_ready = false;
                vec![DecoderEvent::MountError { detail }]
            }
            RawDeviceEvent::Permission { state } => {
                self.apply_permission(state).into_iter().collect()
            }
            RawDeviceEvent::Decode(frame) => frame
                .into_scan_events()
                .into_iter()
                .filter_map(|event| self.gate(event))
                .collect(),
        }
    }

    fn apply_permission(&mut self, reported: PermissionState) -> Option<DecoderEvent> {
        let next = match (self.permission, reported) {
            (current, reported) if current == reported => return None,
            // Only the adapter itself enters Requesting
            (_, PermissionState::Requesting) => return None,
            // Denied stays denied until an explicit retry re-enters Requesting
            (PermissionState::Denied, PermissionState::Granted) => {
                debug!("Ignoring grant while denied; explicit retry required");
                return None;
            }
            (_, reported) => reported,
        };

        debug!("Camera permission: {:?} -> {:?}", self.permission, next);
        self.permission = next;
        Some(DecoderEvent::Permission(next))
    }

    fn gate(&mut self, event: ScanEvent) -> Option<DecoderEvent> {
        let reason = if self.permission != PermissionState::Granted {
            Some(DropReason::NotGranted)
        } else if self.locked {
            Some(DropReason::Locked)
        } else if !self.allowed_symbologies.is_empty()
            && !self.allowed_symbologies.contains(&event.symbology)
        {
            Some(DropReason::SymbologyNotAllowed)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                trace!("Dropped decode ({:?}): {:?}", reason, event.symbology);
                self.drops.record(reason);
                None
            }
            None => Some(DecoderEvent::Scan(event)),
        }
    }
}
