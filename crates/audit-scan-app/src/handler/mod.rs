//! Handler module - TEA update function for the scan session
//!
//! - `update`: main `update()` function and message dispatch

pub(crate) mod update;

#[cfg(test)]
mod tests;

use audit_scan_core::{Resolution, ScanEvent};

use crate::message::Message;
use crate::services::ChecklistRecord;

pub use update::update;

/// Actions that the controller should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Re-enter the permission request on the decoder adapter
    RequestPermission,

    /// Remount the camera after a retried device error
    RestartCamera,

    /// Run the I/O-free rules for the accepted scan, spawning a lookup if
    /// they do not decide
    Resolve { activation: u64, event: ScanEvent },

    /// Run the rules after the lookup for `code` answered
    FinishResolution {
        activation: u64,
        code: String,
        record: Option<ChecklistRecord>,
    },

    /// Execute the outcome steps of `resolution`
    Execute {
        activation: u64,
        /// Normalized payload, surfaced if navigation turns out to be unavailable
        payload: String,
        resolution: Resolution,
    },

    /// Cancel in-flight work and release continuations
    TearDown,
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the controller to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
