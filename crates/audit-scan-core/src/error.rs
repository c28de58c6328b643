//! Application error types with rich context

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::PermissionState;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error classes the session controller reacts to differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Camera permission denied or not yet granted
    Permission,
    /// Camera mount or hardware failure
    Device,
    /// The scanned code could not be acted on automatically
    ResolutionAmbiguity,
    /// A caller-supplied continuation failed
    CallbackFailure,
    /// Lookup service or navigation host misbehaved
    Collaborator,
    /// IO, parsing, configuration, channels
    Infrastructure,
}

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Camera/Device Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Camera permission {state:?}")]
    Permission { state: PermissionState },

    #[error("Camera error: {detail}")]
    Device { detail: String },

    #[error("Malformed device event: {message}")]
    DeviceProtocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Resolution Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Scan not recognized: {message}")]
    Unrecognized { message: String },

    #[error("Continuation {name} failed: {message}")]
    CallbackFailure { name: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Checklist lookup failed: {message}")]
    Lookup { message: String },

    #[error("Checklist lookup timed out after {timeout_ms}ms")]
    LookupTimeout { timeout_ms: u64 },

    #[error("Navigation host unavailable")]
    NavigationUnavailable,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn device(detail: impl Into<String>) -> Self {
        Self::Device {
            detail: detail.into(),
        }
    }

    pub fn device_protocol(message: impl Into<String>) -> Self {
        Self::DeviceProtocol {
            message: message.into(),
        }
    }

    pub fn unrecognized(message: impl Into<String>) -> Self {
        Self::Unrecognized {
            message: message.into(),
        }
    }

    pub fn callback_failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallbackFailure {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Which class of failure this is, from the session's point of view
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Permission { .. } => ErrorClass::Permission,
            Error::Device { .. } | Error::DeviceProtocol { .. } => ErrorClass::Device,
            Error::Unrecognized { .. } => ErrorClass::ResolutionAmbiguity,
            Error::CallbackFailure { .. } => ErrorClass::CallbackFailure,
            Error::Lookup { .. } | Error::LookupTimeout { .. } | Error::NavigationUnavailable => {
                ErrorClass::Collaborator
            }
            Error::Io(_)
            | Error::Json(_)
            | Error::Config { .. }
            | Error::ConfigNotFound { .. }
            | Error::ConfigInvalid { .. }
            | Error::ChannelSend { .. }
            | Error::ChannelClosed => ErrorClass::Infrastructure,
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Permission
                | ErrorClass::Device
                | ErrorClass::ResolutionAmbiguity
                | ErrorClass::CallbackFailure
                | ErrorClass::Collaborator
        ) || matches!(self, Error::ChannelSend { .. })
    }

    /// Check if this error should stop the process.
    ///
    /// Scan-session errors never are; only startup infrastructure can be.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConfigNotFound { .. } | Error::ChannelClosed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::device("camera busy");
        assert_eq!(err.to_string(), "Camera error: camera busy");

        let err = Error::LookupTimeout { timeout_ms: 250 };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.class(), ErrorClass::Infrastructure);
    }

    #[test]
    fn test_device_and_resolution_errors_are_distinct_classes() {
        assert_eq!(Error::device("mount failed").class(), ErrorClass::Device);
        assert_eq!(
            Error::unrecognized("unknown-code").class(),
            ErrorClass::ResolutionAmbiguity
        );
        assert_ne!(
            Error::device("x").class(),
            Error::unrecognized("x").class()
        );
    }

    #[test]
    fn test_scan_errors_are_never_fatal() {
        let errors = [
            Error::Permission {
                state: PermissionState::Denied,
            },
            Error::device("broken"),
            Error::unrecognized("?"),
            Error::callback_failure("onRoomResolved", "boom"),
            Error::lookup("unreachable"),
            Error::NavigationUnavailable,
        ];
        for err in errors {
            assert!(!err.is_fatal(), "{err} should not be fatal");
            assert!(err.is_recoverable(), "{err} should be recoverable");
        }
    }

    #[test]
    fn test_config_not_found_is_fatal() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/missing/config.toml"),
        };
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_callback_failure_display() {
        let err = Error::callback_failure("onItemResolved", "item form closed");
        assert_eq!(
            err.to_string(),
            "Continuation onItemResolved failed: item form closed"
        );
    }
}
