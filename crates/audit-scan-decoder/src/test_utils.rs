//! Test utilities for decoder types
//!
//! Builders for camera bridge lines and raw events, plus a scripted camera
//! that feeds lines into a channel the way `spawn_line_reader` does.

use tokio::sync::mpsc;

use audit_scan_core::PermissionState;

use crate::protocol::{parse_device_line, DeviceLine, RawDecode, RawDeviceEvent};

/// `{"type":"ready"}`
pub fn ready_line() -> String {
    r#"{"type":"ready"}"#.to_string()
}

/// `{"type":"permission","state":"granted"}` and friends
pub fn permission_line(state: PermissionState) -> String {
    serde_json::json!({ "type": "permission", "state": state }).to_string()
}

/// `{"type":"mount_error","detail":...}`
pub fn mount_error_line(detail: &str) -> String {
    serde_json::json!({ "type": "mount_error", "detail": detail }).to_string()
}

/// A single QR decode line
pub fn decode_line(payload: &str) -> String {
    serde_json::json!({ "type": "decode", "data": payload, "format": "qr" }).to_string()
}

/// A decode line with an explicit device symbology name
pub fn decode_line_with_format(payload: &str, format: &str) -> String {
    serde_json::json!({ "type": "decode", "data": payload, "format": format }).to_string()
}

/// A raw QR decode event
pub fn raw_decode(payload: &str) -> RawDeviceEvent {
    RawDeviceEvent::Decode(RawDecode {
        data: Some(payload.to_string()),
        ..RawDecode::default()
    })
}

/// Scripted camera: pushes pre-built lines into a device line channel
#[derive(Debug, Clone)]
pub struct FakeCamera {
    tx: mpsc::Sender<DeviceLine>,
}

impl FakeCamera {
    pub fn new(tx: mpsc::Sender<DeviceLine>) -> Self {
        Self { tx }
    }

    /// Send one line, parsed like the real reader would. Blank lines are skipped.
    pub async fn send_line(&self, line: &str) -> bool {
        match parse_device_line(line) {
            Some(parsed) => self.tx.send(parsed).await.is_ok(),
            None => true,
        }
    }

    /// Mount sequence: permission granted, then camera ready
    pub async fn mount_granted(&self) -> bool {
        self.send_line(&permission_line(PermissionState::Granted)).await
            && self.send_line(&ready_line()).await
    }

    pub async fn decode(&self, payload: &str) -> bool {
        self.send_line(&decode_line(payload)).await
    }
}
