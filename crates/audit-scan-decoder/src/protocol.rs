//! Raw device event wire format
//!
//! Camera bridges write one JSON object per line, discriminated by `type`.
//! Decode events come in three shapes depending on the native scanner:
//!
//! ```json
//! {"type":"decode","data":"property-42","format":"qr"}
//! {"type":"decode","rawValue":"4006381333931","format":32}
//! {"type":"decode","barcodes":[{"data":"ABC123","type":"org.iso.Code128"}]}
//! ```

use serde::{Deserialize, Serialize};

use audit_scan_core::{PermissionState, ScanEvent, Symbology};

/// Symbology as reported by the device: a name or a numeric format flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawFormat {
    Code(u32),
    Name(String),
}

impl RawFormat {
    pub fn to_symbology(&self) -> Symbology {
        match self {
            RawFormat::Code(code) => Symbology::from_format_code(*code),
            RawFormat::Name(name) => Symbology::from_device_name(name),
        }
    }
}

/// One barcode within a batched decode frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBarcode {
    #[serde(alias = "rawValue", alias = "value")]
    pub data: String,
    #[serde(default, alias = "type")]
    pub format: Option<RawFormat>,
}

/// A decode frame: either a single payload or a batch of barcodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDecode {
    #[serde(default, alias = "rawValue", alias = "value")]
    pub data: Option<String>,
    #[serde(default)]
    pub format: Option<RawFormat>,
    #[serde(default)]
    pub barcodes: Vec<RawBarcode>,
}

impl RawDecode {
    /// Flatten the frame into scan events, preserving device order.
    ///
    /// A frame without a symbology is assumed to be QR, the camera bridge default.
    pub fn into_scan_events(self) -> Vec<ScanEvent> {
        let frame_symbology = self.format.as_ref().map(RawFormat::to_symbology);
        let mut events = Vec::with_capacity(self.barcodes.len() + 1);

        if let Some(data) = self.data {
            events.push(ScanEvent::new(
                data,
                frame_symbology.clone().unwrap_or(Symbology::Qr),
            ));
        }
        for barcode in self.barcodes {
            let symbology = barcode
                .format
                .as_ref()
                .map(RawFormat::to_symbology)
                .or_else(|| frame_symbology.clone())
                .unwrap_or(Symbology::Qr);
            events.push(ScanEvent::new(barcode.data, symbology));
        }
        events
    }
}

/// A lifecycle or decode event straight from the camera bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawDeviceEvent {
    Ready,
    MountError {
        #[serde(default, alias = "message")]
        detail: String,
    },
    Permission {
        state: PermissionState,
    },
    Decode(RawDecode),
}

/// One line read from a camera bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLine {
    Event(RawDeviceEvent),
    /// A non-empty line that is not a device event (left to the host)
    Other(String),
}

/// Parse a single line of camera bridge output.
///
/// Returns `None` for blank lines.
pub fn parse_device_line(line: &str) -> Option<DeviceLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<RawDeviceEvent>(trimmed) {
        Ok(event) => Some(DeviceLine::Event(event)),
        Err(_) => Some(DeviceLine::Other(trimmed.to_string())),
    }
}
