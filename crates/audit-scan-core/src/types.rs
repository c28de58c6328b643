//! Core domain types for scan sessions

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of an audited property (building, site)
    PropertyId
);
string_id!(
    /// Identifier of a room within a property
    RoomId
);
string_id!(
    /// Identifier of a persisted checklist
    ChecklistId
);

// ─────────────────────────────────────────────────────────────────
// Symbology
// ─────────────────────────────────────────────────────────────────

/// Optical code symbology reported by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Symbology {
    Qr,
    Pdf417,
    Ean13,
    Ean8,
    Code128,
    Code39,
    Code93,
    Codabar,
    Itf,
    UpcA,
    UpcE,
    Aztec,
    DataMatrix,
    /// A symbology name the adapter does not recognize (kept verbatim)
    Unknown(String),
}

impl Symbology {
    /// Canonical name used in config files and event output
    pub fn as_str(&self) -> &str {
        match self {
            Symbology::Qr => "QR",
            Symbology::Pdf417 => "PDF417",
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
            Symbology::Code128 => "CODE128",
            Symbology::Code39 => "CODE39",
            Symbology::Code93 => "CODE93",
            Symbology::Codabar => "CODABAR",
            Symbology::Itf => "ITF",
            Symbology::UpcA => "UPC_A",
            Symbology::UpcE => "UPC_E",
            Symbology::Aztec => "AZTEC",
            Symbology::DataMatrix => "DATA_MATRIX",
            Symbology::Unknown(name) => name,
        }
    }

    /// Normalize a device-reported symbology name.
    ///
    /// Matching ignores case and separators, and strips the `org.iso.` /
    /// `org.gs1.` / `org.ansi.` prefixes used by some platform scanners, so
    /// `QR_CODE`, `qr` and `org.iso.QRCode` all map to [`Symbology::Qr`].
    pub fn from_device_name(name: &str) -> Self {
        let folded: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let key = ["orgiso", "orggs1", "organsi"]
            .iter()
            .find_map(|prefix| folded.strip_prefix(prefix))
            .unwrap_or(&folded);

        match key {
            "qr" | "qrcode" => Symbology::Qr,
            "pdf417" => Symbology::Pdf417,
            "ean13" => Symbology::Ean13,
            "ean8" => Symbology::Ean8,
            "code128" => Symbology::Code128,
            "code39" => Symbology::Code39,
            "code93" => Symbology::Code93,
            "codabar" => Symbology::Codabar,
            "itf" | "itf14" | "interleaved2of5" => Symbology::Itf,
            "upca" => Symbology::UpcA,
            "upce" => Symbology::UpcE,
            "aztec" => Symbology::Aztec,
            "datamatrix" => Symbology::DataMatrix,
            _ => Symbology::Unknown(name.to_string()),
        }
    }

    /// Map a numeric barcode format flag (ML Kit style) to a symbology
    pub fn from_format_code(code: u32) -> Self {
        match code {
            1 => Symbology::Code128,
            2 => Symbology::Code39,
            4 => Symbology::Code93,
            8 => Symbology::Codabar,
            16 => Symbology::DataMatrix,
            32 => Symbology::Ean13,
            64 => Symbology::Ean8,
            128 => Symbology::Itf,
            256 => Symbology::Qr,
            512 => Symbology::UpcA,
            1024 => Symbology::UpcE,
            2048 => Symbology::Pdf417,
            4096 => Symbology::Aztec,
            other => Symbology::Unknown(format!("format:{other}")),
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Symbology {
    fn from(name: String) -> Self {
        Symbology::from_device_name(&name)
    }
}

impl From<Symbology> for String {
    fn from(symbology: Symbology) -> Self {
        symbology.as_str().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Scan Event
// ─────────────────────────────────────────────────────────────────

/// One physical decode, normalized by the decoder adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub payload: String,
    pub symbology: Symbology,
}

impl ScanEvent {
    pub fn new(payload: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            payload: payload.into(),
            symbology,
        }
    }

    pub fn qr(payload: impl Into<String>) -> Self {
        Self::new(payload, Symbology::Qr)
    }
}

// ─────────────────────────────────────────────────────────────────
// Interaction Mode
// ─────────────────────────────────────────────────────────────────

/// Why the scan session was opened. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionMode {
    /// Free navigation between properties, rooms and checklists
    #[default]
    Browse,
    /// Associate a new checklist with the scanned code
    CreateAssociation,
    PickProperty,
    PickRoom,
    PickItem,
}

impl InteractionMode {
    /// The continuation slot a picking mode feeds, if any
    pub fn continuation_slot(&self) -> Option<ContinuationSlot> {
        match self {
            InteractionMode::PickProperty => Some(ContinuationSlot::Property),
            InteractionMode::PickRoom => Some(ContinuationSlot::Room),
            InteractionMode::PickItem => Some(ContinuationSlot::Item),
            InteractionMode::Browse | InteractionMode::CreateAssociation => None,
        }
    }

    pub fn is_picking(&self) -> bool {
        self.continuation_slot().is_some()
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionMode::Browse => "browse",
            InteractionMode::CreateAssociation => "create-association",
            InteractionMode::PickProperty => "pick-property",
            InteractionMode::PickRoom => "pick-room",
            InteractionMode::PickItem => "pick-item",
        };
        f.write_str(name)
    }
}

/// Which caller-supplied continuation an `Invoke` outcome targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationSlot {
    Property,
    Room,
    Item,
}

impl ContinuationSlot {
    /// Name of the continuation as the scan-initiating caller knows it
    pub fn callback_name(&self) -> &'static str {
        match self {
            ContinuationSlot::Property => "onPropertyResolved",
            ContinuationSlot::Room => "onRoomResolved",
            ContinuationSlot::Item => "onItemResolved",
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Session / Permission State
// ─────────────────────────────────────────────────────────────────

/// Scan session state owned by the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for camera permission and/or the camera to become ready
    #[default]
    AwaitingPermission,
    PermissionDenied,
    /// Accepting decode events
    Scanning,
    /// A decode has been accepted; nothing else is processed
    Locked,
    /// Camera mount/hardware failure; only retry is accepted
    Error,
}

impl SessionState {
    pub fn accepts_decodes(&self) -> bool {
        matches!(self, SessionState::Scanning)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingPermission => "awaiting_permission",
            SessionState::PermissionDenied => "permission_denied",
            SessionState::Scanning => "scanning",
            SessionState::Locked => "locked",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Camera permission as tracked by the decoder adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Undetermined,
    Requesting,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_settled(&self) -> bool {
        matches!(self, PermissionState::Granted | PermissionState::Denied)
    }
}
