//! Configuration types for audit-scan
//!
//! Defines:
//! - `Settings` - Global application settings (.audit-scan/config.toml)
//! - Per-section settings for resolution, lookup and the scanner

use serde::{Deserialize, Serialize};
use std::time::Duration;

use audit_scan_core::{DeepLinkScheme, Symbology, DEFAULT_DEEP_LINK_HOST, DEFAULT_DEEP_LINK_SCHEME};

/// Application settings (.audit-scan/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub resolution: ResolutionSettings,

    #[serde(default)]
    pub lookup: LookupSettings,

    #[serde(default)]
    pub scanner: ScannerSettings,
}

/// Rule engine settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResolutionSettings {
    /// URI scheme of checklist deep links
    #[serde(default = "default_deep_link_scheme")]
    pub deep_link_scheme: String,

    /// URI host (resource kind) of checklist deep links
    #[serde(default = "default_deep_link_host")]
    pub deep_link_host: String,

    /// Longest payload (in bytes) the engine will try to resolve
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,

    /// Strip surrounding whitespace from payloads before matching
    #[serde(default = "default_true")]
    pub trim_payload: bool,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            deep_link_scheme: default_deep_link_scheme(),
            deep_link_host: default_deep_link_host(),
            max_payload_len: default_max_payload_len(),
            trim_payload: true,
        }
    }
}

impl ResolutionSettings {
    pub fn deep_link(&self) -> DeepLinkScheme {
        DeepLinkScheme::new(&self.deep_link_scheme, &self.deep_link_host)
    }
}

/// Checklist lookup settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LookupSettings {
    /// Lookup timeout in milliseconds; a timeout counts as "not found"
    #[serde(default = "default_lookup_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl LookupSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Camera/decoder settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScannerSettings {
    /// Symbologies to accept; empty accepts all
    #[serde(default)]
    pub allowed_symbologies: Vec<Symbology>,

    /// Ask for camera permission as soon as the scan screen mounts
    #[serde(default = "default_true")]
    pub request_permission_on_mount: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            allowed_symbologies: Vec::new(),
            request_permission_on_mount: true,
        }
    }
}

fn default_deep_link_scheme() -> String {
    DEFAULT_DEEP_LINK_SCHEME.to_string()
}

fn default_deep_link_host() -> String {
    DEFAULT_DEEP_LINK_HOST.to_string()
}

fn default_max_payload_len() -> usize {
    2048
}

fn default_lookup_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}
