//! # audit-scan-decoder - Camera/Decoder Adapter
//!
//! Bridges a physical or virtual camera to a uniform stream of
//! [`DecoderEvent`]s: lifecycle signals (`Ready`, `MountError`,
//! `Permission`) and normalized [`ScanEvent`](audit_scan_core::ScanEvent)s.
//!
//! Depends on [`audit_scan_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Wire Format
//! - [`RawDeviceEvent`] - One JSON line from a camera bridge
//! - [`parse_device_line()`] - Parse a bridge line into a [`DeviceLine`]
//!
//! ### Adapter
//! - [`DecoderAdapter`] - Permission state machine, lock gating, symbology filter
//! - [`DecoderEvent`] - Normalized events for the session controller
//!
//! ### Camera Reader
//! - [`spawn_line_reader()`] - Forward bridge lines from any async reader

pub mod adapter;
pub mod camera;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use adapter::{DecoderAdapter, DecoderEvent, DropReason, DropStats};
pub use camera::spawn_line_reader;
pub use protocol::{parse_device_line, DeviceLine, RawBarcode, RawDecode, RawDeviceEvent, RawFormat};
