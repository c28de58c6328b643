//! # audit-scan-core - Core Domain Types
//!
//! Foundation crate for the scan resolution engine. Provides domain types,
//! payload parsers, resolution outcomes, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, url, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ScanEvent`] - One normalized decode (`payload` + [`Symbology`])
//! - [`InteractionMode`] - Why the scan session was opened
//! - [`SessionState`], [`PermissionState`] - Session and camera permission states
//! - [`PropertyId`], [`RoomId`], [`ChecklistId`] - String identifiers
//!
//! ### Payload Parsers (`codes`)
//! - [`parse_location_code()`] - `property-<id>[-room-<id>]` structured codes
//! - [`DeepLinkScheme`] - App-internal checklist deep links
//!
//! ### Outcomes (`outcome`)
//! - [`ResolutionOutcome`] - Navigate / Invoke / Prompt / ReturnToCaller / Unresolved
//! - [`Resolution`] - The matching [`Rule`] plus the ordered outcome steps
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with [`ErrorClass`] classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use audit_scan_core::prelude::*;
//! ```

pub mod codes;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod prelude;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use codes::{
    parse_location_code, DeepLinkScheme, LocationCode, DEFAULT_DEEP_LINK_HOST,
    DEFAULT_DEEP_LINK_SCHEME,
};
pub use error::{Error, ErrorClass, Result, ResultExt};
pub use outcome::{Destination, NavParams, Resolution, ResolutionOutcome, Rule, UnresolvedReason};
pub use types::{
    ChecklistId, ContinuationSlot, InteractionMode, PermissionState, PropertyId, RoomId,
    ScanEvent, SessionState, Symbology,
};
