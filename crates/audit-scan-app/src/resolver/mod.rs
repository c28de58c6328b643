//! Resolution rule engine
//!
//! Maps `(ScanEvent, ResolutionContext)` to a [`Resolution`] by evaluating a
//! fixed precedence of rules and returning the first match:
//!
//! 1. structured location code (`property-<id>[-room-<id>]`), any mode
//! 2. mode-scoped continuation (pick modes with a continuation installed)
//! 3. checklist deep link
//! 4. known barcode (the only rule that performs I/O)
//! 5. association creation (`CreateAssociation` mode)
//! 6. fallback: return to caller, or prompt when no navigation host exists
//!
//! Payload guards (empty, oversized) run before rule 1.
//!
//! The engine is split at the lookup so the session controller can run the
//! I/O in a cancellable task: [`Resolver::resolve_local`] evaluates rules 1-3
//! and [`Resolver::resolve_after_lookup`] evaluates rules 4-6 once the lookup
//! has answered. [`Resolver::resolve`] composes both for one-shot callers.

use std::time::Duration;

use audit_scan_core::prelude::*;
use audit_scan_core::{
    parse_location_code, DeepLinkScheme, Destination, InteractionMode, LocationCode, NavParams,
    Resolution, ResolutionOutcome, Rule, ScanEvent, UnresolvedReason,
};

use crate::config::Settings;
use crate::context::ResolutionContext;
use crate::services::{lookup_matching, ChecklistLookup, ChecklistRecord};


/// Result of the I/O-free rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalResolution {
    /// Rules 1-3 (or a guard) decided the outcome
    Resolved(Resolution),
    /// No local rule matched; look `code` up and continue with rule 4
    NeedsLookup { code: String },
}

/// The rule engine, configured from [`Settings`]
#[derive(Debug, Clone)]
pub struct Resolver {
    deep_link: DeepLinkScheme,
    max_payload_len: usize,
    trim_payload: bool,
    lookup_timeout: Duration,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Resolver {
    pub fn new(settings: &Settings) -> Self {
        Self {
            deep_link: settings.resolution.deep_link(),
            max_payload_len: settings.resolution.max_payload_len,
            trim_payload: settings.resolution.trim_payload,
            lookup_timeout: settings.lookup.timeout(),
        }
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// The payload the rules see, after trimming
    pub fn normalize<'a>(&self, payload: &'a str) -> &'a str {
        if self.trim_payload {
            payload.trim()
        } else {
            payload
        }
    }

    fn guard(&self, payload: &str) -> Option<UnresolvedReason> {
        if payload.is_empty() {
            Some(UnresolvedReason::EmptyPayload)
        } else if payload.len() > self.max_payload_len {
            Some(UnresolvedReason::PayloadTooLong {
                len: payload.len(),
                max: self.max_payload_len,
            })
        } else {
            None
        }
    }

    /// Evaluate the guards and rules 1-3
    pub fn resolve_local(&self, event: &ScanEvent, ctx: &ResolutionContext) -> LocalResolution {
        let payload = self.normalize(&event.payload);

        if let Some(reason) = self.guard(payload) {
            debug!("Scan rejected by payload guard: {}", reason);
            return LocalResolution::Resolved(Resolution::single(
                Rule::Guard,
                ResolutionOutcome::Unresolved { reason },
            ));
        }

        // Rule 1: structured codes win regardless of mode
        if let Some(location) = parse_location_code(payload) {
            let outcome = match location {
                LocationCode::Property { property_id } => ResolutionOutcome::navigate(
                    Destination::PropertyView,
                    NavParams::property(&property_id),
                ),
                LocationCode::Room {
                    property_id,
                    room_id,
                } => ResolutionOutcome::navigate(
                    Destination::RoomView,
                    NavParams::room(&property_id, &room_id),
                ),
            };
            return LocalResolution::Resolved(Resolution::single(
                Rule::StructuredLocation,
                outcome,
            ));
        }

        // Rule 2
        if let Some(slot) = ctx.active_slot() {
            return LocalResolution::Resolved(Resolution::invoke_then_return(slot, payload));
        }

        // Rule 3
        if let Some(checklist_id) = self.deep_link.parse(payload) {
            return LocalResolution::Resolved(Resolution::single(
                Rule::DeepLink,
                ResolutionOutcome::navigate(
                    Destination::ChecklistView,
                    NavParams::checklist(&checklist_id),
                ),
            ));
        }

        LocalResolution::NeedsLookup {
            code: payload.to_string(),
        }
    }

    /// Evaluate rules 4-6 given the lookup answer for `code`
    pub fn resolve_after_lookup(
        &self,
        code: &str,
        ctx: &ResolutionContext,
        record: Option<ChecklistRecord>,
        host_available: bool,
    ) -> Resolution {
        // Rule 4
        if let Some(record) = record {
            return Resolution::single(
                Rule::KnownBarcode,
                ResolutionOutcome::navigate(
                    Destination::ChecklistView,
                    NavParams::checklist(&record.id),
                ),
            );
        }

        // Rule 5
        if ctx.mode == InteractionMode::CreateAssociation {
            let mut params = NavParams::new().with("code", code);
            if let Some(property_id) = &ctx.property_id {
                params = params.with("propertyId", property_id.as_str());
            }
            if let Some(room_id) = &ctx.room_id {
                params = params.with("roomId", room_id.as_str());
            }
            return Resolution::single(
                Rule::CreateAssociation,
                ResolutionOutcome::navigate(Destination::CreateChecklist, params),
            );
        }

        // Rule 6: never silently discard a scan
        let outcome = if host_available {
            ResolutionOutcome::ReturnToCaller
        } else {
            ResolutionOutcome::Prompt {
                message: code.to_string(),
            }
        };
        Resolution::single(Rule::Fallback, outcome)
    }

    /// Run every rule, performing the lookup inline
    pub async fn resolve<L>(
        &self,
        event: &ScanEvent,
        ctx: &ResolutionContext,
        lookup: &L,
        host_available: bool,
    ) -> Resolution
    where
        L: ChecklistLookup,
    {
        let resolution = match self.resolve_local(event, ctx) {
            LocalResolution::Resolved(resolution) => resolution,
            LocalResolution::NeedsLookup { code } => {
                let record = lookup_matching(lookup, &code, self.lookup_timeout).await;
                self.resolve_after_lookup(&code, ctx, record, host_available)
            }
        };
        info!("Scan resolved by rule {}", resolution.rule);
        resolution
    }
}
