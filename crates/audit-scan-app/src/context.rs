//! Resolution context - who opened the scan session and what they want back
//!
//! The context is built once by the scan-initiating caller and handed to the
//! session controller by value. Continuations are single-use: taking one
//! removes it, so a second invocation is impossible by construction.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use audit_scan_core::prelude::*;
use audit_scan_core::{ContinuationSlot, InteractionMode, PropertyId, RoomId};

/// One-shot callback receiving a resolved identifier
pub type Continuation = Box<dyn FnOnce(String) -> Result<()> + Send>;

/// Caller-supplied continuations, at most one per slot
#[derive(Default)]
pub struct Continuations {
    on_property_resolved: Option<Continuation>,
    on_room_resolved: Option<Continuation>,
    on_item_resolved: Option<Continuation>,
}

impl Continuations {
    fn slot_mut(&mut self, slot: ContinuationSlot) -> &mut Option<Continuation> {
        match slot {
            ContinuationSlot::Property => &mut self.on_property_resolved,
            ContinuationSlot::Room => &mut self.on_room_resolved,
            ContinuationSlot::Item => &mut self.on_item_resolved,
        }
    }

    pub fn has(&self, slot: ContinuationSlot) -> bool {
        match slot {
            ContinuationSlot::Property => self.on_property_resolved.is_some(),
            ContinuationSlot::Room => self.on_room_resolved.is_some(),
            ContinuationSlot::Item => self.on_item_resolved.is_some(),
        }
    }

    pub fn set(&mut self, slot: ContinuationSlot, continuation: Continuation) {
        *self.slot_mut(slot) = Some(continuation);
    }

    /// Remove and return the continuation in `slot`
    pub fn take(&mut self, slot: ContinuationSlot) -> Option<Continuation> {
        self.slot_mut(slot).take()
    }

    /// Drop every continuation without calling it
    pub fn clear(&mut self) {
        self.on_property_resolved = None;
        self.on_room_resolved = None;
        self.on_item_resolved = None;
    }

    pub fn is_empty(&self) -> bool {
        self.on_property_resolved.is_none()
            && self.on_room_resolved.is_none()
            && self.on_item_resolved.is_none()
    }
}

impl fmt::Debug for Continuations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuations")
            .field("on_property_resolved", &self.on_property_resolved.is_some())
            .field("on_room_resolved", &self.on_room_resolved.is_some())
            .field("on_item_resolved", &self.on_item_resolved.is_some())
            .finish()
    }
}

/// Interaction context for one scan session
#[derive(Debug, Default)]
pub struct ResolutionContext {
    pub mode: InteractionMode,
    pub property_id: Option<PropertyId>,
    pub room_id: Option<RoomId>,
    continuations: Continuations,
}

impl ResolutionContext {
    pub fn new(mode: InteractionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_property(mut self, property_id: impl Into<PropertyId>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn with_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_continuation(mut self, slot: ContinuationSlot, continuation: Continuation) -> Self {
        self.continuations.set(slot, continuation);
        self
    }

    pub fn on_property_resolved<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> Result<()> + Send + 'static,
    {
        self.with_continuation(ContinuationSlot::Property, Box::new(f))
    }

    pub fn on_room_resolved<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> Result<()> + Send + 'static,
    {
        self.with_continuation(ContinuationSlot::Room, Box::new(f))
    }

    pub fn on_item_resolved<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> Result<()> + Send + 'static,
    {
        self.with_continuation(ContinuationSlot::Item, Box::new(f))
    }

    pub fn has_continuation(&self, slot: ContinuationSlot) -> bool {
        self.continuations.has(slot)
    }

    pub fn take_continuation(&mut self, slot: ContinuationSlot) -> Option<Continuation> {
        self.continuations.take(slot)
    }

    /// Release every continuation (session teardown)
    pub fn clear_continuations(&mut self) {
        self.continuations.clear();
    }

    /// The continuation slot the current mode would use, if one is installed
    pub fn active_slot(&self) -> Option<ContinuationSlot> {
        self.mode
            .continuation_slot()
            .filter(|slot| self.continuations.has(*slot))
    }
}

/// Call a continuation, converting an error or a panic into `CallbackFailure`
pub fn invoke_continuation(
    slot: ContinuationSlot,
    continuation: Continuation,
    value: String,
) -> Result<()> {
    match catch_unwind(AssertUnwindSafe(move || continuation(value))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::callback_failure(slot.callback_name(), e.to_string())),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "continuation panicked".to_string());
            Err(Error::callback_failure(slot.callback_name(), message))
        }
    }
}
