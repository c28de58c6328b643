//! Resolution outcomes produced by the rule engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{ChecklistId, ContinuationSlot, PropertyId, RoomId};

/// Screens the navigation host knows how to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    PropertyView,
    RoomView,
    ChecklistView,
    CreateChecklist,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::PropertyView => "PropertyView",
            Destination::RoomView => "RoomView",
            Destination::ChecklistView => "ChecklistView",
            Destination::CreateChecklist => "CreateChecklist",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation parameters, keyed by the names the destination screens expect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavParams(BTreeMap<String, String>);

impl NavParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn property(property_id: &PropertyId) -> Self {
        Self::new().with("propertyId", property_id.as_str())
    }

    pub fn room(property_id: &PropertyId, room_id: &RoomId) -> Self {
        Self::new()
            .with("roomId", room_id.as_str())
            .with("propertyId", property_id.as_str())
    }

    pub fn checklist(checklist_id: &ChecklistId) -> Self {
        Self::new().with("checklistId", checklist_id.as_str())
    }
}

/// Why a scan could not be resolved to anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Payload was empty (or only whitespace)
    EmptyPayload,
    /// Payload exceeded the configured maximum length
    PayloadTooLong { len: usize, max: usize },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::EmptyPayload => write!(f, "scanned code was empty"),
            UnresolvedReason::PayloadTooLong { len, max } => {
                write!(f, "scanned code is {len} bytes (max {max})")
            }
        }
    }
}

/// One primitive step the session controller executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Navigate {
        destination: Destination,
        params: NavParams,
    },
    /// Hand the value to the caller-supplied continuation in `continuation`
    Invoke {
        continuation: ContinuationSlot,
        value: String,
    },
    /// Surface the raw text for manual handling
    Prompt { message: String },
    ReturnToCaller,
    Unresolved { reason: UnresolvedReason },
}

impl ResolutionOutcome {
    pub fn navigate(destination: Destination, params: NavParams) -> Self {
        Self::Navigate {
            destination,
            params,
        }
    }

    /// Outcomes that end the scan session when executed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolutionOutcome::Navigate { .. }
                | ResolutionOutcome::Invoke { .. }
                | ResolutionOutcome::ReturnToCaller
        )
    }
}

/// The rule that produced a resolution, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Payload guards (empty / oversized) evaluated before any rule
    Guard,
    StructuredLocation,
    ModeContinuation,
    DeepLink,
    KnownBarcode,
    CreateAssociation,
    Fallback,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::Guard => "guard",
            Rule::StructuredLocation => "structured_location",
            Rule::ModeContinuation => "mode_continuation",
            Rule::DeepLink => "deep_link",
            Rule::KnownBarcode => "known_barcode",
            Rule::CreateAssociation => "create_association",
            Rule::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Result of resolving one scan: the matching rule and the ordered steps to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub rule: Rule,
    pub outcomes: Vec<ResolutionOutcome>,
}

impl Resolution {
    pub fn single(rule: Rule, outcome: ResolutionOutcome) -> Self {
        Self {
            rule,
            outcomes: vec![outcome],
        }
    }

    /// `Invoke` followed by `ReturnToCaller`
    pub fn invoke_then_return(slot: ContinuationSlot, value: impl Into<String>) -> Self {
        Self {
            rule: Rule::ModeContinuation,
            outcomes: vec![
                ResolutionOutcome::Invoke {
                    continuation: slot,
                    value: value.into(),
                },
                ResolutionOutcome::ReturnToCaller,
            ],
        }
    }

    /// The first step, which decides whether the session terminates
    pub fn primary(&self) -> Option<&ResolutionOutcome> {
        self.outcomes.first()
    }

    pub fn is_terminal(&self) -> bool {
        self.primary().is_some_and(ResolutionOutcome::is_terminal)
    }
}
