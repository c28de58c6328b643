//! Parsers for payloads that encode their target directly
//!
//! Two families are recognized:
//! - Structured location codes: `property-<id>` and `property-<id>-room-<id>`
//! - Checklist deep links: `<scheme>://<host>/<id>` (default `auditapp://checklist/<id>`)
//!
//! Everything else is an opaque lookup key.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use crate::types::{ChecklistId, PropertyId, RoomId};

/// Default URI scheme for checklist deep links
pub const DEFAULT_DEEP_LINK_SCHEME: &str = "auditapp";

/// Default URI host (resource kind) for checklist deep links
pub const DEFAULT_DEEP_LINK_HOST: &str = "checklist";

/// A location encoded directly in a scanned payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationCode {
    Property {
        property_id: PropertyId,
    },
    Room {
        property_id: PropertyId,
        room_id: RoomId,
    },
}

impl LocationCode {
    pub fn property_id(&self) -> &PropertyId {
        match self {
            LocationCode::Property { property_id } | LocationCode::Room { property_id, .. } => {
                property_id
            }
        }
    }
}

/// The property id is lazy so that the first `-room-` splits the payload.
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^property-(\S+?)(?:-room-(\S+))?$").expect("Invalid location code regex")
});

/// Parse a structured location code.
///
/// Matching is exact on the whole payload: `property-42`, `property-42-room-7`.
/// Identifiers may contain hyphens (e.g. UUIDs) but no whitespace; the first
/// `-room-` marker separates the property id from the room id.
pub fn parse_location_code(payload: &str) -> Option<LocationCode> {
    let caps = LOCATION_RE.captures(payload)?;
    let property_id = PropertyId::new(caps.get(1)?.as_str());

    Some(match caps.get(2) {
        Some(room) => LocationCode::Room {
            property_id,
            room_id: RoomId::new(room.as_str()),
        },
        None => LocationCode::Property { property_id },
    })
}

/// Recognizer for app-internal checklist deep links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkScheme {
    scheme: String,
    host: String,
}

impl Default for DeepLinkScheme {
    fn default() -> Self {
        Self::new(DEFAULT_DEEP_LINK_SCHEME, DEFAULT_DEEP_LINK_HOST)
    }
}

impl DeepLinkScheme {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            host: host.into().to_ascii_lowercase(),
        }
    }

    /// The fixed prefix every matching payload starts with
    pub fn prefix(&self) -> String {
        format!("{}://{}/", self.scheme, self.host)
    }

    /// Extract the checklist identifier from a deep link.
    ///
    /// Query strings and fragments are ignored. The identifier is the first
    /// path segment, percent-decoded. A wrong host or an empty identifier is
    /// not a match.
    pub fn parse(&self, payload: &str) -> Option<ChecklistId> {
        let url = Url::parse(payload).ok()?;
        if url.scheme() != self.scheme {
            return None;
        }
        if !url.host_str()?.eq_ignore_ascii_case(&self.host) {
            return None;
        }

        let segment = url.path_segments()?.find(|s| !s.is_empty())?;
        let id = percent_decode_str(segment).decode_utf8().ok()?;
        if id.trim().is_empty() {
            return None;
        }
        Some(ChecklistId::new(id.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_code() {
        assert_eq!(
            parse_location_code("property-42"),
            Some(LocationCode::Property {
                property_id: PropertyId::new("42")
            })
        );
    }

    #[test]
    fn test_property_room_code() {
        assert_eq!(
            parse_location_code("property-42-room-7"),
            Some(LocationCode::Room {
                property_id: PropertyId::new("42"),
                room_id: RoomId::new("7"),
            })
        );
    }

    #[test]
    fn test_hyphenated_ids() {
        let code = parse_location_code("property-a1b2-c3d4-room-r-9").unwrap();
        assert_eq!(
            code,
            LocationCode::Room {
                property_id: PropertyId::new("a1b2-c3d4"),
                room_id: RoomId::new("r-9"),
            }
        );
    }

    #[test]
    fn test_non_location_payloads() {
        assert_eq!(parse_location_code("ABC123"), None);
        assert_eq!(parse_location_code("property-"), None);
        assert_eq!(parse_location_code("xproperty-42"), None);
        assert_eq!(parse_location_code("property-42 extra"), None);
        assert_eq!(parse_location_code("Property-42"), None);
    }

    #[test]
    fn test_empty_room_suffix_is_part_of_property_id() {
        // "-room-" with nothing after it cannot split, so the whole tail is the property id
        assert_eq!(
            parse_location_code("property-42-room-"),
            Some(LocationCode::Property {
                property_id: PropertyId::new("42-room-")
            })
        );
    }

    #[test]
    fn test_deep_link_default_scheme() {
        let scheme = DeepLinkScheme::default();
        assert_eq!(scheme.prefix(), "auditapp://checklist/");
        assert_eq!(
            scheme.parse("auditapp://checklist/abc-123"),
            Some(ChecklistId::new("abc-123"))
        );
    }

    #[test]
    fn test_deep_link_ignores_query_and_decodes() {
        let scheme = DeepLinkScheme::default();
        assert_eq!(
            scheme.parse("auditapp://checklist/kitchen%20list?ref=qr#top"),
            Some(ChecklistId::new("kitchen list"))
        );
    }

    #[test]
    fn test_deep_link_rejects_other_links() {
        let scheme = DeepLinkScheme::default();
        assert_eq!(scheme.parse("auditapp://room/7"), None);
        assert_eq!(scheme.parse("https://checklist/7"), None);
        assert_eq!(scheme.parse("auditapp://checklist/"), None);
        assert_eq!(scheme.parse("not a url"), None);
    }

    #[test]
    fn test_custom_deep_link_scheme() {
        let scheme = DeepLinkScheme::new("Inventory", "List");
        assert_eq!(
            scheme.parse("inventory://list/99"),
            Some(ChecklistId::new("99"))
        );
    }
}
