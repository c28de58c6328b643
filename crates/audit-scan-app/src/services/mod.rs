//! External collaborators of the scan session
//!
//! - `lookup`: persisted-list lookup by code
//! - `navigation`: navigation host

pub mod lookup;
pub mod navigation;

pub use lookup::{
    lookup_matching, ChecklistLookup, ChecklistRecord, InMemoryLookup, LocalChecklistLookup,
    LookupResult, RegistryFile, RegistryLookup,
};
pub use navigation::{
    NavigationHost, NavigationRecord, NavigationResult, RecordingNavigator, UnavailableNavigator,
};
