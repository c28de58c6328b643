//! Navigation host
//!
//! The host performs screen transitions. The session controller fires a
//! navigation and moves on; it never waits for the transition to finish.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use audit_scan_core::{Destination, NavParams};

/// Whether the host performed the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationResult {
    Success,
    /// No navigable context (e.g. the engine runs outside a screen stack)
    Unavailable,
}

/// Screen transitions requested by the session controller
pub trait NavigationHost: Send {
    /// Whether transitions can currently be performed
    fn is_available(&self) -> bool;

    /// Open `destination` with `params`
    fn navigate(&self, destination: Destination, params: &NavParams) -> NavigationResult;

    /// Pop back to whoever opened the scan session
    fn go_back(&self) -> NavigationResult;
}

/// A transition recorded by [`RecordingNavigator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationRecord {
    Navigate {
        destination: Destination,
        params: NavParams,
    },
    Back,
}

/// Navigator that records every transition; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    records: Arc<Mutex<Vec<NavigationRecord>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the transitions performed so far
    pub fn records(&self) -> Vec<NavigationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn push(&self, record: NavigationRecord) {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
    }
}

impl NavigationHost for RecordingNavigator {
    fn is_available(&self) -> bool {
        true
    }

    fn navigate(&self, destination: Destination, params: &NavParams) -> NavigationResult {
        self.push(NavigationRecord::Navigate {
            destination,
            params: params.clone(),
        });
        NavigationResult::Success
    }

    fn go_back(&self) -> NavigationResult {
        self.push(NavigationRecord::Back);
        NavigationResult::Success
    }
}

/// Navigator for contexts with no screen stack
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableNavigator;

impl NavigationHost for UnavailableNavigator {
    fn is_available(&self) -> bool {
        false
    }

    fn navigate(&self, _destination: Destination, _params: &NavParams) -> NavigationResult {
        NavigationResult::Unavailable
    }

    fn go_back(&self) -> NavigationResult {
        NavigationResult::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_scan_core::PropertyId;

    #[test]
    fn test_recording_navigator_shares_log_across_clones() {
        let navigator = RecordingNavigator::new();
        let observer = navigator.clone();

        let params = NavParams::property(&PropertyId::new("42"));
        assert_eq!(
            navigator.navigate(Destination::PropertyView, &params),
            NavigationResult::Success
        );
        assert_eq!(navigator.go_back(), NavigationResult::Success);

        assert_eq!(
            observer.records(),
            vec![
                NavigationRecord::Navigate {
                    destination: Destination::PropertyView,
                    params,
                },
                NavigationRecord::Back,
            ]
        );
    }

    #[test]
    fn test_unavailable_navigator() {
        let navigator = UnavailableNavigator;
        assert!(!navigator.is_available());
        assert_eq!(
            navigator.navigate(Destination::RoomView, &NavParams::new()),
            NavigationResult::Unavailable
        );
        assert_eq!(navigator.go_back(), NavigationResult::Unavailable);
    }
}
