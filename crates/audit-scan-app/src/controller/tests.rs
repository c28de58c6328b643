//! Tests for the scan session controller

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use super::*;
use crate::services::{
    ChecklistRecord, InMemoryLookup, LookupResult, NavigationRecord, RecordingNavigator,
    UnavailableNavigator,
};
use crate::state::Termination;
use audit_scan_core::{Destination, InteractionMode, NavParams, PropertyId};
use audit_scan_decoder::parse_device_line;
use audit_scan_decoder::test_utils::{decode_line, mount_error_line, permission_line, ready_line};

/// Lookup that blocks until the test opens the gate
#[derive(Clone, Default)]
struct GatedLookup {
    gate: Arc<Notify>,
    started: Arc<Notify>,
}

impl ChecklistLookup for GatedLookup {
    async fn lookup_by_code(&self, code: &str) -> Result<LookupResult> {
        self.started.notify_one();
        self.gate.notified().await;
        Ok(LookupResult::Found(ChecklistRecord::new("chk-1", code)))
    }
}

fn line(text: &str) -> DeviceLine {
    parse_device_line(text).expect("non-blank line")
}

fn mount_lines() -> Vec<DeviceLine> {
    vec![
        line(&permission_line(PermissionState::Granted)),
        line(&ready_line()),
    ]
}

fn new_controller<L: ChecklistLookup + Send + Sync + 'static, N: NavigationHost>(
    context: ResolutionContext,
    lookup: L,
    navigator: N,
) -> ScanController<L, N> {
    ScanController::new(&Settings::default(), context, lookup, navigator)
}

/// Feed `lines` to a fresh session and run it until the input ends
async fn run_with_lines<L, N>(controller: ScanController<L, N>, lines: Vec<DeviceLine>) -> ScanSession
where
    L: ChecklistLookup + Send + Sync + 'static,
    N: NavigationHost,
{
    let (tx, rx) = mpsc::channel(lines.len().max(1));
    for line in lines {
        tx.send(line).await.expect("channel open");
    }
    drop(tx);
    controller.run(rx).await
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn test_burst_of_duplicates_resolves_once() {
    let navigator = RecordingNavigator::new();
    let controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        navigator.clone(),
    );

    let mut lines = mount_lines();
    for _ in 0..5 {
        lines.push(line(&decode_line("property-42")));
    }
    let session = run_with_lines(controller, lines).await;

    assert_eq!(session.resolutions_started, 1);
    assert_eq!(
        navigator.records(),
        vec![NavigationRecord::Navigate {
            destination: Destination::PropertyView,
            params: NavParams::property(&PropertyId::new("42")),
        }]
    );
    assert!(matches!(
        session.termination,
        Some(Termination::Completed(ResolutionOutcome::Navigate { .. }))
    ));
}

#[tokio::test]
async fn test_batched_frame_only_first_code_resolves() {
    let navigator = RecordingNavigator::new();
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        navigator.clone(),
    );
    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }

    controller.handle_line(line(
        r#"{"type":"decode","barcodes":[{"data":"property-1"},{"data":"property-2"}]}"#,
    ));

    assert_eq!(controller.session().resolutions_started, 1);
    assert_eq!(controller.session().dropped_decodes, 1);
    assert_eq!(
        navigator.records(),
        vec![NavigationRecord::Navigate {
            destination: Destination::PropertyView,
            params: NavParams::property(&PropertyId::new("1")),
        }]
    );
}

#[tokio::test]
async fn test_continuation_called_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let context = ResolutionContext::new(InteractionMode::PickRoom).on_room_resolved(move |value| {
        assert_eq!(value, "ABC123");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let navigator = RecordingNavigator::new();
    let controller = new_controller(context, InMemoryLookup::new(), navigator.clone());
    let mut events = controller.subscribe();

    let mut lines = mount_lines();
    lines.push(line(&decode_line("ABC123")));
    lines.push(line(&decode_line("ABC123")));
    let session = run_with_lines(controller, lines).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(navigator.records(), vec![NavigationRecord::Back]);
    assert_eq!(
        session.termination,
        Some(Termination::Completed(ResolutionOutcome::ReturnToCaller))
    );

    let events = drain(&mut events);
    assert!(events.contains(&SessionEvent::ContinuationInvoked {
        continuation: ContinuationSlot::Room
    }));
    assert!(events.contains(&SessionEvent::ReturnedToCaller));
}

#[tokio::test]
async fn test_failing_continuation_still_returns_to_caller() {
    let context = ResolutionContext::new(InteractionMode::PickItem)
        .on_item_resolved(|_| Err(Error::lookup("caller state gone")));

    let navigator = RecordingNavigator::new();
    let controller = new_controller(context, InMemoryLookup::new(), navigator.clone());
    let mut events = controller.subscribe();

    let mut lines = mount_lines();
    lines.push(line(&decode_line("ITEM-9")));
    let session = run_with_lines(controller, lines).await;

    assert_eq!(navigator.records(), vec![NavigationRecord::Back]);
    assert!(matches!(session.termination, Some(Termination::Completed(_))));
    assert!(drain(&mut events)
        .iter()
        .any(|event| matches!(event, SessionEvent::ContinuationFailed { .. })));
}

#[tokio::test]
async fn test_unknown_code_without_host_prompts_and_waits() {
    let controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        UnavailableNavigator,
    );
    let mut events = controller.subscribe();

    let mut lines = mount_lines();
    lines.push(line(&decode_line("unknown-code")));
    lines.push(line(&decode_line("unknown-code")));
    let session = run_with_lines(controller, lines).await;

    assert_eq!(session.resolutions_started, 1);
    // Input ended while the prompt was shown; the session was torn down
    assert!(session.is_torn_down());
    assert_eq!(session.termination, Some(Termination::TornDown));

    let events = drain(&mut events);
    assert!(events.contains(&SessionEvent::LookupStarted {
        code: "unknown-code".to_string()
    }));
    assert!(events.contains(&SessionEvent::Prompted {
        message: "unknown-code".to_string()
    }));
    assert!(events.contains(&SessionEvent::EndedBlocked {
        class: ErrorClass::ResolutionAmbiguity,
        message: "Scan not recognized: unknown-code".to_string(),
    }));
}

#[tokio::test]
async fn test_navigation_unavailable_falls_back_to_prompt() {
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        UnavailableNavigator,
    );
    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }
    controller.handle_line(line(&decode_line("property-42")));

    let session = controller.session();
    assert_eq!(session.state, SessionState::Locked);
    assert_eq!(
        session.pending_ack,
        Some(ResolutionOutcome::Prompt {
            message: "property-42".to_string()
        })
    );
}

#[tokio::test]
async fn test_acknowledge_then_scan_again() {
    let navigator = RecordingNavigator::new();
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        navigator.clone(),
    );
    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }

    // An empty payload is unresolved and waits for acknowledgement
    controller.handle_line(line(&decode_line("   ")));
    assert!(controller.session().awaiting_acknowledgement());
    controller.handle_line(line(&decode_line("property-7")));
    assert!(navigator.records().is_empty());

    controller.handle_line(line(r#"{"type":"acknowledge"}"#));
    assert_eq!(controller.session().state, SessionState::Scanning);

    controller.handle_line(line(&decode_line("property-7")));
    assert_eq!(navigator.records().len(), 1);
    assert_eq!(controller.session().resolutions_started, 2);
}

#[tokio::test]
async fn test_known_barcode_via_lookup_task() {
    let navigator = RecordingNavigator::new();
    let lookup = InMemoryLookup::new().with_record(ChecklistRecord::new("chk-5", "4006381333931"));
    let controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        lookup,
        navigator.clone(),
    );

    let mut lines = mount_lines();
    lines.push(line(&decode_line("4006381333931")));
    let session = run_with_lines(controller, lines).await;

    assert_eq!(
        navigator.records(),
        vec![NavigationRecord::Navigate {
            destination: Destination::ChecklistView,
            params: NavParams::new().with("checklistId", "chk-5"),
        }]
    );
    assert!(matches!(session.termination, Some(Termination::Completed(_))));
}

#[tokio::test]
async fn test_teardown_during_lookup_discards_result() {
    let lookup = GatedLookup::default();
    let navigator = RecordingNavigator::new();
    let controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        lookup.clone(),
        navigator.clone(),
    );
    let mut events = controller.subscribe();

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(controller.run(rx));

    for mount in mount_lines() {
        tx.send(mount).await.unwrap();
    }
    tx.send(line(&decode_line("ABC123"))).await.unwrap();

    // Wait until the lookup is actually in flight
    lookup.started.notified().await;
    tx.send(line(r#"{"type":"teardown"}"#)).await.unwrap();

    let session = handle.await.unwrap();
    lookup.gate.notify_one();
    tokio::task::yield_now().await;

    assert!(session.is_torn_down());
    assert_eq!(session.termination, Some(Termination::TornDown));
    assert!(navigator.records().is_empty());

    let events = drain(&mut events);
    assert!(events.contains(&SessionEvent::TornDown));
    assert!(!events
        .iter()
        .any(|event| matches!(event, SessionEvent::Navigated { .. })));
}

#[tokio::test]
async fn test_late_lookup_result_after_teardown_is_stale() {
    let navigator = RecordingNavigator::new();
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        GatedLookup::default(),
        navigator.clone(),
    );
    let mut events = controller.subscribe();

    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }
    controller.handle_line(line(&decode_line("ABC123")));
    let activation = controller.session().activation;

    controller.process_message(Message::Teardown);

    // A fresh session on the same controller does not accept the old result
    controller.start_session(ResolutionContext::new(InteractionMode::Browse));
    for mount in mount_lines() {
        controller.handle_line(mount);
    }
    controller.process_message(Message::LookupCompleted {
        activation,
        code: "ABC123".to_string(),
        record: Some(ChecklistRecord::new("chk-1", "ABC123")),
    });

    assert!(navigator.records().is_empty());
    assert_eq!(controller.session().state, SessionState::Scanning);
    assert_eq!(controller.session().stale_discarded, 1);
    assert!(drain(&mut events).contains(&SessionEvent::StaleResultDiscarded));
}

#[tokio::test]
async fn test_mount_error_surfaces_device_error() {
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        RecordingNavigator::new(),
    );
    let mut events = controller.subscribe();

    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }
    controller.handle_line(line(&mount_error_line("camera in use")));
    assert_eq!(controller.session().state, SessionState::Error);

    let events = drain(&mut events);
    assert!(events.contains(&SessionEvent::DeviceError {
        detail: "camera in use".to_string()
    }));
    assert!(events.contains(&SessionEvent::StateChanged {
        from: SessionState::Scanning,
        to: SessionState::Error,
    }));

    controller.handle_line(line(r#"{"type":"retry"}"#));
    assert_eq!(controller.session().state, SessionState::Scanning);
    assert!(controller.adapter().is_ready());
    assert_eq!(controller.session().error_detail, None);

    controller.handle_line(line(&decode_line("property-42")));
    assert_eq!(controller.session().resolutions_started, 1);
}

#[tokio::test]
async fn test_camera_loss_behind_prompt_surfaces_after_acknowledge() {
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        UnavailableNavigator,
    );
    let mut events = controller.subscribe();

    controller.mount();
    for mount in mount_lines() {
        controller.handle_line(mount);
    }
    controller.handle_line(line(&decode_line("property-42")));
    assert!(controller.session().awaiting_acknowledgement());

    controller.handle_line(line(&mount_error_line("camera unplugged")));
    controller.handle_line(line(r#"{"type":"acknowledge"}"#));

    assert_eq!(controller.session().state, SessionState::Error);
    assert_eq!(
        controller.session().error_detail.as_deref(),
        Some("camera unplugged")
    );
    assert_eq!(
        controller.session().blocking_error().map(|e| e.class()),
        Some(ErrorClass::Device)
    );

    let events = drain(&mut events);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, SessionEvent::DeviceError { .. }))
            .count(),
        1
    );
    assert!(events.contains(&SessionEvent::StateChanged {
        from: SessionState::Locked,
        to: SessionState::Error,
    }));
}

#[tokio::test]
async fn test_denied_permission_needs_explicit_request() {
    let mut controller = new_controller(
        ResolutionContext::new(InteractionMode::Browse),
        InMemoryLookup::new(),
        RecordingNavigator::new(),
    );
    controller.mount();
    assert_eq!(controller.adapter().permission(), PermissionState::Requesting);

    controller.handle_line(line(&permission_line(PermissionState::Denied)));
    controller.handle_line(line(&ready_line()));
    assert_eq!(controller.session().state, SessionState::PermissionDenied);

    // A late grant without a re-request is ignored
    controller.handle_line(line(&permission_line(PermissionState::Granted)));
    assert_eq!(controller.session().state, SessionState::PermissionDenied);

    controller.handle_line(line(r#"{"type":"request_permission"}"#));
    assert_eq!(controller.session().permission, PermissionState::Requesting);
    controller.handle_line(line(&permission_line(PermissionState::Granted)));
    assert_eq!(controller.session().state, SessionState::Scanning);
}
