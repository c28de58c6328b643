//! Scan session controller - owns one scan session end to end
//!
//! The controller wires the decoder adapter, the TEA `update` function, the
//! rule engine and the external collaborators together:
//!
//! - device lines are normalized by the [`DecoderAdapter`] and fed to
//!   `handler::update` as messages
//! - `UpdateAction`s are executed here: local rule evaluation, spawning the
//!   cancellable lookup task, outcome execution, teardown
//! - [`SessionEvent`]s are broadcast after every processing cycle

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use audit_scan_core::prelude::*;
use audit_scan_core::{
    ContinuationSlot, PermissionState, Resolution, ResolutionOutcome, SessionState,
};
use audit_scan_decoder::{DecoderAdapter, DeviceLine};

use crate::config::Settings;
use crate::context::{invoke_continuation, ResolutionContext};
use crate::handler::{self, UpdateAction};
use crate::message::{ExecutionResult, Message};
use crate::resolver::{LocalResolution, Resolver};
use crate::services::{lookup_matching, ChecklistLookup, NavigationHost, NavigationResult};
use crate::session_event::SessionEvent;
use crate::state::ScanSession;

/// Snapshot of the fields observers care about, for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionSnapshot {
    state: SessionState,
    permission: PermissionState,
    camera_ready: bool,
    error_detail: Option<String>,
    stale_discarded: u32,
    torn_down: bool,
}

impl SessionSnapshot {
    fn capture(session: &ScanSession) -> Self {
        Self {
            state: session.state,
            permission: session.permission,
            camera_ready: session.camera_ready,
            error_detail: session.error_detail.clone(),
            stale_discarded: session.stale_discarded,
            torn_down: session.torn_down,
        }
    }
}

/// Drives one scan session against a lookup service and a navigation host
pub struct ScanController<L, N> {
    session: ScanSession,
    context: ResolutionContext,
    adapter: DecoderAdapter,
    resolver: Resolver,
    lookup: Arc<L>,
    navigator: N,
    request_permission_on_mount: bool,

    /// Internal channel for results of background tasks
    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,

    /// Event broadcaster for external consumers
    event_tx: broadcast::Sender<SessionEvent>,

    /// The in-flight lookup and the activation it belongs to
    lookup_task: Option<(u64, JoinHandle<()>)>,
}

impl<L, N> ScanController<L, N>
where
    L: ChecklistLookup + Send + Sync + 'static,
    N: NavigationHost,
{
    pub fn new(settings: &Settings, context: ResolutionContext, lookup: L, navigator: N) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(256);

        Self {
            session: ScanSession::new(),
            context,
            adapter: DecoderAdapter::with_allowed_symbologies(
                settings.scanner.allowed_symbologies.clone(),
            ),
            resolver: Resolver::new(settings),
            lookup: Arc::new(lookup),
            navigator,
            request_permission_on_mount: settings.scanner.request_permission_on_mount,
            msg_tx,
            msg_rx,
            event_tx,
            lookup_task: None,
        }
    }

    /// Subscribe to session events.
    ///
    /// Subscribers that fall behind lose the oldest events
    /// (`broadcast::error::RecvError::Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn adapter(&self) -> &DecoderAdapter {
        &self.adapter
    }

    /// The scan screen appeared: request camera permission if configured
    pub fn mount(&mut self) {
        info!("Scan session mounted (mode: {})", self.context.mode);
        if self.request_permission_on_mount {
            if let Some(event) = self.adapter.request_permission() {
                self.process_message(Message::Decoder(event));
            }
        }
    }

    /// Start a fresh session on this controller after a teardown.
    ///
    /// The activation counter keeps counting so results addressed to the
    /// previous session stay stale.
    pub fn start_session(&mut self, context: ResolutionContext) {
        let activation = self.session.activation;
        self.session = ScanSession {
            activation,
            ..ScanSession::new()
        };
        self.context = context;
        self.adapter.remount();
        self.mount();
    }

    /// Feed one line from the camera bridge or the control stream
    pub fn handle_line(&mut self, line: DeviceLine) {
        match line {
            DeviceLine::Event(raw) => {
                for event in self.adapter.ingest(raw) {
                    self.process_message(Message::Decoder(event));
                }
            }
            DeviceLine::Other(text) => match Message::from_control_line(&text) {
                Some(message) => self.process_message(message),
                None => warn!(
                    "Ignoring input line: {}",
                    Error::device_protocol(format!("unrecognized line {text:?}"))
                ),
            },
        }
    }

    /// Process a message and everything it triggers.
    ///
    /// Follow-up messages are queued rather than recursed into. Events are
    /// emitted after each update based on before/after snapshots.
    pub fn process_message(&mut self, message: Message) {
        let mut queue = VecDeque::from([message]);

        while let Some(message) = queue.pop_front() {
            if let Message::LookupCompleted { activation, .. } = &message {
                self.finish_lookup_task(*activation);
            }

            let pre = SessionSnapshot::capture(&self.session);
            let result = handler::update(&mut self.session, message);
            self.adapter.set_locked(!self.session.state.accepts_decodes());
            let post = SessionSnapshot::capture(&self.session);
            self.emit_changes(&pre, &post);

            if let Some(follow_up) = result.message {
                queue.push_back(follow_up);
            }
            if let Some(action) = result.action {
                if let Some(follow_up) = self.handle_action(action) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Run the session until it terminates, is torn down, or the input ends.
    ///
    /// Input EOF while a lookup is in flight waits for that lookup. The session
    /// is always torn down before returning.
    pub async fn run(mut self, mut lines: mpsc::Receiver<DeviceLine>) -> ScanSession {
        self.mount();
        let mut input_open = true;

        while !self.session.is_finished() {
            if !input_open && self.lookup_task.is_none() {
                break;
            }

            tokio::select! {
                Some(message) = self.msg_rx.recv() => self.process_message(message),
                line = lines.recv(), if input_open => match line {
                    Some(line) => self.handle_line(line),
                    None => {
                        debug!("Device input closed");
                        input_open = false;
                    }
                },
            }
        }

        if let Some(err) = self.session.blocking_error() {
            info!("Session ended while blocked: {}", err);
            self.emit(SessionEvent::EndedBlocked {
                class: err.class(),
                message: err.to_string(),
            });
        }
        if !self.session.is_torn_down() {
            self.process_message(Message::Teardown);
        }
        self.session
    }

    // ─────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────

    fn handle_action(&mut self, action: UpdateAction) -> Option<Message> {
        match action {
            UpdateAction::RequestPermission => self.adapter.retry_permission().map(Message::Decoder),

            UpdateAction::RestartCamera => {
                self.adapter.restart_camera();
                None
            }

            UpdateAction::Resolve { activation, event } => {
                self.emit(SessionEvent::ScanAccepted {
                    payload: event.payload.clone(),
                    symbology: event.symbology.clone(),
                });

                match self.resolver.resolve_local(&event, &self.context) {
                    LocalResolution::Resolved(resolution) => Some(Message::Resolved {
                        activation,
                        payload: self.resolver.normalize(&event.payload).to_string(),
                        resolution,
                    }),
                    LocalResolution::NeedsLookup { code } => {
                        self.spawn_lookup(activation, code);
                        None
                    }
                }
            }

            UpdateAction::FinishResolution {
                activation,
                code,
                record,
            } => {
                let resolution = self.resolver.resolve_after_lookup(
                    &code,
                    &self.context,
                    record,
                    self.navigator.is_available(),
                );
                Some(Message::Resolved {
                    activation,
                    payload: code,
                    resolution,
                })
            }

            UpdateAction::Execute {
                activation,
                payload,
                resolution,
            } => {
                let result = self.execute(&payload, resolution);
                Some(Message::Executed { activation, result })
            }

            UpdateAction::TearDown => {
                self.tear_down();
                None
            }
        }
    }

    fn spawn_lookup(&mut self, activation: u64, code: String) {
        self.emit(SessionEvent::LookupStarted { code: code.clone() });

        let lookup = Arc::clone(&self.lookup);
        let msg_tx = self.msg_tx.clone();
        let timeout = self.resolver.lookup_timeout();

        let handle = tokio::spawn(async move {
            let record = lookup_matching(lookup.as_ref(), &code, timeout).await;
            let completed = Message::LookupCompleted {
                activation,
                code,
                record,
            };
            if msg_tx.send(completed).await.is_err() {
                debug!("Session closed before lookup completed");
            }
        });

        self.lookup_task = Some((activation, handle));
    }

    fn finish_lookup_task(&mut self, activation: u64) {
        if matches!(self.lookup_task, Some((current, _)) if current == activation) {
            self.lookup_task = None;
        }
    }

    /// Run the outcome steps in order; the first terminal or blocking step ends execution
    fn execute(&mut self, payload: &str, resolution: Resolution) -> ExecutionResult {
        info!(
            "Rule {} matched ({} step(s))",
            resolution.rule,
            resolution.outcomes.len()
        );
        self.emit(SessionEvent::RuleMatched {
            rule: resolution.rule,
            outcomes: resolution.outcomes.clone(),
        });

        let mut invoked: Option<ResolutionOutcome> = None;

        for outcome in resolution.outcomes {
            match &outcome {
                ResolutionOutcome::Navigate {
                    destination,
                    params,
                } => match self.navigator.navigate(*destination, params) {
                    NavigationResult::Success => {
                        info!("Navigated to {}", destination);
                        self.emit(SessionEvent::Navigated {
                            destination: *destination,
                            params: params.clone(),
                        });
                        return ExecutionResult::Terminated(outcome);
                    }
                    NavigationResult::Unavailable => return self.navigation_unavailable(payload),
                },

                ResolutionOutcome::Invoke {
                    continuation,
                    value,
                } => {
                    self.invoke(*continuation, value.clone());
                    invoked = Some(outcome.clone());
                }

                ResolutionOutcome::ReturnToCaller => match self.navigator.go_back() {
                    NavigationResult::Success => {
                        self.emit(SessionEvent::ReturnedToCaller);
                        return ExecutionResult::Terminated(outcome);
                    }
                    NavigationResult::Unavailable => match invoked {
                        // The caller already has its value; nothing left to surface
                        Some(invoke) => {
                            warn!("Navigation host unavailable after continuation");
                            self.emit(SessionEvent::NavigationUnavailable);
                            return ExecutionResult::Terminated(invoke);
                        }
                        None => return self.navigation_unavailable(payload),
                    },
                },

                ResolutionOutcome::Prompt { message } => {
                    info!("Prompting with scanned text");
                    self.emit(SessionEvent::Prompted {
                        message: message.clone(),
                    });
                    return ExecutionResult::AwaitingAcknowledgement(outcome);
                }

                ResolutionOutcome::Unresolved { reason } => {
                    info!("Scan unresolved: {}", reason);
                    self.emit(SessionEvent::Unresolved {
                        reason: reason.clone(),
                    });
                    return ExecutionResult::AwaitingAcknowledgement(outcome);
                }
            }
        }

        match invoked {
            Some(invoke) => ExecutionResult::Terminated(invoke),
            None => self.navigation_unavailable(payload),
        }
    }

    /// Call the continuation in `slot` at most once. Failures are logged only.
    fn invoke(&mut self, slot: ContinuationSlot, value: String) {
        let Some(continuation) = self.context.take_continuation(slot) else {
            warn!("{} already consumed, skipping", slot.callback_name());
            return;
        };

        match invoke_continuation(slot, continuation, value) {
            Ok(()) => {
                debug!("{} invoked", slot.callback_name());
                self.emit(SessionEvent::ContinuationInvoked { continuation: slot });
            }
            Err(e) => {
                warn!("{}", e);
                self.emit(SessionEvent::ContinuationFailed {
                    continuation: slot,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Surface the scanned text when no transition can be performed
    fn navigation_unavailable(&mut self, payload: &str) -> ExecutionResult {
        warn!("{}; prompting with scanned text", Error::NavigationUnavailable);
        self.emit(SessionEvent::NavigationUnavailable);
        self.emit(SessionEvent::Prompted {
            message: payload.to_string(),
        });
        ExecutionResult::AwaitingAcknowledgement(ResolutionOutcome::Prompt {
            message: payload.to_string(),
        })
    }

    fn tear_down(&mut self) {
        if let Some((activation, handle)) = self.lookup_task.take() {
            debug!("Cancelling lookup for activation {}", activation);
            handle.abort();
        }
        self.context.clear_continuations();
        self.session.dropped_decodes += self.adapter.drop_stats().total();
        self.adapter.remount();
    }

    // ─────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn emit_changes(&self, pre: &SessionSnapshot, post: &SessionSnapshot) {
        if pre.permission != post.permission {
            self.emit(SessionEvent::PermissionChanged {
                state: post.permission,
            });
        }
        if !pre.camera_ready && post.camera_ready {
            self.emit(SessionEvent::CameraReady);
        }
        if pre.error_detail != post.error_detail {
            if let Some(detail) = &post.error_detail {
                self.emit(SessionEvent::DeviceError {
                    detail: detail.clone(),
                });
            }
        }
        if pre.state != post.state {
            self.emit(SessionEvent::StateChanged {
                from: pre.state,
                to: post.state,
            });
        }
        if post.stale_discarded > pre.stale_discarded {
            self.emit(SessionEvent::StaleResultDiscarded);
        }
        if !pre.torn_down && post.torn_down {
            self.emit(SessionEvent::TornDown);
        }
    }
}

#[cfg(test)]
mod tests;
