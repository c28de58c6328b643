//! Headless mode runner - one scan session driven by NDJSON device lines
//!
//! Device lines come from stdin (read on a blocking thread) or from a file.
//! Session events are forwarded to the output as they are broadcast.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::io::BufReader;
use tokio::sync::{broadcast, mpsc};

use audit_scan_app::config::{load_settings, Settings};
use audit_scan_app::services::{NavigationHost, RecordingNavigator, RegistryLookup, UnavailableNavigator};
use audit_scan_app::{ResolutionContext, ScanController, ScanSession, SessionEvent, Termination};
use audit_scan_core::prelude::*;
use audit_scan_core::ContinuationSlot;
use audit_scan_decoder::{parse_device_line, spawn_line_reader, DeviceLine};

use super::{write_event, HeadlessEvent};
use crate::options::ScanOptions;

/// Value captured by the picking continuation
type Picked = Arc<Mutex<Option<(ContinuationSlot, String)>>>;

/// Run in headless mode - device lines in, JSON events out on stdout
pub async fn run_headless(
    project_path: &Path,
    options: &ScanOptions,
    input: Option<&Path>,
) -> Result<()> {
    info!(
        "Headless session (mode: {}, config dir: {})",
        options.mode,
        project_path.display()
    );

    let settings = load_settings(project_path);
    let (tx, rx) = mpsc::channel(64);

    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                let err = Error::config(format!("Failed to open {}: {}", path.display(), e));
                write_event(&mut io::stdout(), &HeadlessEvent::error(&err));
                err
            })?;
            spawn_line_reader(BufReader::new(file), tx);
        }
        None => {
            // tokio's stdin keeps a blocking read alive past shutdown
            std::thread::spawn(move || read_stdin_blocking(tx));
        }
    }

    run_session(&settings, options, rx, io::stdout()).await?;

    info!("audit-scan headless mode exiting");
    Ok(())
}

/// Run one session over `lines`, writing NDJSON events to `out`.
///
/// Returns the writer once the session has ended and every event is written.
pub async fn run_session<W>(
    settings: &Settings,
    options: &ScanOptions,
    lines: mpsc::Receiver<DeviceLine>,
    mut out: W,
) -> Result<W>
where
    W: Write + Send + 'static,
{
    let lookup = match options.load_lookup() {
        Ok(lookup) => lookup,
        Err(e) => {
            error!("Failed to load registry: {}", e);
            write_event(&mut out, &HeadlessEvent::error(&e));
            return Err(e);
        }
    };

    write_event(
        &mut out,
        &HeadlessEvent::Started {
            mode: options.mode,
            host_available: options.host_available,
        },
    );

    let picked = Picked::default();
    let context = picking_context(options, &picked);

    let (session, mut out) = if options.host_available {
        drive(settings, context, lookup, RecordingNavigator::new(), lines, out).await?
    } else {
        drive(settings, context, lookup, UnavailableNavigator, lines, out).await?
    };

    let picked = match picked.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => {
            warn!("Picked value lock poisoned");
            None
        }
    };
    if let Some((continuation, value)) = picked {
        write_event(&mut out, &HeadlessEvent::Picked { continuation, value });
    }

    let outcome = match session.termination {
        Some(Termination::Completed(outcome)) => Some(outcome),
        Some(Termination::TornDown) | None => None,
    };
    write_event(
        &mut out,
        &HeadlessEvent::SessionEnded {
            resolutions: session.resolutions_started,
            outcome,
            torn_down: session.torn_down,
            dropped_decodes: session.dropped_decodes,
        },
    );

    Ok(out)
}

/// Resolution context whose continuation (in picking modes) records the value
fn picking_context(options: &ScanOptions, picked: &Picked) -> ResolutionContext {
    let context = options.context();
    let Some(slot) = options.mode.continuation_slot() else {
        return context;
    };

    let picked = Arc::clone(picked);
    context.with_continuation(
        slot,
        Box::new(move |value| {
            let mut guard = picked
                .lock()
                .map_err(|_| Error::callback_failure(slot.callback_name(), "picked value lock poisoned"))?;
            *guard = Some((slot, value));
            Ok(())
        }),
    )
}

/// Run the controller while a forwarder task writes its events
async fn drive<N, W>(
    settings: &Settings,
    context: ResolutionContext,
    lookup: RegistryLookup,
    navigator: N,
    lines: mpsc::Receiver<DeviceLine>,
    out: W,
) -> Result<(ScanSession, W)>
where
    N: NavigationHost,
    W: Write + Send + 'static,
{
    let controller = ScanController::new(settings, context, lookup, navigator);
    let events = controller.subscribe();
    let forwarder = tokio::spawn(forward_events(events, out));

    // run() consumes the controller, closing the event channel when it returns
    let session = controller.run(lines).await;

    let out = forwarder
        .await
        .map_err(|e| Error::channel_send(format!("event forwarder failed: {}", e)))?;
    Ok((session, out))
}

async fn forward_events<W: Write>(mut events: broadcast::Receiver<SessionEvent>, mut out: W) -> W {
    loop {
        match events.recv().await {
            Ok(event) => write_event(&mut out, &event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Headless output lagged, {} session events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    out
}

/// Forward stdin lines to the session (blocking version)
fn read_stdin_blocking(tx: mpsc::Sender<DeviceLine>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if matches!(trimmed, "q" | "quit") {
                    info!("Stdin: quit requested");
                    break;
                }
                let Some(parsed) = parse_device_line(trimmed) else {
                    continue;
                };
                if tx.blocking_send(parsed).is_err() {
                    debug!("Session closed, stdin reader stopping");
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}
