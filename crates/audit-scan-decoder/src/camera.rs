//! Camera bridge reader
//!
//! Reads newline-delimited JSON from a camera bridge (a child process pipe,
//! a socket, or stdin in headless mode) and forwards parsed lines.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use audit_scan_core::prelude::*;

use crate::protocol::{parse_device_line, DeviceLine};

/// Spawn a task that forwards every non-blank line from `reader`.
///
/// The task ends at EOF, on a read error, or when the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<DeviceLine>) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    trace!("camera: {}", line);
                    let Some(parsed) = parse_device_line(&line) else {
                        continue;
                    };
                    if tx.send(parsed).await.is_err() {
                        debug!("camera line channel closed");
                        break;
                    }
                }
                Ok(None) => {
                    info!("camera bridge reached EOF");
                    break;
                }
                Err(e) => {
                    warn!("camera bridge read error: {}", e);
                    break;
                }
            }
        }
    })
}
