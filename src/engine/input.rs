// src/engine/input.rs

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{LifecycleEvent, RuntimeEvent};

/// Spawn a task that turns newline-delimited JSON into runtime events.
///
/// Blank lines are ignored; malformed lines are logged and skipped. EOF
/// produces a final [`RuntimeEvent::InputClosed`].
pub fn spawn_line_reader<R>(reader: R, runtime_tx: mpsc::Sender<RuntimeEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut line_no = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read lifecycle input; stopping reader");
                    break;
                }
            };
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<LifecycleEvent>(trimmed) {
                Ok(event) => event,
                Err(err) => {
                    warn!(line = line_no, error = %err, "ignoring malformed lifecycle event");
                    continue;
                }
            };

            if runtime_tx.send(RuntimeEvent::Lifecycle(event)).await.is_err() {
                debug!("runtime channel closed; stopping reader");
                return;
            }
        }

        let _ = runtime_tx.send(RuntimeEvent::InputClosed).await;
        debug!(lines = line_no, "lifecycle input finished");
    })
}
