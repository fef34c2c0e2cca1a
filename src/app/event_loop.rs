//! Host event loop: JSON lines in, JSON lines out

use std::future::Future;
use std::io::ErrorKind;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::host::protocol::{HostAction, HostEvent};
use crate::host::{ScheduledTask, Scheduler};

use super::AppState;

/// Pump host events and delayed tasks until the host hangs up, the stream
/// fails or `shutdown` resolves. Enclosures are torn down on every exit path.
pub async fn run<S, R, W, F>(
    state: &AppState<S>,
    input: R,
    output: &mut W,
    task_rx: &mut mpsc::Receiver<ScheduledTask>,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: Scheduler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let result = pump(state, input, output, task_rx, shutdown).await;
    if let Err(e) = &result {
        warn!(error = %e, "Event loop failed, tearing arenas down");
    }

    let teardown = write_actions(output, state.shutdown()).await;
    result.and(teardown)
}

async fn pump<S, R, W, F>(
    state: &AppState<S>,
    input: R,
    output: &mut W,
    task_rx: &mut mpsc::Receiver<ScheduledTask>,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: Scheduler,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Host closed the event stream");
                        return Ok(());
                    }
                    // the offending line is consumed, so the stream can go on
                    Err(e) if e.kind() == ErrorKind::InvalidData => {
                        warn!(error = %e, "Skipping host line that is not UTF-8");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostEvent>(line) {
                    Ok(event) => {
                        debug!(?event, "Host event");
                        write_actions(output, state.handle(event)).await?;
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed host event"),
                }
            }
            Some(task) = task_rx.recv() => {
                write_actions(output, state.run_task(task)).await?;
            }
            _ = &mut shutdown => return Ok(()),
        }
    }
}

/// Write actions as JSON lines, flushing once per batch
async fn write_actions<W>(output: &mut W, actions: Vec<HostAction>) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if actions.is_empty() {
        return Ok(());
    }
    let mut out = Vec::new();
    for action in &actions {
        serde_json::to_writer(&mut out, action)?;
        out.push(b'\n');
    }
    output.write_all(&out).await?;
    output.flush().await?;
    Ok(())
}
