//! JSON-lines snapshot producer
//!
//! Each input line is one snapshot:
//! `{"kind":"UPDATE","timestamp":12.5,"kpis":[{"name":"RPM","unit":"rpm","value":3000}]}`.
//! A missing timestamp is filled with the current wall-clock time.

use anyhow::{Context, Result};
use nbp_broadcaster::{Kpi, PacketKind, Snapshot};
use serde::Deserialize;
use std::io::BufRead;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct IncomingSnapshot {
    timestamp: Option<f64>,
    kind: PacketKind,
    #[serde(default)]
    kpis: Vec<Kpi>,
}

/// Seconds since the Unix epoch, microsecond precision
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Parse one input line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<Snapshot>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let incoming: IncomingSnapshot =
        serde_json::from_str(line).context("Invalid snapshot JSON")?;

    Ok(Some(Snapshot::new(
        incoming.timestamp.unwrap_or_else(now_seconds),
        incoming.kind,
        incoming.kpis,
    )))
}

/// Forward every snapshot read from `reader` to all `queues`.
///
/// Malformed lines are logged and skipped. Returns the number of snapshots
/// forwarded once the reader is exhausted or every queue is closed.
pub fn pump<R: BufRead>(reader: R, queues: &[UnboundedSender<Snapshot>]) -> Result<usize> {
    let mut forwarded = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;

        let snapshot = match parse_line(&line) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping line {}: {:#}", lineno + 1, e);
                continue;
            }
        };

        let mut delivered = false;
        for queue in queues {
            delivered |= queue.send(snapshot.clone()).is_ok();
        }
        if !delivered {
            debug!("All broadcaster queues closed, stopping input");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

/// Run [`pump`] on a dedicated thread and report its result through a oneshot.
///
/// Blocking stdin reads cannot be cancelled; a plain thread (unlike the
/// runtime's blocking pool) does not hold up runtime shutdown while it waits.
pub fn spawn_pump<R, F>(
    open: F,
    queues: Vec<UnboundedSender<Snapshot>>,
) -> Result<oneshot::Receiver<Result<usize>>>
where
    R: BufRead,
    F: FnOnce() -> R + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("nbp-input".to_string())
        .spawn(move || {
            let result = pump(open(), &queues);
            // Receiver is gone once the daemon is shutting down
            let _ = done_tx.send(result);
        })
        .context("Failed to spawn input thread")?;

    Ok(done_rx)
}
