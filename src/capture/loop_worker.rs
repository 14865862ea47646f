use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{AppEvent, EventEmitter};

use super::{
    buffer::{Snapshot, SnapshotBuffer},
    frame::{encode_jpeg, FrameSource},
};

pub const CAPTURE_INTERVAL_SECS: u64 = 10;
const CAPTURE_TIMEOUT_SECS: u64 = 5;

/// Captures immediately, then every [`CAPTURE_INTERVAL_SECS`] until cancelled.
pub async fn capture_loop(
    source: Arc<dyn FrameSource>,
    buffer: SnapshotBuffer,
    events: EventEmitter,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(CAPTURE_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("snapshot capture shutting down");
                break;
            }
            _ = ticker.tick() => {
                let fut = capture_once(Arc::clone(&source));
                match tokio::time::timeout(Duration::from_secs(CAPTURE_TIMEOUT_SECS), fut).await {
                    Ok(Ok(Some(snapshot))) => {
                        let retained = buffer.push(snapshot);
                        events.emit(AppEvent::SnapshotCaptured { retained });
                    }
                    Ok(Ok(None)) => debug!("no camera frame available, skipping snapshot"),
                    Ok(Err(err)) => debug!("snapshot capture failed, skipping: {err:#}"),
                    Err(_) => debug!("snapshot capture timed out (> {CAPTURE_TIMEOUT_SECS}s), skipping"),
                }
            }
        }
    }
}

async fn capture_once(source: Arc<dyn FrameSource>) -> Result<Option<Snapshot>> {
    let captured_at = Utc::now();
    tokio::task::spawn_blocking(move || {
        let Some(frame) = source.grab()? else {
            return Ok(None);
        };
        let jpeg = encode_jpeg(&frame)?;
        Ok(Some(Snapshot { captured_at, jpeg }))
    })
    .await
    .context("snapshot worker join failed")?
}
