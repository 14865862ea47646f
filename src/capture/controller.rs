use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::EventEmitter;

use super::{buffer::SnapshotBuffer, frame::FrameSource, loop_worker::capture_loop};

/// Owns the capture task for one session.
pub struct CaptureController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        source: Arc<dyn FrameSource>,
        buffer: SnapshotBuffer,
        events: EventEmitter,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("snapshot capture already active");
        }

        info!("Starting snapshot capture");
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            source,
            buffer,
            events,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("snapshot capture task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    struct CountingCamera {
        grabs: AtomicUsize,
    }

    impl FrameSource for CountingCamera {
        fn grab(&self) -> Result<Option<DynamicImage>> {
            let n = self.grabs.fetch_add(1, Ordering::SeqCst) as u8;
            Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                2,
                2,
                Rgb([n, n, n]),
            ))))
        }
    }

    struct BrokenCamera;

    impl FrameSource for BrokenCamera {
        fn grab(&self) -> Result<Option<DynamicImage>> {
            bail!("camera unplugged")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_five_seconds_yield_three_snapshots() {
        let camera = Arc::new(CountingCamera {
            grabs: AtomicUsize::new(0),
        });
        let buffer = SnapshotBuffer::default();
        let (events, _rx) = EventEmitter::channel();

        let mut capture = CaptureController::new();
        capture
            .start(camera.clone(), buffer.clone(), events)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        capture.stop().await.unwrap();

        assert_eq!(camera.grabs.load(Ordering::SeqCst), 3);
        assert_eq!(buffer.len(), 3);
        assert!(!capture.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn longer_sessions_keep_the_latest_three() {
        let camera = Arc::new(CountingCamera {
            grabs: AtomicUsize::new(0),
        });
        let buffer = SnapshotBuffer::default();
        let (events, _rx) = EventEmitter::channel();

        let mut capture = CaptureController::new();
        capture
            .start(camera.clone(), buffer.clone(), events)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;
        capture.stop().await.unwrap();

        assert_eq!(camera.grabs.load(Ordering::SeqCst), 5);
        assert_eq!(buffer.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_captures_are_skipped() {
        let buffer = SnapshotBuffer::default();
        let (events, _rx) = EventEmitter::channel();

        let mut capture = CaptureController::new();
        capture
            .start(Arc::new(BrokenCamera), buffer.clone(), events)
            .unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        capture.stop().await.unwrap();

        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let (events, _rx) = EventEmitter::channel();
        let mut capture = CaptureController::new();
        capture
            .start(Arc::new(BrokenCamera), SnapshotBuffer::default(), events.clone())
            .unwrap();
        assert!(capture
            .start(Arc::new(BrokenCamera), SnapshotBuffer::default(), events)
            .is_err());
        capture.stop().await.unwrap();
    }
}
