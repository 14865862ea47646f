use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{error, info};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    capture::{CaptureController, FrameSource, SnapshotBuffer},
    events::{AppEvent, EventEmitter},
    format::format_duration,
    recorder::{RecordOutcome, SessionRecorder},
};

use super::{SessionTimer, TickOutcome, TimerError, TimerMode, TimerStatus};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub timer: SessionTimer,
    pub display: String,
    pub snapshots_retained: usize,
}

/// Aborts the ticker task when the last controller clone goes away.
struct TickerHandle(JoinHandle<()>);

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives one plank session: the per-second ticker, snapshot capture while
/// active, and recording once the session completes.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionTimer>>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    capture: Arc<Mutex<CaptureController>>,
    camera: Arc<Mutex<Option<Arc<dyn FrameSource>>>>,
    snapshots: SnapshotBuffer,
    recorder: SessionRecorder,
    events: EventEmitter,
    tick_interval: Duration,
}

impl SessionController {
    pub fn new(recorder: SessionRecorder, events: EventEmitter, mode: TimerMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionTimer::new(mode))),
            ticker: Arc::new(Mutex::new(None)),
            capture: Arc::new(Mutex::new(CaptureController::new())),
            camera: Arc::new(Mutex::new(None)),
            snapshots: SnapshotBuffer::default(),
            recorder,
            events,
            tick_interval: Duration::from_secs(1),
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let guard = self.state.lock().await;
        snapshot_of(&guard, &self.snapshots)
    }

    pub fn snapshots(&self) -> &SnapshotBuffer {
        &self.snapshots
    }

    /// Grants (or revokes) the camera; takes effect the next time the timer starts.
    pub async fn set_camera(&self, camera: Option<Arc<dyn FrameSource>>) {
        *self.camera.lock().await = camera;
    }

    pub async fn set_mode(&self, mode: TimerMode) -> Result<(), TimerError> {
        self.state.lock().await.set_mode(mode)?;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn configure_countdown(&self, minutes: u64, seconds: u64) -> Result<(), TimerError> {
        self.state
            .lock()
            .await
            .configure_countdown(minutes, seconds)?;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn acknowledge(&self, acknowledged: bool) {
        self.state.lock().await.acknowledge(acknowledged);
        self.emit_state_changed().await;
    }

    pub async fn start(&self) -> Result<TimerSnapshot, TimerError> {
        {
            let mut state = self.state.lock().await;
            if let Err(err) = state.start() {
                self.events.warning("Cannot start yet", err.to_string());
                return Err(err);
            }
            info!(
                "Plank started ({:?}, {})",
                state.mode,
                format_duration(state.display_secs())
            );
        }

        self.spawn_ticker().await;

        if let Some(camera) = self.camera.lock().await.clone() {
            let mut capture = self.capture.lock().await;
            if let Err(err) = capture.start(camera, self.snapshots.clone(), self.events.clone()) {
                error!("Failed to start snapshot capture: {err:#}");
            }
        }

        self.emit_state_changed().await;
        Ok(self.get_snapshot().await)
    }

    pub async fn pause(&self) -> Result<TimerSnapshot, TimerError> {
        self.state.lock().await.pause()?;
        self.halt_activity().await;
        self.emit_state_changed().await;
        Ok(self.get_snapshot().await)
    }

    /// Ends a stopwatch session by hand and records it.
    pub async fn finish(&self) -> Result<RecordOutcome> {
        let finished = self.state.lock().await.finish();
        let duration_secs = match finished {
            Ok(duration_secs) => duration_secs,
            Err(err) => {
                self.events.warning("Cannot finish", err.to_string());
                return Err(err.into());
            }
        };
        self.halt_activity().await;
        self.emit_state_changed().await;

        info!("Plank finished after {}", format_duration(duration_secs));
        let outcome = self
            .recorder
            .record(duration_secs, self.snapshots.take())
            .await?;
        Ok(outcome)
    }

    pub async fn reset(&self) {
        self.halt_activity().await;
        self.state.lock().await.reset();
        self.snapshots.clear();
        self.emit_state_changed().await;
    }

    /// Stops both periodic tasks; used on teardown.
    pub async fn shutdown(&self) {
        self.halt_activity().await;
    }

    async fn halt_activity(&self) {
        self.ticker.lock().await.take();
        if let Err(err) = self.capture.lock().await.stop().await {
            error!("Failed to stop snapshot capture: {err:#}");
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        ticker_guard.take();

        let state = self.state.clone();
        let capture = self.capture.clone();
        let snapshots = self.snapshots.clone();
        let recorder = self.recorder.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;

                let (outcome, snapshot) = {
                    let mut guard = state.lock().await;
                    let outcome = guard.tick();
                    (outcome, snapshot_of(&guard, &snapshots))
                };

                match outcome {
                    TickOutcome::Ignored => break,
                    TickOutcome::Advanced => {
                        events.emit(AppEvent::TimerStateChanged { snapshot });
                    }
                    TickOutcome::Completed { duration_secs } => {
                        if let Err(e) = capture.lock().await.stop().await {
                            error!("Failed to stop snapshot capture on completion: {e:#}");
                        }
                        let snapshot = {
                            let guard = state.lock().await;
                            snapshot_of(&guard, &snapshots)
                        };
                        events.emit(AppEvent::TimerStateChanged { snapshot });
                        info!("Countdown complete ({})", format_duration(duration_secs));

                        let evidence = snapshots.take();
                        tokio::spawn(async move {
                            // failures already surfaced as toasts by the recorder
                            if let Err(e) = recorder.record(duration_secs, evidence).await {
                                error!("Countdown session not recorded: {e}");
                            }
                        });
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(TickerHandle(handle));
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.get_snapshot().await;
        self.events.emit(AppEvent::TimerStateChanged { snapshot });
    }

    pub async fn status(&self) -> TimerStatus {
        self.state.lock().await.status
    }
}

fn snapshot_of(timer: &SessionTimer, snapshots: &SnapshotBuffer) -> TimerSnapshot {
    TimerSnapshot {
        timer: timer.clone(),
        display: format_duration(timer.display_secs()),
        snapshots_retained: snapshots.len(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use image::{DynamicImage, Rgb, RgbImage};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        backend::{FileStore, LocalBackend},
        db::{Database, SessionRecord},
        events::{toasts_of, ToastLevel},
    };

    struct GreyCamera;

    impl FrameSource for GreyCamera {
        fn grab(&self) -> anyhow::Result<Option<DynamicImage>> {
            Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                4,
                4,
                Rgb([128, 128, 128]),
            ))))
        }
    }

    struct NoCamera;

    impl FrameSource for NoCamera {
        fn grab(&self) -> anyhow::Result<Option<DynamicImage>> {
            bail!("permission denied")
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        backend: Arc<LocalBackend>,
        controller: SessionController,
        rx: UnboundedReceiver<AppEvent>,
    }

    async fn harness(mode: TimerMode) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new(
            Database::new(dir.path().join("t.sqlite3")).unwrap(),
        ));
        backend.sign_in("ana", Some("Ana")).await.unwrap();
        let store = Arc::new(FileStore::new(dir.path().join("objects")).unwrap());
        let (events, rx) = EventEmitter::channel();
        let recorder = SessionRecorder::new(backend.clone(), store, events.clone());
        Harness {
            _dir: dir,
            backend,
            controller: SessionController::new(recorder, events, mode),
            rx,
        }
    }

    async fn next_saved(rx: &mut UnboundedReceiver<AppEvent>) -> (SessionRecord, Vec<AppEvent>) {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let AppEvent::SessionSaved { session, .. } = &event {
                let session = session.clone();
                seen.push(event);
                return (session, seen);
            }
            seen.push(event);
        }
        panic!("event channel closed before the session was saved");
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_acknowledgment_warns() {
        let mut h = harness(TimerMode::Stopwatch).await;

        let err = h.controller.start().await.unwrap_err();
        assert_eq!(err, TimerError::NotAcknowledged);
        assert_eq!(h.controller.status().await, TimerStatus::Idle);

        let emitted = crate::events::drain(&mut h.rx);
        assert_eq!(toasts_of(&emitted, ToastLevel::Warning).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_records_its_target_on_completion() {
        let mut h = harness(TimerMode::Countdown).await;
        h.controller.configure_countdown(0, 3).await.unwrap();
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(h.controller.status().await, TimerStatus::Completed);

        let (session, _) = next_saved(&mut h.rx).await;
        assert_eq!(session.duration_secs, 3);
        let stored = h.backend.database().get_session(&session.id).await.unwrap();
        assert_eq!(stored.duration_secs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_with_zero_target_never_starts() {
        let h = harness(TimerMode::Countdown).await;
        h.controller.configure_countdown(0, 0).await.unwrap();
        h.controller.acknowledge(true).await;
        assert_eq!(
            h.controller.start().await.unwrap_err(),
            TimerError::MissingTarget
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stopwatch_with_camera_saves_three_photos() {
        let mut h = harness(TimerMode::Stopwatch).await;
        h.controller.set_camera(Some(Arc::new(GreyCamera))).await;
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(25_500)).await;
        assert_eq!(h.controller.snapshots().len(), 3);

        let outcome = h.controller.finish().await.unwrap();
        assert_eq!(outcome.session.duration_secs, 25);
        assert_eq!(outcome.uploaded_paths.len(), 3);
        assert_eq!(outcome.failed_uploads, 0);

        let (saved, _) = next_saved(&mut h.rx).await;
        assert_eq!(saved.image_paths.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_time_and_capture() {
        let h = harness(TimerMode::Stopwatch).await;
        h.controller.set_camera(Some(Arc::new(GreyCamera))).await;
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let paused = h.controller.pause().await.unwrap();
        assert_eq!(paused.timer.elapsed_secs, 2);
        assert_eq!(paused.timer.status, TimerStatus::Paused);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let still = h.controller.get_snapshot().await;
        assert_eq!(still.timer.elapsed_secs, 2);
        assert_eq!(still.snapshots_retained, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_camera_does_not_block_the_session() {
        let h = harness(TimerMode::Stopwatch).await;
        h.controller.set_camera(Some(Arc::new(NoCamera))).await;
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(12_500)).await;
        let outcome = h.controller.finish().await.unwrap();
        assert_eq!(outcome.session.duration_secs, 12);
        assert!(outcome.session.image_paths.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_a_clean_idle_timer() {
        let h = harness(TimerMode::Countdown).await;
        h.controller.set_camera(Some(Arc::new(GreyCamera))).await;
        h.controller.configure_countdown(1, 0).await.unwrap();
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        h.controller.reset().await;
        let snapshot = h.controller.get_snapshot().await;
        assert_eq!(snapshot.timer, SessionTimer::new(TimerMode::Countdown));
        assert_eq!(snapshot.snapshots_retained, 0);

        // nothing keeps ticking after a reset
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(h.controller.status().await, TimerStatus::Idle);
        let today = chrono::Utc::now().date_naive();
        assert!(h.backend.database().sessions_since(today).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_countdown_ends_with_a_failed_save() {
        let mut h = harness(TimerMode::Countdown).await;
        h.backend.sign_out();
        h.controller.configure_countdown(0, 2).await.unwrap();
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();

        let mut seen = Vec::new();
        let reason = loop {
            match h.rx.recv().await {
                Some(AppEvent::SessionSaveFailed { reason }) => break reason,
                Some(other) => seen.push(other),
                None => panic!("event channel closed without a save result"),
            }
        };

        assert!(reason.contains("must be logged in"));
        assert_eq!(toasts_of(&seen, ToastLevel::Error).len(), 1);
        assert!(!seen
            .iter()
            .any(|e| matches!(e, AppEvent::SessionSaved { .. })));
        assert_eq!(h.controller.status().await, TimerStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_before_a_second_passes_warns() {
        let mut h = harness(TimerMode::Stopwatch).await;
        h.controller.acknowledge(true).await;
        h.controller.start().await.unwrap();
        crate::events::drain(&mut h.rx);

        let err = h.controller.finish().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TimerError>(),
            Some(&TimerError::NothingElapsed)
        );

        let emitted = crate::events::drain(&mut h.rx);
        let warnings = toasts_of(&emitted, ToastLevel::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].title, "Cannot finish");
    }
}
