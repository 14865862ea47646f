//! Persists a finished session and its evidence photos.

use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use thiserror::Error;

use crate::{
    backend::{Backend, NewSession, ObjectStore},
    capture::Snapshot,
    db::{models::session::MAX_EVIDENCE_IMAGES, SessionRecord},
    events::{AppEvent, EventEmitter},
    format::format_duration,
};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("you must be logged in to save a session")]
    NotSignedIn,
    #[error("could not look up the signed-in user: {0:#}")]
    Identity(anyhow::Error),
    #[error("failed to save session: {0:#}")]
    Insert(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The stored row, including the evidence list if it was written.
    pub session: SessionRecord,
    pub uploaded_paths: Vec<String>,
    pub failed_uploads: usize,
}

#[derive(Clone)]
pub struct SessionRecorder {
    backend: Arc<dyn Backend>,
    store: Arc<dyn ObjectStore>,
    events: EventEmitter,
}

pub fn evidence_path(user_id: &str, session_id: &str, index: usize) -> String {
    format!("{user_id}/{session_id}_{index}.jpg")
}

impl SessionRecorder {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn ObjectStore>, events: EventEmitter) -> Self {
        Self {
            backend,
            store,
            events,
        }
    }

    /// Saves the session, then uploads photos one at a time. Once the row
    /// exists nothing below it can undo the save.
    pub async fn record(
        &self,
        duration_secs: u64,
        snapshots: Vec<Snapshot>,
    ) -> Result<RecordOutcome, RecordError> {
        let user = match self.backend.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(self.abandon("Not signed in", RecordError::NotSignedIn)),
            Err(err) => return Err(self.abandon("Not signed in", RecordError::Identity(err))),
        };

        let mut session = match self
            .backend
            .insert_session(NewSession {
                user_id: user.id.clone(),
                duration_secs,
                session_date: Utc::now().date_naive(),
            })
            .await
        {
            Ok(session) => session,
            Err(err) => {
                return Err(self.abandon("Could not save session", RecordError::Insert(err)))
            }
        };

        info!(
            "Saved session {} for {} ({})",
            session.id,
            user.id,
            format_duration(duration_secs)
        );

        let mut uploaded_paths = Vec::new();
        let mut failed_uploads = 0;
        for (index, snapshot) in snapshots.into_iter().take(MAX_EVIDENCE_IMAGES).enumerate() {
            let path = evidence_path(&user.id, &session.id, index);
            match self.store.upload(&path, snapshot.jpeg, "image/jpeg").await {
                Ok(()) => uploaded_paths.push(path),
                Err(err) => {
                    failed_uploads += 1;
                    error!("Failed to upload photo {} for session {}: {err:#}", index + 1, session.id);
                    self.events.error(
                        "Photo upload failed",
                        format!("Photo {} could not be uploaded", index + 1),
                    );
                }
            }
        }

        if !uploaded_paths.is_empty() {
            match self
                .backend
                .set_session_images(&session.id, uploaded_paths.clone())
                .await
            {
                Ok(()) => session.image_paths = uploaded_paths.clone(),
                Err(err) => warn!(
                    "Session {} saved without photos; evidence update failed: {err:#}",
                    session.id
                ),
            }
        }

        self.events.success(
            "Session saved",
            format!("You planked for {}", format_duration(duration_secs)),
        );
        let evidence_urls = session
            .image_paths
            .iter()
            .map(|path| self.store.public_url(path))
            .collect();
        self.events.emit(AppEvent::SessionSaved {
            session: session.clone(),
            evidence_urls,
            failed_uploads,
        });

        Ok(RecordOutcome {
            session,
            uploaded_paths,
            failed_uploads,
        })
    }

    /// Reports a save that never produced a row.
    fn abandon(&self, title: &str, err: RecordError) -> RecordError {
        error!("Session not saved: {err}");
        self.events.error(title, err.to_string());
        self.events.emit(AppEvent::SessionSaveFailed {
            reason: err.to_string(),
        });
        err
    }
}
