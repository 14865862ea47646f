use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::info;

use crate::db::{Badge, Database, Profile, SessionRecord, SessionRow, UserSummary};

use super::{Backend, Identity, NewSession};

/// [`Backend`] over the local SQLite database. The signed-in identity is
/// held in memory; the caller decides where to persist it.
pub struct LocalBackend {
    db: Database,
    signed_in: RwLock<Option<Identity>>,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            signed_in: RwLock::new(None),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Makes `user_id` the current identity, creating its profile on first use.
    pub async fn sign_in(&self, user_id: &str, display_name: Option<&str>) -> Result<Identity> {
        let display_name = match (display_name, self.db.get_profile(user_id).await?) {
            (Some(name), _) => name.to_string(),
            (None, Some(existing)) => existing.display_name,
            (None, None) => user_id.to_string(),
        };
        let profile = self.db.upsert_profile(user_id, &display_name, None).await?;

        let identity = Identity {
            id: profile.id,
            display_name: profile.display_name,
        };
        *self
            .signed_in
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(identity.clone());

        info!("Signed in as {}", identity.id);
        Ok(identity)
    }

    pub fn sign_out(&self) {
        self.signed_in
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn current_user(&self) -> Result<Option<Identity>> {
        Ok(self
            .signed_in
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn insert_session(&self, session: NewSession) -> Result<SessionRecord> {
        let record = SessionRecord::new(
            &session.user_id,
            session.duration_secs,
            session.session_date,
            Utc::now(),
        );
        self.db.insert_session(&record).await?;
        Ok(record)
    }

    async fn set_session_images(&self, session_id: &str, image_paths: Vec<String>) -> Result<()> {
        self.db.set_session_images(session_id, image_paths).await
    }

    async fn sessions_since(&self, cutoff: NaiveDate) -> Result<Vec<SessionRow>> {
        self.db.sessions_since(cutoff).await
    }

    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        self.db.recent_sessions_for_user(user_id, limit).await
    }

    async fn profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        self.db.get_profiles(user_ids).await
    }

    async fn user_summary(&self, user_id: &str) -> Result<Option<UserSummary>> {
        self.db.get_user_summary(user_id).await
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<Badge>> {
        self.db.get_user_badges(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_reuses_existing_display_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(Database::new(dir.path().join("t.sqlite3")).unwrap());

        assert!(backend.current_user().await.unwrap().is_none());

        backend.sign_in("ana", Some("Ana")).await.unwrap();
        backend.sign_out();
        assert!(backend.current_user().await.unwrap().is_none());

        let identity = backend.sign_in("ana", None).await.unwrap();
        assert_eq!(identity.display_name, "Ana");
        assert_eq!(backend.current_user().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn inserted_sessions_show_up_in_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(Database::new(dir.path().join("t.sqlite3")).unwrap());
        backend.sign_in("ana", None).await.unwrap();

        let today = Utc::now().date_naive();
        let record = backend
            .insert_session(NewSession {
                user_id: "ana".into(),
                duration_secs: 42,
                session_date: today,
            })
            .await
            .unwrap();

        assert_eq!(record.duration_secs, 42);
        let rows = backend.sessions_since(today).await.unwrap();
        assert_eq!(rows, vec![SessionRow::new("ana", 42)]);
    }
}
