//! Seams to the hosted services the app talks to: identity plus tables
//! ([`Backend`]) and blob storage ([`ObjectStore`]).

mod file_store;
mod local;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Badge, Profile, SessionRecord, SessionRow, UserSummary};

pub use file_store::FileStore;
pub use local::LocalBackend;

/// The signed-in user as reported by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: String,
    pub duration_secs: u64,
    pub session_date: NaiveDate,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn current_user(&self) -> Result<Option<Identity>>;

    async fn insert_session(&self, session: NewSession) -> Result<SessionRecord>;

    /// Single write that replaces the session's evidence-image list.
    async fn set_session_images(&self, session_id: &str, image_paths: Vec<String>) -> Result<()>;

    /// Raw rows dated on or after `cutoff`; aggregation happens client side.
    async fn sessions_since(&self, cutoff: NaiveDate) -> Result<Vec<SessionRow>>;

    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>>;

    async fn profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>>;

    async fn user_summary(&self, user_id: &str) -> Result<Option<UserSummary>>;

    async fn user_badges(&self, user_id: &str) -> Result<Vec<Badge>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    fn public_url(&self, path: &str) -> String;
}
