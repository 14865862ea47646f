//! Session rows as stored by the backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Evidence photos attached to a single session never exceed this count.
pub const MAX_EVIDENCE_IMAGES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub duration_secs: u64,
    pub session_date: NaiveDate,
    pub image_paths: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A fresh record with a new id and no evidence attached yet.
    pub fn new(
        user_id: &str,
        duration_secs: u64,
        session_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            duration_secs,
            session_date,
            image_paths: Vec::new(),
            created_at,
        }
    }
}

/// The two columns the leaderboard needs; fetched in bulk for a date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub user_id: String,
    pub duration_secs: u64,
}

impl SessionRow {
    pub fn new(user_id: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            user_id: user_id.into(),
            duration_secs,
        }
    }
}
