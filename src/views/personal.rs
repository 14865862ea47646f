use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use log::error;
use serde::Serialize;

use crate::{
    backend::{Backend, Identity},
    db::{SessionRecord, UserSummary},
    events::EventEmitter,
    ranking::{standing_for, window_cutoff, Standing},
};

const RECENT_SESSION_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalStats {
    pub identity: Identity,
    pub summary: UserSummary,
    pub recent_sessions: Vec<SessionRecord>,
    pub standing: Standing,
}

pub struct PersonalStatsView {
    backend: Arc<dyn Backend>,
    events: EventEmitter,
    stats: Option<PersonalStats>,
    loading: bool,
}

impl PersonalStatsView {
    pub fn new(backend: Arc<dyn Backend>, events: EventEmitter) -> Self {
        Self {
            backend,
            events,
            stats: None,
            loading: false,
        }
    }

    pub fn stats(&self) -> Option<&PersonalStats> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub async fn refresh(&mut self, today: NaiveDate) -> Option<&PersonalStats> {
        self.loading = true;
        match self.load(today).await {
            Ok(Some(stats)) => self.stats = Some(stats),
            Ok(None) => {
                self.events
                    .warning("Not signed in", "Log in to see your stats");
            }
            Err(err) => {
                error!("Failed to load personal stats: {err:#}");
                self.events.error("Could not load your stats", format!("{err:#}"));
            }
        }
        self.loading = false;
        self.stats.as_ref()
    }

    async fn load(&self, today: NaiveDate) -> Result<Option<PersonalStats>> {
        let Some(identity) = self.backend.current_user().await? else {
            return Ok(None);
        };

        let summary = self
            .backend
            .user_summary(&identity.id)
            .await?
            .unwrap_or_default();
        let recent_sessions = self
            .backend
            .recent_sessions(&identity.id, RECENT_SESSION_LIMIT)
            .await?;
        let window = self.backend.sessions_since(window_cutoff(today)).await?;
        let standing = standing_for(&window, &identity.id);

        Ok(Some(PersonalStats {
            identity,
            summary,
            recent_sessions,
            standing,
        }))
    }
}
