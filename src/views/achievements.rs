use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::error;

use crate::{backend::Backend, db::Badge, events::EventEmitter};

pub struct AchievementsView {
    backend: Arc<dyn Backend>,
    events: EventEmitter,
    badges: Vec<Badge>,
}

impl AchievementsView {
    pub fn new(backend: Arc<dyn Backend>, events: EventEmitter) -> Self {
        Self {
            backend,
            events,
            badges: Vec::new(),
        }
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn earned_count(&self) -> usize {
        self.badges.iter().filter(|badge| badge.is_earned()).count()
    }

    pub async fn refresh(&mut self) -> &[Badge] {
        match self.load().await {
            Ok(badges) => self.badges = badges,
            Err(err) => {
                error!("Failed to load badges: {err:#}");
                self.events.error("Could not load achievements", format!("{err:#}"));
            }
        }
        &self.badges
    }

    async fn load(&self) -> Result<Vec<Badge>> {
        let identity = self
            .backend
            .current_user()
            .await?
            .ok_or_else(|| anyhow!("you must be logged in to see achievements"))?;
        self.backend.user_badges(&identity.id).await
    }
}
