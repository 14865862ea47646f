use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, error};
use serde::Serialize;

use crate::{
    backend::Backend,
    events::EventEmitter,
    format::format_duration,
    ranking::{aggregate, window_cutoff, RankingMetric},
};

const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub value_secs: u64,
    pub value_display: String,
}

pub struct LeaderboardView {
    backend: Arc<dyn Backend>,
    events: EventEmitter,
    metric: RankingMetric,
    rows: Vec<LeaderboardRow>,
    loading: bool,
}

impl LeaderboardView {
    pub fn new(backend: Arc<dyn Backend>, events: EventEmitter) -> Self {
        Self {
            backend,
            events,
            metric: RankingMetric::default(),
            rows: Vec::new(),
            loading: false,
        }
    }

    pub fn metric(&self) -> RankingMetric {
        self.metric
    }

    pub fn set_metric(&mut self, metric: RankingMetric) {
        self.metric = metric;
    }

    pub fn rows(&self) -> &[LeaderboardRow] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub async fn refresh(&mut self, today: NaiveDate) -> &[LeaderboardRow] {
        self.loading = true;
        match self.load(today).await {
            Ok(rows) => {
                debug!("Leaderboard loaded with {} entries", rows.len());
                self.rows = rows;
            }
            Err(err) => {
                error!("Failed to load leaderboard: {err:#}");
                self.events
                    .error("Could not load leaderboard", format!("{err:#}"));
            }
        }
        self.loading = false;
        &self.rows
    }

    async fn load(&self, today: NaiveDate) -> Result<Vec<LeaderboardRow>> {
        let sessions = self.backend.sessions_since(window_cutoff(today)).await?;
        let entries = aggregate(&sessions, self.metric);

        let user_ids: Vec<String> = entries.iter().map(|e| e.user_id.clone()).collect();
        let profiles: HashMap<String, _> = self
            .backend
            .profiles(&user_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                let profile = profiles.get(&entry.user_id);
                LeaderboardRow {
                    rank: entry.rank,
                    display_name: profile
                        .map(|p| p.display_name.clone())
                        .unwrap_or_else(|| ANONYMOUS.to_string()),
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                    value_display: format_duration(entry.value_secs),
                    value_secs: entry.value_secs,
                    user_id: entry.user_id,
                }
            })
            .collect())
    }
}
