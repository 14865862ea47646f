use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Per-user running totals, maintained on every session insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub current_streak: u32,
    pub best_duration_secs: u64,
    pub best_date: Option<NaiveDate>,
    pub total_sessions: u64,
    #[serde(skip)]
    pub last_session_date: Option<NaiveDate>,
}

impl UserSummary {
    /// Folds one more session into the totals.
    pub fn record_session(&mut self, duration_secs: u64, date: NaiveDate) {
        self.total_sessions += 1;

        if duration_secs > self.best_duration_secs || self.best_date.is_none() {
            self.best_duration_secs = duration_secs;
            self.best_date = Some(date);
        }

        self.current_streak = match self.last_session_date {
            Some(last) if last == date => self.current_streak.max(1),
            Some(last) if last.succ_opt() == Some(date) => self.current_streak + 1,
            // sessions recorded out of order do not break a streak
            Some(last) if last > date => self.current_streak,
            _ => 1,
        };

        if self.last_session_date.map_or(true, |last| date > last) {
            self.last_session_date = Some(date);
        }
    }
}
