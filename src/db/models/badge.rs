use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// What a badge's progress counter tracks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCriterion {
    TotalSessions,
    StreakDays,
    BestDurationSecs,
}

impl BadgeCriterion {
    const ALL: [BadgeCriterion; 3] = [
        BadgeCriterion::TotalSessions,
        BadgeCriterion::StreakDays,
        BadgeCriterion::BestDurationSecs,
    ];

    /// Column value stored in `badges.criterion`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCriterion::TotalSessions => "total_sessions",
            BadgeCriterion::StreakDays => "streak_days",
            BadgeCriterion::BestDurationSecs => "best_duration_secs",
        }
    }

    pub fn progress_from(&self, summary: &UserSummary) -> u64 {
        match self {
            BadgeCriterion::TotalSessions => summary.total_sessions,
            BadgeCriterion::StreakDays => u64::from(summary.current_streak),
            BadgeCriterion::BestDurationSecs => summary.best_duration_secs,
        }
    }
}

impl FromStr for BadgeCriterion {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|criterion| criterion.as_str() == value)
            .ok_or_else(|| anyhow!("unknown badge criterion {value}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub user_id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub progress: u64,
    pub target: u64,
    pub earned_at: Option<DateTime<Utc>>,
}

impl Badge {
    pub fn is_earned(&self) -> bool {
        self.earned_at.is_some()
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.target == 0 {
            return 1.0;
        }
        (self.progress as f64 / self.target as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_column_values_parse_back() {
        for criterion in BadgeCriterion::ALL {
            assert_eq!(criterion.as_str().parse::<BadgeCriterion>().unwrap(), criterion);
        }
        assert!("longest_nap".parse::<BadgeCriterion>().is_err());
    }

    #[test]
    fn progress_fraction_is_clamped() {
        let mut badge = Badge {
            user_id: "ana".into(),
            name: "Regular".into(),
            icon: "R".into(),
            description: "Ten sessions".into(),
            progress: 15,
            target: 10,
            earned_at: None,
        };
        assert_eq!(badge.progress_fraction(), 1.0);
        badge.progress = 5;
        assert_eq!(badge.progress_fraction(), 0.5);
        assert!(!badge.is_earned());
    }
}
