//! Leaderboard aggregation over raw `(user, duration)` rows.
//!
//! Rows are grouped per user, reduced to one value (sum or best single
//! session), sorted descending and ranked from 1. Equal values are ordered
//! by user id ascending so the result never depends on fetch order.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::SessionRow;

pub const WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RankingMetric {
    #[default]
    TotalTime,
    BestSession,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub user_id: String,
    pub value_secs: u64,
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Standing {
    Unranked,
    Ranked {
        rank: usize,
        total: usize,
        percentile: f64,
    },
}

impl Standing {
    /// "Top 25%" style label; `None` when unranked.
    pub fn percentile_label(&self) -> Option<String> {
        match self {
            Standing::Unranked => None,
            Standing::Ranked { percentile, .. } => Some(format!("Top {percentile:.0}%")),
        }
    }
}

/// First day inside the window ending `today`.
pub fn window_cutoff(today: NaiveDate) -> NaiveDate {
    today - Duration::days(WINDOW_DAYS)
}

pub fn aggregate(rows: &[SessionRow], metric: RankingMetric) -> Vec<RankingEntry> {
    let mut per_user: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        let value = per_user.entry(row.user_id.as_str()).or_insert(0);
        *value = match metric {
            RankingMetric::TotalTime => value.saturating_add(row.duration_secs),
            RankingMetric::BestSession => (*value).max(row.duration_secs),
        };
    }

    let mut grouped: Vec<(&str, u64)> = per_user.into_iter().collect();
    grouped.sort_by(|(a_user, a_value), (b_user, b_value)| {
        b_value.cmp(a_value).then_with(|| a_user.cmp(b_user))
    });

    grouped
        .into_iter()
        .enumerate()
        .map(|(index, (user_id, value_secs))| RankingEntry {
            user_id: user_id.to_string(),
            value_secs,
            rank: index + 1,
        })
        .collect()
}

pub fn aggregate_by_total(rows: &[SessionRow]) -> Vec<RankingEntry> {
    aggregate(rows, RankingMetric::TotalTime)
}

pub fn aggregate_by_best(rows: &[SessionRow]) -> Vec<RankingEntry> {
    aggregate(rows, RankingMetric::BestSession)
}

/// Where `user_id` sits on the total-time board.
pub fn standing_for(rows: &[SessionRow], user_id: &str) -> Standing {
    let entries = aggregate_by_total(rows);
    let total = entries.len();
    match entries.iter().find(|entry| entry.user_id == user_id) {
        Some(entry) => Standing::Ranked {
            rank: entry.rank,
            total,
            percentile: entry.rank as f64 / total as f64 * 100.0,
        },
        None => Standing::Unranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[(&str, u64)]) -> Vec<SessionRow> {
        data.iter()
            .map(|(user, secs)| SessionRow::new(*user, *secs))
            .collect()
    }

    #[test]
    fn totals_preserve_the_overall_sum() {
        let input = rows(&[("a", 30), ("b", 45), ("a", 60), ("c", 5), ("b", 15)]);
        let entries = aggregate_by_total(&input);

        let input_sum: u64 = input.iter().map(|r| r.duration_secs).sum();
        let entry_sum: u64 = entries.iter().map(|e| e.value_secs).sum();
        assert_eq!(input_sum, entry_sum);

        let order: Vec<(&str, u64)> = entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.value_secs))
            .collect();
        assert_eq!(order, vec![("a", 90), ("b", 60), ("c", 5)]);
    }

    #[test]
    fn best_takes_the_longest_single_session() {
        let input = rows(&[("a", 30), ("a", 70), ("b", 65), ("b", 60)]);
        let entries = aggregate_by_best(&input);
        assert_eq!(entries[0].user_id, "a");
        assert_eq!(entries[0].value_secs, 70);
        assert_eq!(entries[1].value_secs, 65);
    }

    #[test]
    fn ranks_are_a_dense_permutation() {
        let input = rows(&[("d", 1), ("c", 2), ("b", 3), ("a", 4), ("c", 10)]);
        let entries = aggregate_by_total(&input);

        let ranks: Vec<usize> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=4).collect::<Vec<_>>());
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].value_secs >= pair[1].value_secs));
    }

    #[test]
    fn ties_break_by_user_id_regardless_of_input_order() {
        let forward = aggregate_by_total(&rows(&[("zed", 50), ("amy", 50), ("kim", 50)]));
        let reverse = aggregate_by_total(&rows(&[("kim", 50), ("amy", 50), ("zed", 50)]));

        assert_eq!(forward, reverse);
        let users: Vec<&str> = forward.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["amy", "kim", "zed"]);
        assert_eq!(forward[2].rank, 3);
    }

    #[test]
    fn top_user_percentile_is_one_over_n() {
        let input = rows(&[("a", 100), ("b", 50), ("c", 10), ("d", 1)]);
        match standing_for(&input, "a") {
            Standing::Ranked {
                rank,
                total,
                percentile,
            } => {
                assert_eq!(rank, 1);
                assert_eq!(total, 4);
                assert!((percentile - 25.0).abs() < f64::EPSILON);
            }
            Standing::Unranked => panic!("expected a ranking"),
        }

        let last = standing_for(&input, "d");
        assert_eq!(last.percentile_label().as_deref(), Some("Top 100%"));
    }

    #[test]
    fn absent_user_is_unranked() {
        let input = rows(&[("a", 10)]);
        assert_eq!(standing_for(&input, "ghost"), Standing::Unranked);
        assert_eq!(standing_for(&[], "ghost"), Standing::Unranked);
        assert!(aggregate_by_total(&[]).is_empty());
    }

    #[test]
    fn percentile_label_rounds_to_whole_percent() {
        let input = rows(&[("a", 3), ("b", 2), ("c", 1)]);
        assert_eq!(
            standing_for(&input, "a").percentile_label().as_deref(),
            Some("Top 33%")
        );
        assert_eq!(
            standing_for(&input, "b").percentile_label().as_deref(),
            Some("Top 67%")
        );
    }

    #[test]
    fn window_starts_thirty_days_back() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(
            window_cutoff(today),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }
}
