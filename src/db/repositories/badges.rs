use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::{
    helpers::{parse_optional_datetime, to_i64, to_u64},
    models::{Badge, BadgeCriterion, UserSummary},
    Database,
};

/// Recomputes every badge's progress for `user_id` from fresh totals. The
/// earned timestamp is stamped the first time progress reaches the target
/// and never cleared afterwards.
pub(super) fn advance_badges(
    conn: &Connection,
    user_id: &str,
    summary: &UserSummary,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, criterion, target FROM badges")?;
    let mut rows = stmt.query([])?;
    let mut catalogue = Vec::new();
    while let Some(row) = rows.next()? {
        let criterion: String = row.get(1)?;
        let target: i64 = row.get(2)?;
        catalogue.push((
            row.get::<_, i64>(0)?,
            criterion.parse::<BadgeCriterion>()?,
            to_u64(target, "target")?,
        ));
    }

    for (badge_id, criterion, target) in catalogue {
        let progress = criterion.progress_from(summary);
        let earned_now = (progress >= target).then(|| now.to_rfc3339());

        conn.execute(
            "INSERT INTO user_badges (user_id, badge_id, progress, earned_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, badge_id) DO UPDATE SET
                 progress = excluded.progress,
                 earned_at = COALESCE(user_badges.earned_at, excluded.earned_at)",
            params![user_id, badge_id, to_i64(progress)?, earned_now],
        )?;
    }

    Ok(())
}

impl Database {
    /// Full badge catalogue with this user's progress; untouched badges show zero.
    pub async fn get_user_badges(&self, user_id: &str) -> Result<Vec<Badge>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT b.name, b.icon, b.description, b.target,
                        COALESCE(ub.progress, 0), ub.earned_at
                 FROM badges b
                 LEFT JOIN user_badges ub ON ub.badge_id = b.id AND ub.user_id = ?1
                 ORDER BY b.id",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut badges = Vec::new();
            while let Some(row) = rows.next()? {
                let target: i64 = row.get(3)?;
                let progress: i64 = row.get(4)?;
                badges.push(Badge {
                    user_id: user_id.clone(),
                    name: row.get(0)?,
                    icon: row.get(1)?,
                    description: row.get(2)?,
                    progress: to_u64(progress, "progress")?,
                    target: to_u64(target, "target")?,
                    earned_at: parse_optional_datetime(row.get(5)?, "earned_at")?,
                });
            }
            Ok(badges)
        })
        .await
    }
}
