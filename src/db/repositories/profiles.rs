use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db::{
    helpers::{format_date, parse_optional_date, to_i64, to_u64},
    models::{Profile, UserSummary},
    Database,
};

fn load_summary(conn: &Connection, user_id: &str) -> Result<Option<UserSummary>> {
    let raw = conn
        .query_row(
            "SELECT current_streak, best_duration_secs, best_date, total_sessions, last_session_date
             FROM user_stats
             WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((streak, best, best_date, total, last_date)) = raw else {
        return Ok(None);
    };

    Ok(Some(UserSummary {
        current_streak: u32::try_from(to_u64(streak, "current_streak")?)?,
        best_duration_secs: to_u64(best, "best_duration_secs")?,
        best_date: parse_optional_date(best_date, "best_date")?,
        total_sessions: to_u64(total, "total_sessions")?,
        last_session_date: parse_optional_date(last_date, "last_session_date")?,
    }))
}

/// Adds one session to the user's running totals and returns the new totals.
pub(super) fn fold_into_summary(
    conn: &Connection,
    user_id: &str,
    duration_secs: u64,
    session_date: NaiveDate,
) -> Result<UserSummary> {
    let mut summary = load_summary(conn, user_id)?.unwrap_or_default();
    summary.record_session(duration_secs, session_date);

    conn.execute(
        "INSERT INTO user_stats (user_id, current_streak, best_duration_secs, best_date, total_sessions, last_session_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id) DO UPDATE SET
             current_streak = excluded.current_streak,
             best_duration_secs = excluded.best_duration_secs,
             best_date = excluded.best_date,
             total_sessions = excluded.total_sessions,
             last_session_date = excluded.last_session_date",
        params![
            user_id,
            i64::from(summary.current_streak),
            to_i64(summary.best_duration_secs)?,
            summary.best_date.map(format_date),
            to_i64(summary.total_sessions)?,
            summary.last_session_date.map(format_date),
        ],
    )?;

    Ok(summary)
}

impl Database {
    /// Creates the profile or updates its display fields.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        display_name: &str,
        avatar_url: Option<String>,
    ) -> Result<Profile> {
        let profile = Profile {
            id: user_id.to_string(),
            display_name: display_name.to_string(),
            avatar_url,
        };
        let record = profile.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO profiles (id, display_name, avatar_url, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     display_name = excluded.display_name,
                     avatar_url = COALESCE(excluded.avatar_url, profiles.avatar_url)",
                params![
                    record.id,
                    record.display_name,
                    record.avatar_url,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let mut profiles = self.get_profiles(&[user_id.to_string()]).await?;
        Ok(profiles.pop())
    }

    pub async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = user_ids.to_vec();
        self.execute(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT id, display_name, avatar_url FROM profiles WHERE id IN ({placeholders})"
            ))?;

            let mut rows = stmt.query(params_from_iter(ids.iter()))?;
            let mut profiles = Vec::new();
            while let Some(row) = rows.next()? {
                profiles.push(Profile {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    avatar_url: row.get(2)?,
                });
            }
            Ok(profiles)
        })
        .await
    }

    pub async fn get_user_summary(&self, user_id: &str) -> Result<Option<UserSummary>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| load_summary(conn, &user_id)).await
    }
}
