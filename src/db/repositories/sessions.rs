use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{
        encode_image_paths, format_date, parse_date, parse_datetime, parse_image_paths, to_i64,
        to_u64,
    },
    models::{session::MAX_EVIDENCE_IMAGES, SessionRecord, SessionRow},
    Database,
};

use super::{badges::advance_badges, profiles::fold_into_summary};

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let duration_secs: i64 = row.get("duration_secs")?;
    let session_date: String = row.get("session_date")?;
    let image_paths: String = row.get("image_paths")?;
    let created_at: String = row.get("created_at")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        session_date: parse_date(&session_date, "session_date")?,
        image_paths: parse_image_paths(&image_paths)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Inserts a session and folds it into the owner's summary and badge
    /// progress in the same transaction.
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO sessions (id, user_id, duration_secs, session_date, image_paths, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.user_id,
                    to_i64(record.duration_secs)?,
                    format_date(record.session_date),
                    encode_image_paths(&record.image_paths)?,
                    record.created_at.to_rfc3339(),
                ],
            )?;

            let summary = fold_into_summary(
                &tx,
                &record.user_id,
                record.duration_secs,
                record.session_date,
            )?;
            advance_badges(&tx, &record.user_id, &summary, record.created_at)?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Replaces the evidence list of a session in one write.
    pub async fn set_session_images(&self, session_id: &str, image_paths: Vec<String>) -> Result<()> {
        if image_paths.len() > MAX_EVIDENCE_IMAGES {
            bail!(
                "a session holds at most {MAX_EVIDENCE_IMAGES} images, got {}",
                image_paths.len()
            );
        }

        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE sessions SET image_paths = ?1 WHERE id = ?2",
                params![encode_image_paths(&image_paths)?, session_id],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Session not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, duration_secs, session_date, image_paths, created_at
                 FROM sessions
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let session = match rows.next()? {
                Some(row) => row_to_session(row)?,
                None => return Err(anyhow!("Session not found")),
            };
            Ok(session)
        })
        .await
    }

    /// All `(user, duration)` pairs dated on or after `cutoff`, in insertion order.
    pub async fn sessions_since(&self, cutoff: NaiveDate) -> Result<Vec<SessionRow>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, duration_secs
                 FROM sessions
                 WHERE session_date >= ?1
                 ORDER BY rowid",
            )?;

            let mut rows = stmt.query(params![format_date(cutoff)])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                let duration_secs: i64 = row.get(1)?;
                sessions.push(SessionRow {
                    user_id: row.get(0)?,
                    duration_secs: to_u64(duration_secs, "duration_secs")?,
                });
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn recent_sessions_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, duration_secs, session_date, image_paths, created_at
                 FROM sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![user_id, limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}
