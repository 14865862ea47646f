use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema scripts in order; applying entry `n` brings `user_version` to `n + 1`.
const SCHEMAS: &[(&str, &str)] = &[
    ("schema_v1.sql", include_str!("schemas/schema_v1.sql")),
    ("schema_v2.sql", include_str!("schemas/schema_v2.sql")),
];

pub(crate) const CURRENT_SCHEMA_VERSION: i32 = SCHEMAS.len() as i32;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!("database version ({version}) is newer than supported schema ({CURRENT_SCHEMA_VERSION})");
    }

    let pending = SCHEMAS.iter().skip(usize::try_from(version).unwrap_or(0));
    let tx = conn.transaction().context("failed to open migration transaction")?;
    let mut applied = 0;
    for (name, script) in pending {
        tx.execute_batch(script)
            .with_context(|| format!("failed to execute {name}"))?;
        applied += 1;
    }
    if applied == 0 {
        return Ok(());
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;
    info!("Database schema migrated from v{version} to v{CURRENT_SCHEMA_VERSION}");
    Ok(())
}
