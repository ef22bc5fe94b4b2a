//! Bucket storage schema.
//!
//! `001` creates the bucket and entry tables, `002` the single-row pointer
//! to the active generation. Applied versions are recorded in `_migrations`
//! together with the schema change they belong to.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Schema steps in application order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_buckets.sql")),
    (2, include_str!("../../migrations/002_worker_state.sql")),
];

/// Bring the schema up to date.
///
/// Each step and its version row commit together, so an interrupted run
/// resumes at the first step that did not land.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        for (version, sql) in pending(conn)? {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "bucket schema migrated");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn pending(conn: &rusqlite::Connection) -> Result<Vec<(i64, &'static str)>, Error> {
    let applied: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    Ok(MIGRATIONS.iter().copied().filter(|(version, _)| *version > applied).collect())
}
