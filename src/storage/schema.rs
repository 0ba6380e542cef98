use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// Pass `":memory:"` for a throwaway database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database lock (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Migration` if the schema could not be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: concurrent source runs write to the same file, so
        // SQLite waits up to 5 seconds for the writer lock before SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);

        // SQLite is single-writer; 5 connections covers concurrent source runs
        // reading their dedup baselines while one of them commits.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stored_files (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                url TEXT,
                downloaded INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_sources (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT,
                hook TEXT,
                icon_file_id INTEGER REFERENCES stored_files(id) ON DELETE SET NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Link is the dedup key; the CHECK keeps empty links out even if a
        // caller bypasses the dedup filter.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS news_entries (
                id INTEGER PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES news_sources(id) ON DELETE CASCADE,
                published INTEGER NOT NULL,
                created INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                link TEXT NOT NULL CHECK (link <> ''),
                image_url TEXT,
                file_id INTEGER REFERENCES stored_files(id) ON DELETE SET NULL,
                UNIQUE(source_id, link)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Retention sweep filters by source and created
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_news_entries_source_created ON news_entries(source_id, created)",
        )
        .execute(&mut *tx)
        .await?;

        // Serving layer lists by publication date
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_news_entries_published ON news_entries(published DESC)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
