use std::collections::HashSet;

use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, Entry, NewEntry};
use crate::util::canonical_link;

/// Maximum number of entries to return from any single listing (OOM protection)
const MAX_ENTRIES: i64 = 2000;

impl Database {
    // ========================================================================
    // Entry Operations
    // ========================================================================

    /// All links already stored for one source, in canonical form.
    ///
    /// An empty result is an empty baseline, not an error.
    pub async fn existing_links(&self, source_id: i64) -> Result<HashSet<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT link FROM news_entries WHERE source_id = ?")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(link,)| canonical_link(&link)).collect())
    }

    /// Insert a batch of entries in one transaction.
    ///
    /// Either every entry is committed or none is: a constraint violation on
    /// any row (e.g. two entries with the same link for one source) rolls back
    /// the whole batch. Returns the number of rows written.
    ///
    /// Chunks of 50 keep us under SQLite's 999 parameter limit
    /// (8 columns * 50 = 400).
    pub async fn insert_entries(&self, entries: &[NewEntry]) -> Result<usize, DatabaseError> {
        if entries.is_empty() {
            return Ok(0);
        }

        const BATCH_SIZE: usize = 50;
        let mut tx = self.pool.begin().await?;
        let mut written: usize = 0;

        for chunk in entries.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT INTO news_entries (source_id, published, created, title, description, link, image_url, file_id) ",
            );

            builder.push_values(chunk, |mut b, entry| {
                b.push_bind(entry.source_id)
                    .push_bind(entry.published)
                    .push_bind(entry.created)
                    .push_bind(&entry.title)
                    .push_bind(&entry.description)
                    .push_bind(&entry.link)
                    .push_bind(&entry.image_url)
                    .push_bind(entry.file_id);
            });

            let result = builder.build().execute(&mut *tx).await?;
            written += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Delete entries of one source created before `cutoff` (unix seconds).
    ///
    /// Returns the number of rows removed.
    pub async fn purge_entries_older_than(
        &self,
        source_id: i64,
        cutoff: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM news_entries WHERE source_id = ? AND created < ?")
            .bind(source_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Entries of one source, newest publication first.
    /// Hard cap at MAX_ENTRIES (2000).
    pub async fn entries_for_source(
        &self,
        source_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Entry>, DatabaseError> {
        let limit = limit.unwrap_or(500).min(MAX_ENTRIES);
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, source_id, published, created, title, description, link, image_url, file_id
            FROM news_entries
            WHERE source_id = ?
            ORDER BY published DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn count_entries(&self, source_id: i64) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM news_entries WHERE source_id = ?")
                .bind(source_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, NewEntry, SourceConfig};
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_760_000_000;
    const DAY: i64 = 24 * 60 * 60;

    async fn test_db() -> Database {
        let db = Database::open(":memory:").await.unwrap();
        db.sync_sources(&[
            SourceConfig {
                id: 1,
                title: "Source 1".into(),
                url: Some("https://one.example.com/rss".into()),
                hook: None,
            },
            SourceConfig {
                id: 2,
                title: "Source 2".into(),
                url: Some("https://two.example.com/rss".into()),
                hook: None,
            },
        ])
        .await
        .unwrap();
        db
    }

    fn entry(source_id: i64, link: &str, created: i64) -> NewEntry {
        NewEntry {
            source_id,
            published: created,
            created,
            title: format!("Title {}", link),
            description: "Body".into(),
            link: link.into(),
            image_url: None,
            file_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_entries_and_existing_links() {
        let db = test_db().await;
        let written = db
            .insert_entries(&[entry(1, "http://a", NOW), entry(1, "http://b", NOW)])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let links = db.existing_links(1).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.contains("http://a/"));
        assert!(links.contains("http://b/"));
    }

    #[tokio::test]
    async fn test_existing_links_are_canonical() {
        let db = test_db().await;
        db.insert_entries(&[entry(1, "HTTP://Example.COM/x/../y", NOW)])
            .await
            .unwrap();

        let links = db.existing_links(1).await.unwrap();
        assert!(links.contains("http://example.com/y"));
        assert!(!links.contains("HTTP://Example.COM/x/../y"));
    }

    #[tokio::test]
    async fn test_existing_links_scoped_to_source() {
        let db = test_db().await;
        db.insert_entries(&[entry(1, "http://a", NOW)]).await.unwrap();

        assert!(db.existing_links(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_link_allowed_across_sources() {
        let db = test_db().await;
        db.insert_entries(&[entry(1, "http://a", NOW), entry(2, "http://a", NOW)])
            .await
            .unwrap();

        assert_eq!(db.count_entries(1).await.unwrap(), 1);
        assert_eq!(db.count_entries(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_link_rolls_back_batch() {
        let db = test_db().await;
        let result = db
            .insert_entries(&[
                entry(1, "http://a", NOW),
                entry(1, "http://b", NOW),
                entry(1, "http://a", NOW),
            ])
            .await;

        assert!(result.unwrap_err().is_unique_violation());
        assert_eq!(db.count_entries(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_link_rejected() {
        let db = test_db().await;
        let result = db.insert_entries(&[entry(1, "", NOW)]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_insert_entries_empty_batch() {
        let db = test_db().await;
        assert_eq!(db.insert_entries(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_entries_spans_chunks() {
        let db = test_db().await;
        let batch: Vec<_> = (0..120)
            .map(|i| entry(1, &format!("http://item/{}", i), NOW))
            .collect();

        assert_eq!(db.insert_entries(&batch).await.unwrap(), 120);
        assert_eq!(db.count_entries(1).await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_purge_only_removes_old_entries_of_source() {
        let db = test_db().await;
        db.insert_entries(&[
            entry(1, "http://old", NOW - 400 * DAY),
            entry(1, "http://recent", NOW - 300 * DAY),
            entry(2, "http://other-old", NOW - 400 * DAY),
        ])
        .await
        .unwrap();

        let removed = db
            .purge_entries_older_than(1, NOW - 365 * DAY)
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let remaining: Vec<_> = db
            .entries_for_source(1, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.link)
            .collect();
        assert_eq!(remaining, vec!["http://recent".to_string()]);
        assert_eq!(db.count_entries(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_entries_for_source_limit() {
        let db = test_db().await;
        let batch: Vec<_> = (0..10)
            .map(|i| entry(1, &format!("http://item/{}", i), NOW + i))
            .collect();
        db.insert_entries(&batch).await.unwrap();

        let limited = db.entries_for_source(1, Some(3)).await.unwrap();
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].link, "http://item/9");
    }
}
