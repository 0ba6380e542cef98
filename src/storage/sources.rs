use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, Source, SourceConfig};

impl Database {
    // ========================================================================
    // Source Operations
    // ========================================================================

    /// Sync configured sources into `news_sources` (upsert by id).
    ///
    /// Title, URL and hook follow the configuration; `icon_file_id` is left
    /// untouched since it is owned by whoever manages source icons.
    /// Sources missing from `sources` are not deleted.
    pub async fn sync_sources(&self, sources: &[SourceConfig]) -> Result<(), DatabaseError> {
        if sources.is_empty() {
            return Ok(());
        }

        const BATCH_SIZE: usize = 100;
        let mut tx = self.pool.begin().await?;

        for chunk in sources.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<sqlx::Sqlite> =
                QueryBuilder::new("INSERT INTO news_sources (id, title, url, hook) ");

            builder.push_values(chunk, |mut b, source| {
                b.push_bind(source.id)
                    .push_bind(&source.title)
                    .push_bind(&source.url)
                    .push_bind(&source.hook);
            });

            builder.push(
                " ON CONFLICT(id) DO UPDATE SET title = excluded.title, url = excluded.url, hook = excluded.hook",
            );

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// All sources, ordered by id
    pub async fn list_sources(&self) -> Result<Vec<Source>, DatabaseError> {
        let sources = sqlx::query_as::<_, Source>(
            "SELECT id, title, url, hook, icon_file_id FROM news_sources ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sources)
    }

    pub async fn get_source(&self, source_id: i64) -> Result<Option<Source>, DatabaseError> {
        let source = sqlx::query_as::<_, Source>(
            "SELECT id, title, url, hook, icon_file_id FROM news_sources WHERE id = ?",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, SourceConfig};
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn source(id: i64, title: &str, hook: Option<&str>) -> SourceConfig {
        SourceConfig {
            id,
            title: title.to_string(),
            url: Some(format!("https://news{}.example.com/rss", id)),
            hook: hook.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_sync_sources_inserts() {
        let db = test_db().await;
        db.sync_sources(&[source(1, "TUM", None), source(2, "Impulsiv", Some("impulsiv"))])
            .await
            .unwrap();

        let sources = db.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].hook.as_deref(), Some("impulsiv"));
        assert_eq!(sources[0].icon_file_id, None);
    }

    #[tokio::test]
    async fn test_sync_sources_updates_existing() {
        let db = test_db().await;
        db.sync_sources(&[source(1, "Old", None)]).await.unwrap();

        let mut updated = source(1, "New", Some("newspread"));
        updated.url = None;
        db.sync_sources(&[updated]).await.unwrap();

        let fetched = db.get_source(1).await.unwrap().unwrap();
        assert_eq!(fetched.title, "New");
        assert_eq!(fetched.url, None);
        assert_eq!(fetched.hook.as_deref(), Some("newspread"));
    }

    #[tokio::test]
    async fn test_sync_sources_empty_is_noop() {
        let db = test_db().await;
        db.sync_sources(&[]).await.unwrap();
        assert!(db.list_sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_preserves_icon() {
        let db = test_db().await;
        db.sync_sources(&[source(1, "TUM", None)]).await.unwrap();
        let file = db
            .insert_file("icon.jpg", "news/sources/", Some("https://example.com/icon.png"))
            .await
            .unwrap();
        sqlx::query("UPDATE news_sources SET icon_file_id = ? WHERE id = 1")
            .bind(file.id)
            .execute(&db.pool)
            .await
            .unwrap();

        db.sync_sources(&[source(1, "TUM renamed", None)]).await.unwrap();

        let fetched = db.get_source(1).await.unwrap().unwrap();
        assert_eq!(fetched.icon_file_id, Some(file.id));
    }

    #[tokio::test]
    async fn test_get_source_missing() {
        let db = test_db().await;
        assert!(db.get_source(42).await.unwrap().is_none());
    }
}
