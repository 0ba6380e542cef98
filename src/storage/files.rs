use super::schema::Database;
use super::types::{DatabaseError, StoredFile};

impl Database {
    // ========================================================================
    // Stored File Operations
    // ========================================================================

    /// Look up a stored file by name.
    ///
    /// The storage path is deliberately not part of the predicate: a name is
    /// derived from the origin URL, so one URL maps to one row no matter which
    /// directory it was registered for.
    pub async fn find_file_by_name(&self, name: &str) -> Result<Option<StoredFile>, DatabaseError> {
        let file = sqlx::query_as::<_, StoredFile>(
            "SELECT id, name, path, url, downloaded FROM stored_files WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    /// Insert a new stored file with `downloaded = false`.
    ///
    /// Fails with a unique violation (see [`DatabaseError::is_unique_violation`])
    /// if a file with the same name already exists.
    pub async fn insert_file(
        &self,
        name: &str,
        path: &str,
        url: Option<&str>,
    ) -> Result<StoredFile, DatabaseError> {
        let file = sqlx::query_as::<_, StoredFile>(
            r#"
            INSERT INTO stored_files (name, path, url, downloaded)
            VALUES (?, ?, ?, 0)
            RETURNING id, name, path, url, downloaded
        "#,
        )
        .bind(name)
        .bind(path)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(file)
    }

    pub async fn count_files(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stored_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
