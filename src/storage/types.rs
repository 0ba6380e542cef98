use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with operator-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The news database is locked by another process. Please wait and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }

    /// True when the underlying error is a UNIQUE constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Other(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

// ============================================================================
// Input Types
// ============================================================================

/// A source as declared in configuration, synced into `news_sources`.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub hook: Option<String>,
}

/// An entry built by the ingestion engine, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub source_id: i64,
    /// Publication time reported by the feed (unix seconds)
    pub published: i64,
    /// Ingestion time (unix seconds); the retention sweep keys off this
    pub created: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    /// Enclosure URL picked as the entry's image, as it appeared in the feed
    pub image_url: Option<String>,
    pub file_id: Option<i64>,
}

// ============================================================================
// Data Structures
// ============================================================================

/// One configured feed origin.
///
/// Sources without a `url` are kept in the table (they may carry an icon for
/// the serving layer) but are skipped by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Source {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub hook: Option<String>,
    pub icon_file_id: Option<i64>,
}

/// One persisted feed item.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub source_id: i64,
    pub published: i64,
    pub created: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub image_url: Option<String>,
    pub file_id: Option<i64>,
}

/// Deduplicated reference to an externally hosted media file.
///
/// `name` is derived from the origin URL, so the same URL always maps to the
/// same row. `downloaded` is flipped by the download worker, never here.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredFile {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub url: Option<String>,
    pub downloaded: bool,
}
