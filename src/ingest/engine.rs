use chrono::Utc;
use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::{dedup, hooks, images};
use crate::feed::{self, FetchError, FetchPolicy, ParseError};
use crate::storage::{Database, DatabaseError, NewEntry, Source};
use crate::util::sanitize_description;

/// Entries older than this (by ingestion time) are purged before each run.
pub const RETENTION_DAYS: i64 = 365;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Reasons a single source's run was aborted.
///
/// None of these affect other sources; [`Ingestor::ingest_all`] records them
/// per source and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Retention sweep failed: {0}")]
    RetentionSweep(#[source] DatabaseError),
    #[error("Feed fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Feed parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Loading existing links failed: {0}")]
    ExistingLinks(#[source] DatabaseError),
    #[error("Persisting {count} new entries failed: {source}")]
    BatchPersist {
        count: usize,
        #[source]
        source: DatabaseError,
    },
}

/// What one run did for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub source_id: i64,
    /// The source has no feed URL; nothing was done
    pub skipped: bool,
    /// Entries removed by the retention sweep
    pub purged: u64,
    /// Items in the fetched feed
    pub fetched_items: usize,
    /// Items dropped by the dedup filter (empty or known link)
    pub duplicates: usize,
    /// Entries written
    pub new_entries: usize,
    /// Written entries that reference a stored file
    pub with_image: usize,
    /// Picked images whose registration failed (entry kept without file)
    pub image_failures: usize,
}

impl IngestReport {
    fn skipped(source_id: i64) -> Self {
        Self {
            source_id,
            skipped: true,
            ..Self::default()
        }
    }
}

/// Outcome of one source inside [`Ingestor::ingest_all`].
#[derive(Debug)]
pub struct SourceResult {
    pub source_id: i64,
    pub result: Result<IngestReport, IngestError>,
}

/// Runs ingestion for sources against one database and HTTP client.
///
/// Cheap to clone: the pool and the client are both reference-counted.
#[derive(Clone)]
pub struct Ingestor {
    db: Database,
    client: reqwest::Client,
    policy: FetchPolicy,
    max_concurrent_sources: usize,
}

impl Ingestor {
    pub fn new(db: Database, client: reqwest::Client) -> Self {
        Self {
            db,
            client,
            policy: FetchPolicy::default(),
            max_concurrent_sources: 4,
        }
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_concurrent_sources(mut self, n: usize) -> Self {
        self.max_concurrent_sources = n.max(1);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Ingest every source, a few at a time.
    ///
    /// Items of one source are always processed sequentially; only distinct
    /// sources overlap. Results come back in completion order.
    pub async fn ingest_all(&self, sources: &[Source]) -> Vec<SourceResult> {
        stream::iter(sources)
            .map(|source| async move {
                let result = self.ingest_one_source(source).await;
                match &result {
                    Ok(report) if report.skipped => {}
                    Ok(report) => tracing::info!(
                        source_id = source.id,
                        title = %source.title,
                        new_entries = report.new_entries,
                        duplicates = report.duplicates,
                        "Source ingested"
                    ),
                    Err(e) => tracing::error!(
                        source_id = source.id,
                        title = %source.title,
                        error = %e,
                        "Source ingestion failed"
                    ),
                }
                SourceResult {
                    source_id: source.id,
                    result,
                }
            })
            .buffer_unordered(self.max_concurrent_sources)
            .collect()
            .await
    }

    /// Fetch one source's feed and store the entries not seen before.
    ///
    /// # Steps
    ///
    /// 1. Purge this source's entries older than [`RETENTION_DAYS`]
    /// 2. Fetch and parse the feed
    /// 3. Load the source's known links once, as the dedup baseline
    /// 4. Per item, in feed order: hook, dedup, image, build entry
    /// 5. Write all new entries in one transaction
    ///
    /// The baseline is not updated while iterating, so two items sharing a
    /// link within the same fetch are both queued; the `(source, link)`
    /// uniqueness constraint then rejects the batch as a whole.
    ///
    /// # Errors
    ///
    /// Any error aborts this source's run only. A failed image registration is
    /// not an error: the entry is stored without a file reference.
    pub async fn ingest_one_source(&self, source: &Source) -> Result<IngestReport, IngestError> {
        let Some(url) = source.url.as_deref() else {
            tracing::debug!(source_id = source.id, "Source has no feed URL, skipping");
            return Ok(IngestReport::skipped(source.id));
        };

        let mut report = IngestReport {
            source_id: source.id,
            ..IngestReport::default()
        };

        report.purged = self.purge_old_entries(source.id).await?;

        tracing::trace!(source_id = source.id, url = %url, "Fetching feed");
        let bytes = feed::fetch_feed(&self.client, url, &self.policy)
            .await
            .inspect_err(|e| tracing::error!(source_id = source.id, url = %url, error = %e, "Fetching feed failed"))?;
        let items = feed::parse_feed(&bytes)
            .inspect_err(|e| tracing::error!(source_id = source.id, url = %url, error = %e, "Parsing feed failed"))?;
        report.fetched_items = items.len();

        let existing_links = self
            .db
            .existing_links(source.id)
            .await
            .map_err(|e| {
                tracing::error!(source_id = source.id, error = %e, "Loading existing links failed");
                IngestError::ExistingLinks(e)
            })?;

        let now = Utc::now().timestamp();
        let mut batch: Vec<NewEntry> = Vec::new();

        for mut item in items {
            hooks::apply(source.hook.as_deref(), &mut item);

            if dedup::is_duplicate(&existing_links, &item.link) {
                report.duplicates += 1;
                continue;
            }

            let image_url = images::pick_image(&item).map(|e| e.url.clone());
            let mut file_id = None;
            if let Some(image_url) = image_url.as_deref() {
                match images::register_file(&self.db, image_url).await {
                    Ok(file) => file_id = Some(file.id),
                    Err(e) => {
                        report.image_failures += 1;
                        tracing::error!(
                            source_id = source.id,
                            url = %image_url,
                            error = %e,
                            "Registering news image failed"
                        );
                    }
                }
            }

            let published = item
                .published
                .or(item.updated)
                .map(|dt| dt.timestamp())
                .unwrap_or(now);

            batch.push(NewEntry {
                source_id: source.id,
                published,
                created: now,
                title: item.title,
                description: sanitize_description(&item.description),
                link: item.link,
                image_url,
                file_id,
            });
        }

        if batch.is_empty() {
            tracing::trace!(source_id = source.id, "No new entries");
            return Ok(report);
        }

        let count = batch.len();
        match self.db.insert_entries(&batch).await {
            Ok(written) => {
                tracing::trace!(source_id = source.id, count = written, "Inserted new entries");
                report.new_entries = written;
                report.with_image = batch.iter().filter(|e| e.file_id.is_some()).count();
                Ok(report)
            }
            Err(e) => {
                tracing::error!(source_id = source.id, count = count, error = %e, "Inserting new entries failed");
                Err(IngestError::BatchPersist { count, source: e })
            }
        }
    }

    async fn purge_old_entries(&self, source_id: i64) -> Result<u64, IngestError> {
        let cutoff = Utc::now().timestamp() - RETENTION_DAYS * SECONDS_PER_DAY;
        tracing::trace!(source_id = source_id, cutoff = cutoff, "Truncating old entries");

        match self.db.purge_entries_older_than(source_id, cutoff).await {
            Ok(removed) => {
                tracing::info!(source_id = source_id, removed = removed, "Cleaned up old entries");
                Ok(removed)
            }
            Err(e) => {
                tracing::error!(source_id = source_id, error = %e, "Cleaning up old entries failed");
                Err(IngestError::RetentionSweep(e))
            }
        }
    }
}
