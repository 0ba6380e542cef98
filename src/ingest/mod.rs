//! The ingestion pipeline.
//!
//! One run per source: retention sweep, fetch, per-item hook / dedup / image
//! resolution, then a single batch write. See [`Ingestor::ingest_one_source`].
//!
//! - [`hooks`] - per-source item transforms, selected by name
//! - [`dedup`] - the "is this item new" check
//! - [`images`] - image selection and deduplicated file registration

pub mod dedup;
mod engine;
pub mod hooks;
pub mod images;
mod schedule;

pub use engine::{IngestError, IngestReport, Ingestor, SourceResult, RETENTION_DAYS};
pub use schedule::CycleSummary;
