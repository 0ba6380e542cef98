//! Periodic news feed ingestion.
//!
//! Polls RSS/Atom feeds per configured source, applies per-source hooks,
//! drops items already stored, registers one image per item as a
//! deduplicated [`storage::StoredFile`], and writes the new entries in a
//! single transaction per source.

pub mod config;
pub mod feed;
pub mod ingest;
pub mod storage;
pub mod util;
