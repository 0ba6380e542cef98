//! SQLite persistence for sources, news entries and stored file references.

mod entries;
mod files;
mod schema;
mod sources;
mod types;

pub use schema::Database;
pub use types::{DatabaseError, Entry, NewEntry, Source, SourceConfig, StoredFile};
