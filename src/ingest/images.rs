//! Image selection and registration.
//!
//! Images are never downloaded here. Registering one creates a
//! [`StoredFile`] row that the download worker picks up later.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::feed::{Enclosure, FeedItem};
use crate::storage::{Database, DatabaseError, StoredFile};

/// Storage directory for news images.
pub const NEWS_IMAGE_DIRECTORY: &str = "news/newspread/";

static IMAGE_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"image/[a-z.]+").expect("static regex is valid"));

/// First enclosure that looks like an image, by URL suffix or declared type.
pub fn pick_image(item: &FeedItem) -> Option<&Enclosure> {
    item.enclosures.iter().find(|enclosure| {
        enclosure.url.ends_with(".jpg")
            || enclosure.url.ends_with(".jpeg")
            || enclosure.url.ends_with(".png")
            || enclosure
                .content_type
                .as_deref()
                .is_some_and(|t| IMAGE_CONTENT_TYPE.is_match(t))
    })
}

/// Deterministic file name for an image URL.
///
/// Always `.jpg`; the download worker converts whatever it fetches.
pub fn stored_file_name(url: &str) -> String {
    format!("{:x}.jpg", Sha256::digest(url.as_bytes()))
}

/// Return the stored file for `url`, creating it on first sight.
///
/// Lookup is by name only, so every entry referencing the same URL (from any
/// source) shares one row.
pub async fn register_file(db: &Database, url: &str) -> Result<StoredFile, DatabaseError> {
    let name = stored_file_name(url);

    if let Some(existing) = db.find_file_by_name(&name).await? {
        tracing::trace!(name = %name, file_id = existing.id, "Image already registered");
        return Ok(existing);
    }

    insert_or_reuse(db, &name, url).await
}

/// Insert the row for `name`. If a concurrent run inserted the same name
/// after our lookup, the unique constraint rejects ours and the winner's row
/// is returned instead.
async fn insert_or_reuse(db: &Database, name: &str, url: &str) -> Result<StoredFile, DatabaseError> {
    match db.insert_file(name, NEWS_IMAGE_DIRECTORY, Some(url)).await {
        Ok(file) => {
            tracing::debug!(name = %name, url = %url, file_id = file.id, "Registered new image");
            Ok(file)
        }
        Err(e) if e.is_unique_violation() => {
            tracing::debug!(name = %name, "Image registered concurrently, reusing existing row");
            db.find_file_by_name(name)
                .await?
                .ok_or(DatabaseError::Other(sqlx::Error::RowNotFound))
        }
        Err(e) => Err(e),
    }
}
