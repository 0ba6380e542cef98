use std::collections::HashSet;

use crate::util::canonical_link;

/// True if an item with `link` must not be stored: the link is empty, or it
/// is already among the source's known links.
///
/// `existing_links` holds canonical links (see
/// [`Database::existing_links`](crate::storage::Database::existing_links)).
/// `link` is canonicalized before the exact, case-sensitive lookup, so
/// `http://a` and `http://a/` are the same link.
pub fn is_duplicate(existing_links: &HashSet<String>, link: &str) -> bool {
    let link = canonical_link(link);
    link.is_empty() || existing_links.contains(&link)
}
