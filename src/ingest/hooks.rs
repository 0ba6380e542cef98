//! Per-source item transforms, selected by the hook name stored on a source.
//!
//! Hooks run before dedup and image selection, so they can change which
//! enclosure becomes the entry's image.

use std::sync::LazyLock;

use regex::Regex;

use crate::feed::{Enclosure, FeedItem};

/// Newspread embeds its images in the content body instead of enclosures.
static NEWSPREAD_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://storage\.googleapis\.com/tum-newspread-de/assets/[a-z\-0-9]+\.jpeg")
        .expect("static regex is valid")
});

/// A known transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Newspread,
    Impulsiv,
}

/// Registered hook names. `impulsivHook` is the spelling stored on older
/// source rows.
const REGISTRY: &[(&str, Hook)] = &[
    ("newspread", Hook::Newspread),
    ("impulsiv", Hook::Impulsiv),
    ("impulsivHook", Hook::Impulsiv),
];

/// Resolve a hook name; unknown names resolve to nothing.
pub fn lookup(name: &str) -> Option<Hook> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, hook)| *hook)
}

/// Apply the hook named on a source, if any. Unknown names leave the item as is.
pub fn apply(hook_name: Option<&str>, item: &mut FeedItem) {
    let Some(name) = hook_name else {
        return;
    };
    match lookup(name) {
        Some(hook) => hook.apply(item),
        None => tracing::trace!(hook = %name, "Unknown hook, item left unchanged"),
    }
}

impl Hook {
    pub fn apply(self, item: &mut FeedItem) {
        match self {
            Hook::Newspread => newspread(item),
            Hook::Impulsiv => impulsiv(item),
        }
    }
}

/// Replace enclosures with the first bucket image found in the body.
///
/// The enclosure list is replaced even when nothing matches (one enclosure
/// with an empty URL). The body is not usable as a description, so that is
/// cleared too.
fn newspread(item: &mut FeedItem) {
    let url = NEWSPREAD_IMAGE
        .find(&item.content)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    item.enclosures = vec![Enclosure::new(url)];
    item.description.clear();
}

/// "123" becomes "Impulsiv - Ausgabe 123"; anything else gets the prefix.
fn impulsiv(item: &mut FeedItem) {
    let is_issue_number =
        !item.title.is_empty() && item.title.bytes().all(|b| b.is_ascii_digit());
    item.title = if is_issue_number {
        format!("Impulsiv - Ausgabe {}", item.title)
    } else {
        format!("Impulsiv - {}", item.title)
    };
}
