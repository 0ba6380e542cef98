//! Feed retrieval and parsing.
//!
//! - [`fetcher`] - HTTP fetching with bounded retry and a body size cap
//! - [`parser`] - RSS/Atom/JSON Feed parsing via `feed-rs` into [`FeedItem`]s

mod fetcher;
mod parser;

pub use fetcher::{fetch_feed, FetchError, FetchPolicy};
pub use parser::{parse_feed, Enclosure, FeedItem, ParseError};
