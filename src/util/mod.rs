//! Text and link utilities shared by the ingestion engine.

mod link;
mod text;

pub use link::canonical_link;
pub use text::{sanitize_description, strip_control_chars};
