use chrono::{DateTime, Utc};
use feed_rs::parser;
use thiserror::Error;

use crate::util::canonical_link;

/// Feed bytes could not be parsed as RSS, Atom or JSON Feed.
#[derive(Debug, Error)]
#[error("Parse error: {0}")]
pub struct ParseError(#[from] parser::ParseFeedError);

/// A media attachment declared by a feed item.
///
/// `content_type` is whatever the feed declared, possibly nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Enclosure {
    pub url: String,
    pub content_type: Option<String>,
}

impl Enclosure {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
        }
    }

    pub fn with_type(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: Some(content_type.into()),
        }
    }
}

/// One item of a fetched feed, in the shape the ingestion engine works on.
///
/// Hooks rewrite these in place before dedup, so every field is owned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedItem {
    pub title: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    /// Raw (unsanitized) summary text
    pub description: String,
    /// Empty when the feed gave no link
    pub link: String,
    /// Raw content body (`content:encoded` for RSS)
    pub content: String,
    pub enclosures: Vec<Enclosure>,
}

/// Parse feed bytes into items, preserving feed order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>, ParseError> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| canonical_link(&l.href))
                .unwrap_or_default();
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let description = entry.summary.map(|s| s.content).unwrap_or_default();
            let content = entry.content.and_then(|c| c.body).unwrap_or_default();

            let enclosures = entry
                .media
                .into_iter()
                .flat_map(|m| m.content)
                .filter_map(|c| {
                    let url = c.url?;
                    Some(Enclosure {
                        url: url.to_string(),
                        content_type: c.content_type.map(|m| m.to_string()),
                    })
                })
                .collect();

            FeedItem {
                title,
                published: entry.published,
                updated: entry.updated,
                description,
                link,
                content,
                enclosures,
            }
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
    <title>News</title>
    <item>
        <title>First</title>
        <link>http://example.com/first</link>
        <description>&lt;p&gt;Hello&lt;/p&gt;</description>
        <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
        <enclosure url="http://example.com/first.jpg" length="1" type="image/jpeg"/>
    </item>
    <item>
        <title>Second</title>
        <content:encoded><![CDATA[<img src="x">]]></content:encoded>
    </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_rss_items_in_order() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First");
        assert_eq!(items[1].title, "Second");
    }

    #[test]
    fn test_parse_rss_fields() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        let first = &items[0];
        assert_eq!(first.link, "http://example.com/first");
        assert_eq!(first.description, "<p>Hello</p>");
        assert_eq!(first.published.map(|d| d.timestamp()), Some(1_704_067_200));
        assert_eq!(
            first.enclosures,
            vec![Enclosure::with_type("http://example.com/first.jpg", "image/jpeg")]
        );
    }

    #[test]
    fn test_parse_missing_link_and_content_body() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        let second = &items[1];
        assert_eq!(second.link, "");
        assert_eq!(second.content, r#"<img src="x">"#);
        assert!(second.enclosures.is_empty());
        assert!(second.published.is_none());
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom</title>
    <id>urn:feed</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <entry>
        <title>Atom entry</title>
        <id>urn:entry:1</id>
        <link href="http://example.com/atom"/>
        <updated>2024-01-02T00:00:00Z</updated>
    </entry>
</feed>"#;
        let items = parse_feed(atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "http://example.com/atom");
        assert!(items[0].updated.is_some());
    }

    #[test]
    fn test_parse_link_is_canonical() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
    <item><title>Bare</title><link> http://a </link></item>
    <item><title>Messy</title><link>HTTP://Example.COM:80/x/../y?q=1</link></item>
</channel></rss>"#;
        let items = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(items[0].link, "http://a/");
        assert_eq!(items[1].link, "http://example.com/y?q=1");
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }
}
