use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// `<script>` and `<style>` blocks, including their bodies.
static EXECUTABLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("static regex is valid")
});

/// Anchor tags. The text converter would otherwise append the `href`.
static ANCHOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?a\b[^>]*>").expect("static regex is valid"));

/// Reduce feed-supplied HTML to plain, safe text.
///
/// Nothing survives from the markup: no tags, no attributes, no link targets.
/// Script and style bodies are dropped entirely rather than turned into text,
/// and terminal control sequences are removed.
///
/// The converter decodes entities, so `&lt;b&gt;` in the input would come out
/// as a live `<b>`. The result is therefore HTML-escaped: it is text that is
/// safe to embed in markup, not markup.
///
/// # Examples
///
/// ```
/// use newsfeed_ingest::util::sanitize_description;
///
/// assert_eq!(sanitize_description("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(sanitize_description("&lt;b&gt;bold&lt;/b&gt;"), "&lt;b&gt;bold&lt;/b&gt;");
/// assert_eq!(sanitize_description(""), "");
/// ```
pub fn sanitize_description(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let without_blocks = EXECUTABLE_BLOCK.replace_all(html, "");
    let without_anchors = ANCHOR_TAG.replace_all(&without_blocks, "");
    let text = nanohtml2text::html2text(&without_anchors);
    escape_html(strip_control_chars(&text).trim())
}

/// Escape the characters that could start markup or break out of an attribute.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// SEC-001: Strip control characters and ANSI escape sequences from text.
///
/// Strips:
/// - ASCII control chars other than tab, newline and carriage return, plus DEL
/// - ANSI CSI sequences: `\x1b[` ... (terminal byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL or ST `\x1b\\`)
/// - Bare ESC not followed by `[` or `]`
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // parameter/intermediate bytes until the final byte
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_stripped_control(c) => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

fn is_stripped_control(c: char) -> bool {
    c == '\x7f' || (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'))
}
