use url::Url;

/// Canonical form of an entry link, the key dedup compares on.
///
/// feed-rs hands out hrefs already run through URL parsing (`http://a`
/// comes back as `http://a/`, hosts lowercased, dot segments resolved), while
/// stored rows may hold the string as some other writer saw it. Both sides go
/// through here so they compare equal. Anything that does not parse as an
/// absolute URL is only trimmed.
///
/// # Examples
///
/// ```
/// use newsfeed_ingest::util::canonical_link;
///
/// assert_eq!(canonical_link("http://a"), "http://a/");
/// assert_eq!(canonical_link(" not a url "), "not a url");
/// ```
pub fn canonical_link(link: &str) -> String {
    let trimmed = link.trim();
    match Url::parse(trimmed) {
        Ok(url) => url.to_string(),
        Err(_) => trimmed.to_string(),
    }
}
