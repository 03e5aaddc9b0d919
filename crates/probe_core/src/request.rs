/// Normalize a raw URL for probing: strip leading/trailing whitespace.
///
/// The reference behavior accepted any non-empty string as-is, so no scheme
/// or syntax validation happens here; an unparseable URL simply ends up as a
/// failed probe with the parser's message as the reason.
pub fn normalize_url(raw: &str) -> &str {
    raw.trim()
}

/// Identity key for a URL: normalized and ASCII-lowercased.
///
/// Two URLs that differ only in case refer to the same status table entry.
pub fn url_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Normalize a batch of URLs, dropping empties and deduplicating exact
/// trimmed matches while preserving first-seen order.
///
/// Batch intake dedupes; repeated single enqueues intentionally do not.
pub fn dedupe_batch<I, S>(raws: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut accepted: Vec<String> = Vec::new();
    for raw in raws {
        let url = normalize_url(raw.as_ref());
        if url.is_empty() || accepted.iter().any(|seen| seen == url) {
            continue;
        }
        accepted.push(url.to_string());
    }
    accepted
}
