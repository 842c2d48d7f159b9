//! URL classification for captured requests and recording targets

use url::Url;

/// Protocols on which recording and capture commands are refused
const RESTRICTED_PROTOCOLS: &[&str] = &[
    "chrome:",
    "chrome-extension:",
    "moz-extension:",
    "edge:",
    "about:",
];

/// Specific URLs that are refused even beyond the protocol check
const RESTRICTED_URLS: &[&str] = &["chrome://newtab/", "edge://newtab/", "about:newtab"];

/// Extract the host name from a URL, `"N/A"` if it cannot be parsed
pub fn domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or("N/A").to_string(),
        Err(_) => "N/A".to_string(),
    }
}

/// Derive a display file name from a URL
///
/// Uses the last path segment with any query stripped; falls back to the
/// host name when the path ends in `/`, and to the raw string when the URL
/// cannot be parsed at all.
pub fn file_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let host = parsed.host_str().unwrap_or_default().to_string();

    let last = parsed
        .path_segments()
        .and_then(|segments| segments.last().map(str::to_string))
        .unwrap_or_default();

    // Query is already excluded from path segments, but a raw '?' can
    // survive in pathological inputs
    let last = match last.find('?') {
        Some(idx) => last[..idx].to_string(),
        None => last,
    };

    if last.is_empty() {
        host
    } else {
        last
    }
}

/// Serialized origin (`scheme://host`) used by the synthetic CORS message
///
/// Returns `"null"` for unparseable or opaque-origin URLs, matching how
/// browsers render such origins.
pub fn origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => "null".to_string(),
    }
}

/// Whether a recording session may be started against this URL
///
/// Browser-internal and extension pages cannot be observed; commands against
/// them are rejected with a user-visible notice.
pub fn is_recordable(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if RESTRICTED_PROTOCOLS
        .iter()
        .any(|protocol| url.starts_with(protocol))
    {
        return false;
    }

    if RESTRICTED_URLS.iter().any(|restricted| url == *restricted) {
        return false;
    }

    true
}

/// Human-readable classification of a non-recordable URL for notices
pub fn url_kind(url: &str) -> &'static str {
    if url.is_empty() {
        return "unknown";
    }
    if url.starts_with("chrome-extension:") {
        return "extension";
    }
    if url.starts_with("chrome:") {
        return "Chrome internal";
    }
    if url.starts_with("edge:") {
        return "Edge internal";
    }
    if url.starts_with("about:") {
        return "browser internal";
    }
    if url.starts_with("moz-extension:") {
        return "Firefox extension";
    }
    "restricted"
}
