use crate::UrlError;
use url::Url;

/// Returns true if the URL can be fetched by the crawler
///
/// A URL is crawlable when its scheme is `http` or `https` and it carries a
/// non-empty host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::is_crawlable;
///
/// assert!(is_crawlable(&Url::parse("https://example.com/").unwrap()));
/// assert!(!is_crawlable(&Url::parse("mailto:someone@example.com").unwrap()));
/// ```
pub fn is_crawlable(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Returns true if both URLs point at the same host
///
/// Scheme and port are deliberately ignored: `http://example.com:8080/a` and
/// `https://example.com/b` are same-origin for mirroring purposes.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Resolves a possibly-relative reference against a base URL
///
/// Query and fragment of the reference are preserved, `.` and `..` segments
/// are normalized by the URL parser.
///
/// # Errors
///
/// Returns `UrlError::Parse` if the base is malformed or the reference cannot
/// be joined. Callers skip the reference in that case.
pub fn resolve(base: &str, reference: &str) -> Result<Url, UrlError> {
    let base = Url::parse(base).map_err(|e| UrlError::Parse(format!("{}: {}", base, e)))?;
    resolve_against(&base, reference)
}

/// Same as [`resolve`] for an already parsed base URL
pub fn resolve_against(base: &Url, reference: &str) -> Result<Url, UrlError> {
    let reference = reference.trim();
    base.join(reference)
        .map_err(|e| UrlError::Parse(format!("{} (against {}): {}", reference, base, e)))
}
