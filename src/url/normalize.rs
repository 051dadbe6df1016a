use crate::url::is_crawlable;
use crate::UrlError;
use url::Url;

/// Parses and validates a seed URL supplied by the operator
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Parse the URL; reject if malformed
/// 3. Reject anything that is not http(s) or has no host
/// 4. Remove the fragment
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_seed;
///
/// let url = normalize_seed("  https://example.com/docs#intro ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
/// ```
pub fn normalize_seed(seed: &str) -> Result<Url, UrlError> {
    let seed = seed.trim();
    let mut url = Url::parse(seed).map_err(|e| UrlError::Parse(format!("{}: {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if !is_crawlable(&url) {
        return Err(UrlError::MissingHost(seed.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Returns the key under which a URL is tracked by the frontier
///
/// Two references that differ only in their fragment point at the same
/// document, so the fragment is dropped. Everything else, including the
/// query string, is kept verbatim.
pub fn frontier_key(url: &Url) -> String {
    if url.fragment().is_none() {
        return url.as_str().to_string();
    }

    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}
