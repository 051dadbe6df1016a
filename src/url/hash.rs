use sha2::{Digest, Sha256};

/// Number of hex characters kept by [`short_hash`]
const SHORT_HASH_LEN: usize = 16;

/// Hashes a URL into a hex-encoded SHA-256 digest
///
/// Used for every deterministic name the mirror puts on disk: localized
/// resources, rewritten link targets and untitled page directories.
///
/// # Examples
///
/// ```
/// use site_mirror::url::url_hash;
///
/// let hash = url_hash("https://example.com/a.jpg");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, url_hash("https://example.com/a.jpg"));
/// ```
pub fn url_hash(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Returns the first characters of [`url_hash`], for suffixes and fallbacks
pub fn short_hash(url: &str) -> String {
    let mut hash = url_hash(url);
    hash.truncate(SHORT_HASH_LEN);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(
            url_hash("https://example.com/"),
            url_hash("https://example.com/")
        );
    }

    #[test]
    fn test_different_urls_different_hashes() {
        assert_ne!(
            url_hash("https://example.com/a"),
            url_hash("https://example.com/b")
        );
    }

    #[test]
    fn test_short_hash_is_prefix() {
        let full = url_hash("https://example.com/");
        let short = short_hash("https://example.com/");
        assert_eq!(short.len(), SHORT_HASH_LEN);
        assert!(full.starts_with(&short));
    }
}
