//! Resource localization
//!
//! Downloads a single embedded resource (image, stylesheet, script or video)
//! into a page directory under a name derived from its URL, so that the saved
//! page can reference it with a plain relative filename.

use crate::crawler::fetcher::{fetch_with_retry, FetchError, RetryPolicy};
use crate::url::{frontier_key, url_hash};
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Kinds of embedded resources the mirror knows how to localize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    Style,
    Script,
    Video,
}

impl ResourceKind {
    /// Prefix of the local filename
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Style => "style",
            Self::Script => "script",
            Self::Video => "video",
        }
    }

    /// Extension used when none can be taken from the URL
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Image => "jpg",
            Self::Style => "css",
            Self::Script => "js",
            Self::Video => "mp4",
        }
    }

    fn known_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => &[
                "jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "bmp", "ico",
            ],
            Self::Style => &["css"],
            Self::Script => &["js", "mjs"],
            Self::Video => &["mp4", "webm", "ogv", "ogg", "mov", "m4v"],
        }
    }

    /// Infers the file extension from the URL path suffix
    ///
    /// Only extensions that make sense for the kind are accepted; anything
    /// else falls back to [`ResourceKind::default_extension`].
    pub fn extension_for(&self, url: &Url) -> &'static str {
        let suffix = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        suffix
            .and_then(|ext| {
                self.known_extensions()
                    .iter()
                    .copied()
                    .find(|known| *known == ext)
            })
            .unwrap_or_else(|| self.default_extension())
    }

    /// Returns every resource kind
    pub fn all() -> [Self; 4] {
        [Self::Image, Self::Style, Self::Script, Self::Video]
    }
}

/// Computes the deterministic local filename of a resource
///
/// The name is `{prefix}_{hash}.{extension}`, where the hash covers the
/// resource URL without its fragment.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::{local_filename, ResourceKind};
/// use url::Url;
///
/// let url = Url::parse("http://example.test/a.gif").unwrap();
/// let name = local_filename(&url, ResourceKind::Image);
/// assert!(name.starts_with("image_"));
/// assert!(name.ends_with(".gif"));
/// ```
pub fn local_filename(url: &Url, kind: ResourceKind) -> String {
    format!(
        "{}_{}.{}",
        kind.prefix(),
        url_hash(&frontier_key(url)),
        kind.extension_for(url)
    )
}

/// Errors that leave a resource unlocalized
#[derive(Debug, Error)]
pub enum LocalizeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Downloads resources with bounded retries
#[derive(Debug, Clone)]
pub struct ResourceLocalizer {
    client: Client,
    policy: RetryPolicy,
}

impl ResourceLocalizer {
    /// Creates a localizer sharing the crawler's HTTP client
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetches `resource` and writes it into `destination`
    ///
    /// On success returns the local filename, relative to `destination`. An
    /// existing file with the same name is overwritten, so localizing the same
    /// URL twice into the same directory leaves one identical file.
    ///
    /// # Errors
    ///
    /// Returns `LocalizeError` once every attempt failed or the file could
    /// not be written. The caller must keep the original reference.
    pub async fn localize(
        &self,
        resource: &Url,
        destination: &Path,
        kind: ResourceKind,
    ) -> Result<String, LocalizeError> {
        let filename = local_filename(resource, kind);
        let fetched = fetch_with_retry(&self.client, resource.as_str(), &self.policy).await?;

        let path = destination.join(&filename);
        tokio::fs::write(&path, &fetched.bytes)
            .await
            .map_err(|source| LocalizeError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            "Localized {} {} -> {} ({} bytes)",
            kind.prefix(),
            resource,
            filename,
            fetched.bytes.len()
        );

        Ok(filename)
    }
}
