//! On-disk layout of the mirror
//!
//! ```text
//! {root}/{slug}/content.html           the rewritten page
//! {root}/{slug}/{prefix}_{hash}.{ext}  localized resources
//! {root}/{slug}/{hash}.html            link stubs redirecting to other pages
//! ```

use crate::url::{frontier_key, url_hash};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use url::Url;

/// Name of the saved page inside its directory
pub const PAGE_FILE: &str = "content.html";

/// A page that was fetched and transformed, ready to be persisted
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// URL the page was fetched from
    pub url: Url,
    /// Text of the `<title>` element, if any
    pub title: Option<String>,
    /// Directory name under the output root
    pub slug: String,
    /// Absolute path of the page directory
    pub directory: PathBuf,
    /// Markup as received
    pub raw_html: String,
    /// Markup after localization and link rewriting
    pub rewritten_html: String,
}

/// Relative href used for a same-origin link found on the page saved under `slug`
///
/// The href depends only on `slug` and the target URL, so every link to the
/// same target is rewritten identically. The target's fragment is kept.
pub fn local_link_href(slug: &str, target: &Url) -> String {
    let mut href = format!("../{}/{}", slug, stub_filename(&frontier_key(target)));
    if let Some(fragment) = target.fragment() {
        href.push('#');
        href.push_str(fragment);
    }
    href
}

/// Filename of the link stub for a target page
pub fn stub_filename(target_key: &str) -> String {
    format!("{}.html", url_hash(target_key))
}

/// Writes pages and link stubs under the output root
#[derive(Debug, Clone)]
pub struct MirrorWriter {
    root: PathBuf,
}

impl MirrorWriter {
    /// Creates the output root if needed
    ///
    /// # Errors
    ///
    /// Returns `MirrorError::OutputDir` if the directory cannot be created.
    /// This is fatal for the run.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, MirrorError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| MirrorError::OutputDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates (if needed) and returns the directory of a page
    pub async fn page_dir(&self, slug: &str) -> Result<PathBuf, MirrorError> {
        let dir = self.root.join(slug);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| MirrorError::OutputDir {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Persists the rewritten markup of a page as `content.html`
    pub async fn write_page(&self, record: &PageRecord) -> Result<PathBuf, MirrorError> {
        let path = record.directory.join(PAGE_FILE);
        tokio::fs::write(&path, record.rewritten_html.as_bytes())
            .await
            .map_err(|source| MirrorError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Writes a stub at `{source_slug}/{hash(target)}.html` redirecting to the saved target
    ///
    /// Rewritten links point at these stubs; once the target page is saved
    /// the stub forwards the browser to its `content.html`.
    pub async fn write_link_stub(
        &self,
        source_slug: &str,
        target_key: &str,
        target_slug: &str,
    ) -> Result<PathBuf, MirrorError> {
        let path = self.root.join(source_slug).join(stub_filename(target_key));
        let destination = format!("../{}/{}", target_slug, PAGE_FILE);
        let destination = html_escape::encode_double_quoted_attribute(&destination);
        let html = format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html><head><meta charset=\"utf-8\">",
                "<meta http-equiv=\"refresh\" content=\"0; url={dest}\">",
                "<title>Redirecting</title></head>\n",
                "<body><a href=\"{dest}\">{label}</a></body></html>\n"
            ),
            dest = destination,
            label = html_escape::encode_text(target_key)
        );

        tokio::fs::write(&path, html)
            .await
            .map_err(|source| MirrorError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
