//! Directory slugs for mirrored pages

use crate::url::{frontier_key, short_hash};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Longest slug derived from a title, in characters
const MAX_SLUG_CHARS: usize = 80;

/// Derives the directory name of a page from its title
///
/// Words of the title are stripped down to alphanumeric characters, `_` and
/// `-`, then joined with `-`. When the title is missing or nothing survives
/// the cleaning, the slug is `page-{hash}` of the page URL, so it is never
/// empty and stays the same across runs.
///
/// # Examples
///
/// ```
/// use site_mirror::output::derive_slug;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(derive_slug(Some("Hello, World!"), &url), "Hello-World");
/// assert!(derive_slug(None, &url).starts_with("page-"));
/// ```
pub fn derive_slug(title: Option<&str>, page_url: &Url) -> String {
    let cleaned = title.map(clean_title).unwrap_or_default();
    if cleaned.is_empty() {
        format!("page-{}", short_hash(&frontier_key(page_url)))
    } else {
        cleaned
    }
}

fn clean_title(title: &str) -> String {
    let slug = title
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    slug.chars()
        .take(MAX_SLUG_CHARS)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// Tracks which page owns which slug during a run
///
/// Two pages with the same title would otherwise share a directory and
/// overwrite each other's `content.html`. The first page keeps the plain slug,
/// later ones get a `-{hash}` suffix of their own URL.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    owners: Mutex<HashMap<String, String>>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `slug` for the page identified by `page_key`
    ///
    /// Returns the slug the page must use. Claiming again with the same key
    /// returns the same slug.
    pub fn claim(&self, slug: String, page_key: &str) -> String {
        let mut owners = self.owners.lock().unwrap_or_else(PoisonError::into_inner);

        match owners.get(&slug) {
            None => {
                owners.insert(slug.clone(), page_key.to_string());
                slug
            }
            Some(owner) if owner == page_key => slug,
            Some(_) => {
                let alternative = format!("{}-{}", slug, short_hash(page_key));
                tracing::debug!(
                    "Slug {} already taken, using {} for {}",
                    slug,
                    alternative,
                    page_key
                );
                owners.insert(alternative.clone(), page_key.to_string());
                alternative
            }
        }
    }

    /// Number of slugs claimed so far
    pub fn len(&self) -> usize {
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
