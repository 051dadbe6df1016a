//! Pre-scan of a seed page
//!
//! Reports which content categories a page has to offer before committing to
//! a full mirror, so the operator can pick a `--category`.

use crate::config::ContentCategory;
use crate::crawler::fetcher::{fetch_page, FetchResult, RetryPolicy};
use reqwest::Client;
use scraper::{Html, Selector};

/// Detects the content categories present in a page's markup
///
/// `page-structure` is always reported; `photos` when the page has an
/// `<img>`, `videos` when it has a `<video>`.
pub fn detect_categories(html: &str) -> Vec<ContentCategory> {
    let document = Html::parse_document(html);
    let mut categories = Vec::new();

    if has_element(&document, "img") {
        categories.push(ContentCategory::Photos);
    }
    if has_element(&document, "video") {
        categories.push(ContentCategory::Videos);
    }
    categories.push(ContentCategory::PageStructure);

    categories
}

fn has_element(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}

/// Fetches `url` once and reports its content categories
///
/// A page that cannot be fetched, or is not HTML, yields an empty list.
pub async fn prescan(client: &Client, url: &str) -> Vec<ContentCategory> {
    match fetch_page(client, url, &RetryPolicy::single_attempt()).await {
        FetchResult::Success { body, .. } => detect_categories(&body),
        FetchResult::ContentMismatch { content_type } => {
            tracing::warn!("Pre-scan of {}: not an HTML page ({})", url, content_type);
            Vec::new()
        }
        FetchResult::Failed { error } => {
            tracing::warn!("Pre-scan of {} failed: {}", url, error);
            Vec::new()
        }
    }
}
