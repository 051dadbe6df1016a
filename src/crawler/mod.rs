//! Crawler module for page fetching and mirroring
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching with bounded retries
//! - Resource localization
//! - Page transformation (scanning and rewriting markup)
//! - The breadth-first frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod localizer;
mod prescan;
mod transformer;

pub use coordinator::{run_mirror, Coordinator};
pub use fetcher::{
    build_http_client, fetch_once, fetch_page, fetch_with_retry, is_html_content_type,
    FetchError, FetchResult, FetchedBody, RetryPolicy,
};
pub use frontier::{Frontier, QueuedUrl};
pub use localizer::{local_filename, LocalizeError, ResourceKind, ResourceLocalizer};
pub use prescan::{detect_categories, prescan};
pub use transformer::{
    extract_title, plan_links, plan_resources, rewrite_html, scan_tags, LinkPlan, OutboundLink,
    PageTransformer, ResourceReference, Tag, TransformedPage,
};
