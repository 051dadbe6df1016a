//! Page transformation: resource localization and link rewriting
//!
//! A page goes through two `lol_html` passes:
//!
//! 1. A scanning pass turns the markup into a flat list of [`Tag`]s, in
//!    document order.
//! 2. After resources were downloaded and links planned, a rewriting pass
//!    replaces reference attributes that have a local counterpart.
//!
//! Both passes read attribute values the same way, so the raw value seen
//! during scanning is the key used during rewriting. A reference that is not
//! localized ends up absolute, so the saved copy never points at a local file
//! that does not exist.

use crate::config::ContentCategory;
use crate::crawler::localizer::{ResourceKind, ResourceLocalizer};
use crate::output::local_link_href;
use crate::url::{frontier_key, is_crawlable, is_same_origin, resolve_against};
use crate::MirrorError;
use futures::stream::{self, StreamExt};
use lol_html::html_content::Element;
use lol_html::errors::RewritingError;
use lol_html::{element, HandlerResult, HtmlRewriter, Settings};
use scraper::{Html, Selector};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use url::Url;

const IMAGE_SELECTOR: &str = "img[src]";
const STYLESHEET_SELECTOR: &str = "link[rel~=\"stylesheet\" i][href]";
const SCRIPT_SELECTOR: &str = "script[src]";
const VIDEO_SELECTOR: &str = "video[src]";
const VIDEO_SOURCE_SELECTOR: &str = "video source[src]";
const ANCHOR_SELECTOR: &str = "a[href]";

/// Markup element relevant to mirroring, with its raw reference attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// `<img src>`
    Image { src: String },
    /// `<link rel="stylesheet" href>`
    Stylesheet { href: String },
    /// `<script src>`
    Script { src: String },
    /// `<video src>` or `<source src>` inside a `<video>`
    VideoSource { src: String },
    /// `<a href>`
    Anchor { href: String },
}

impl Tag {
    /// Resource kind of an embedded-resource tag, None for anchors
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Image { .. } => Some(ResourceKind::Image),
            Self::Stylesheet { .. } => Some(ResourceKind::Style),
            Self::Script { .. } => Some(ResourceKind::Script),
            Self::VideoSource { .. } => Some(ResourceKind::Video),
            Self::Anchor { .. } => None,
        }
    }

    /// The raw reference attribute value
    pub fn reference(&self) -> &str {
        match self {
            Self::Image { src }
            | Self::Script { src }
            | Self::VideoSource { src } => src,
            Self::Stylesheet { href } | Self::Anchor { href } => href,
        }
    }
}

/// An embedded resource found on a page
#[derive(Debug, Clone)]
pub struct ResourceReference {
    /// Page the resource was found on
    pub page_url: Url,
    /// Attribute value as written in the markup
    pub raw: String,
    /// Absolute resource URL
    pub url: Url,
    pub kind: ResourceKind,
}

/// A crawlable link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLink {
    /// Absolute URL without fragment
    pub url: Url,
    /// Frontier key of the URL
    pub key: String,
    /// Whether the link shares its host with the page
    pub same_origin: bool,
}

/// Links of a page, as planned before rewriting
#[derive(Debug, Clone, Default)]
pub struct LinkPlan {
    /// Crawlable links, deduplicated by frontier key, in document order
    pub outbound: Vec<OutboundLink>,
    /// Raw href → replacement: the local href for same-origin links, the
    /// absolute URL for cross-origin links written in relative form
    pub rewrites: HashMap<String, String>,
    /// Frontier keys of the same-origin targets that were rewritten
    pub local_targets: Vec<String>,
}

/// Result of transforming one page
#[derive(Debug, Clone)]
pub struct TransformedPage {
    /// Rewritten markup
    pub html: String,
    /// Crawlable links found on the page
    pub outbound_links: Vec<OutboundLink>,
    /// Frontier keys of same-origin targets whose links were rewritten
    pub local_targets: Vec<String>,
    /// Distinct resources written to disk
    pub resources_localized: usize,
    /// Distinct resources left pointing at their remote URL
    pub resources_failed: usize,
}

/// Extracts the page title from the HTML document
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Scans markup into the tags relevant to mirroring, in document order
///
/// The scanner is as permissive as the HTML parser of a browser; malformed
/// markup yields whatever tags could be recognized.
pub fn scan_tags(html: &str) -> Result<Vec<Tag>, MirrorError> {
    let tags = RefCell::new(Vec::new());

    let mut scanner = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!(IMAGE_SELECTOR, |el| {
                    if let Some(src) = el.get_attribute("src") {
                        tags.borrow_mut().push(Tag::Image { src });
                    }
                    Ok(())
                }),
                element!(STYLESHEET_SELECTOR, |el| {
                    if let Some(href) = el.get_attribute("href") {
                        tags.borrow_mut().push(Tag::Stylesheet { href });
                    }
                    Ok(())
                }),
                element!(SCRIPT_SELECTOR, |el| {
                    if let Some(src) = el.get_attribute("src") {
                        tags.borrow_mut().push(Tag::Script { src });
                    }
                    Ok(())
                }),
                element!(VIDEO_SELECTOR, |el| {
                    if let Some(src) = el.get_attribute("src") {
                        tags.borrow_mut().push(Tag::VideoSource { src });
                    }
                    Ok(())
                }),
                element!(VIDEO_SOURCE_SELECTOR, |el| {
                    if let Some(src) = el.get_attribute("src") {
                        tags.borrow_mut().push(Tag::VideoSource { src });
                    }
                    Ok(())
                }),
                element!(ANCHOR_SELECTOR, |el| {
                    if let Some(href) = el.get_attribute("href") {
                        tags.borrow_mut().push(Tag::Anchor { href });
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    scanner
        .write(html.as_bytes())
        .map_err(|e| rewrite_error("scan", e))?;
    scanner.end().map_err(|e| rewrite_error("scan", e))?;

    Ok(tags.into_inner())
}

fn rewrite_error(stage: &'static str, e: RewritingError) -> MirrorError {
    MirrorError::Rewrite {
        stage,
        message: e.to_string(),
    }
}

/// Resolves a raw attribute value to a crawlable absolute URL
///
/// Returns None for references that cannot be resolved or are not http(s):
/// `javascript:`, `mailto:`, `tel:`, `data:` and the like.
fn resolve_reference(page_url: &Url, raw: &str) -> Option<Url> {
    // Attribute values come raw from the markup, character references included
    let reference = html_escape::decode_html_entities(raw);
    if reference.trim().is_empty() {
        return None;
    }

    match resolve_against(page_url, &reference) {
        Ok(url) if is_crawlable(&url) => Some(url),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Skipping reference {}: {}", raw, e);
            None
        }
    }
}

/// Collects the resources to localize, honoring the content-category filter
pub fn plan_resources(
    tags: &[Tag],
    page_url: &Url,
    category: ContentCategory,
) -> Vec<ResourceReference> {
    let mut seen = HashSet::new();

    tags.iter()
        .filter_map(|tag| tag.resource_kind().map(|kind| (kind, tag.reference())))
        .filter(|(kind, _)| category.includes(*kind))
        .filter(|(kind, raw)| seen.insert((*kind, raw.to_string())))
        .filter_map(|(kind, raw)| {
            resolve_reference(page_url, raw).map(|url| ResourceReference {
                page_url: page_url.clone(),
                raw: raw.to_string(),
                url,
                kind,
            })
        })
        .collect()
}

/// Plans outbound links and same-origin rewrites for a page saved under `slug`
pub fn plan_links(tags: &[Tag], page_url: &Url, slug: &str) -> LinkPlan {
    let mut plan = LinkPlan::default();
    let mut seen_keys = HashSet::new();
    let mut seen_targets = HashSet::new();

    for tag in tags {
        let Tag::Anchor { href } = tag else {
            continue;
        };

        // Same-page anchors stay as they are
        if href.trim_start().starts_with('#') {
            continue;
        }

        let Some(target) = resolve_reference(page_url, href) else {
            continue;
        };

        let key = frontier_key(&target);
        let same_origin = is_same_origin(page_url, &target);

        if same_origin {
            plan.rewrites
                .entry(href.clone())
                .or_insert_with(|| local_link_href(slug, &target));
            if seen_targets.insert(key.clone()) {
                plan.local_targets.push(key.clone());
            }
        } else if href.as_str() != target.as_str() {
            plan.rewrites
                .entry(href.clone())
                .or_insert_with(|| target.to_string());
        }

        if seen_keys.insert(key.clone()) {
            let mut url = target;
            url.set_fragment(None);
            plan.outbound.push(OutboundLink {
                url,
                key,
                same_origin,
            });
        }
    }

    plan
}

/// Applies resource and link replacements to the markup
///
/// Attributes without a replacement are left byte-for-byte unchanged.
pub fn rewrite_html(
    html: &str,
    resources: &HashMap<(ResourceKind, String), String>,
    links: &HashMap<String, String>,
) -> Result<String, MirrorError> {
    let mut output = Vec::with_capacity(html.len());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!(IMAGE_SELECTOR, |el| {
                    replace_resource(el, "src", ResourceKind::Image, resources)
                }),
                element!(STYLESHEET_SELECTOR, |el| {
                    replace_resource(el, "href", ResourceKind::Style, resources)
                }),
                element!(SCRIPT_SELECTOR, |el| {
                    replace_resource(el, "src", ResourceKind::Script, resources)
                }),
                element!(VIDEO_SELECTOR, |el| {
                    replace_resource(el, "src", ResourceKind::Video, resources)
                }),
                element!(VIDEO_SOURCE_SELECTOR, |el| {
                    replace_resource(el, "src", ResourceKind::Video, resources)
                }),
                element!(ANCHOR_SELECTOR, |el| {
                    if let Some(href) = el.get_attribute("href") {
                        if let Some(local) = links.get(&href) {
                            el.set_attribute("href", local)?;
                        }
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| rewrite_error("rewrite", e))?;
    rewriter.end().map_err(|e| rewrite_error("rewrite", e))?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn replace_resource(
    el: &mut Element<'_, '_>,
    attribute: &str,
    kind: ResourceKind,
    resources: &HashMap<(ResourceKind, String), String>,
) -> HandlerResult {
    if let Some(value) = el.get_attribute(attribute) {
        if let Some(local) = resources.get(&(kind, value)) {
            el.set_attribute(attribute, local)?;
        }
    }
    Ok(())
}

/// Localizes resources and rewrites links of fetched pages
#[derive(Debug, Clone)]
pub struct PageTransformer {
    localizer: ResourceLocalizer,
    category: ContentCategory,
    resource_concurrency: usize,
}

impl PageTransformer {
    pub fn new(
        localizer: ResourceLocalizer,
        category: ContentCategory,
        resource_concurrency: usize,
    ) -> Self {
        Self {
            localizer,
            category,
            resource_concurrency: resource_concurrency.max(1),
        }
    }

    /// Transforms a page that will be saved under `destination` (named `slug`)
    ///
    /// Every recognized resource enabled by the category filter is downloaded
    /// into `destination` and rewritten to its local filename. A resource that
    /// could not be downloaded is rewritten to its absolute URL instead.
    /// Same-origin links are rewritten to `../{slug}/{hash}.html`, cross-origin
    /// links stay absolute. If the markup cannot be processed the raw HTML is
    /// returned unchanged so that the page is still saved.
    pub async fn transform(
        &self,
        page_url: &Url,
        raw_html: &str,
        destination: &Path,
        slug: &str,
    ) -> TransformedPage {
        let tags = match scan_tags(raw_html) {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!("Could not scan {}: {}; saving it unchanged", page_url, e);
                Vec::new()
            }
        };

        let references = plan_resources(&tags, page_url, self.category);
        let links = plan_links(&tags, page_url, slug);

        let localized = self.localize_all(&references, destination).await;
        let resources_failed = localized.values().filter(|name| name.is_none()).count();
        let resources_localized = localized.len() - resources_failed;

        let resource_rewrites: HashMap<(ResourceKind, String), String> = references
            .iter()
            .filter_map(|reference| {
                let id = (reference.kind, frontier_key(&reference.url));
                let replacement = match localized.get(&id) {
                    Some(Some(name)) => name.clone(),
                    _ if reference.raw == reference.url.as_str() => return None,
                    _ => reference.url.to_string(),
                };
                Some(((reference.kind, reference.raw.clone()), replacement))
            })
            .collect();

        let html = if resource_rewrites.is_empty() && links.rewrites.is_empty() {
            raw_html.to_string()
        } else {
            match rewrite_html(raw_html, &resource_rewrites, &links.rewrites) {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Could not rewrite {}: {}; saving it unchanged", page_url, e);
                    raw_html.to_string()
                }
            }
        };

        tracing::debug!(
            "Transformed {}: {} resources localized, {} left remote, {} links",
            page_url,
            resources_localized,
            resources_failed,
            links.outbound.len()
        );

        TransformedPage {
            html,
            outbound_links: links.outbound,
            local_targets: links.local_targets,
            resources_localized,
            resources_failed,
        }
    }

    /// Downloads each distinct resource once, a bounded number at a time
    ///
    /// Returns the local filename per (kind, frontier key), None on failure.
    async fn localize_all(
        &self,
        references: &[ResourceReference],
        destination: &Path,
    ) -> HashMap<(ResourceKind, String), Option<String>> {
        let mut unique: HashMap<(ResourceKind, String), ResourceReference> = HashMap::new();
        for reference in references {
            unique
                .entry((reference.kind, frontier_key(&reference.url)))
                .or_insert_with(|| reference.clone());
        }

        stream::iter(unique)
            .map(|(id, reference)| {
                let localizer = self.localizer.clone();
                let destination = destination.to_path_buf();
                async move {
                    match localizer
                        .localize(&reference.url, &destination, reference.kind)
                        .await
                    {
                        Ok(name) => (id, Some(name)),
                        Err(e) => {
                            tracing::warn!(
                                "Could not save {} {} for {}: {}",
                                reference.kind.prefix(),
                                reference.url,
                                reference.page_url,
                                e
                            );
                            (id, None)
                        }
                    }
                }
            })
            .buffer_unordered(self.resource_concurrency)
            .collect()
            .await
    }
}
