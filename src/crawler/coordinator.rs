//! Crawler coordinator - main mirror orchestration logic
//!
//! The coordinator loop is the only owner of the frontier and of the run
//! statistics. Pages are fetched, transformed and written by worker tasks on
//! a `JoinSet`; a worker only reports back what happened, and the loop
//! applies state transitions and enqueues the links it found.
//!
//! Each iteration:
//! 1. Tops up the in-flight workers from the frontier (FIFO)
//! 2. Reaps one finished worker and applies its report
//!
//! The crawl ends when the frontier is exhausted and no worker is in flight,
//! or earlier when the page limit is reached or the run is cancelled.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchResult, RetryPolicy};
use crate::crawler::frontier::{Frontier, QueuedUrl};
use crate::crawler::localizer::ResourceLocalizer;
use crate::crawler::transformer::{extract_title, OutboundLink, PageTransformer, TransformedPage};
use crate::output::{derive_slug, CrawlStatistics, MirrorWriter, PageRecord, SlugRegistry, PAGE_FILE};
use crate::state::PageState;
use crate::url::normalize_seed;
use crate::MirrorError;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a page worker needs, shared by all workers of a run
struct PageContext {
    client: Client,
    policy: RetryPolicy,
    writer: MirrorWriter,
    slugs: SlugRegistry,
    transformer: PageTransformer,
}

/// What happened to a page
enum PageOutcome {
    Saved { slug: String, page: TransformedPage },
    Failed { error: String },
    Skipped { content_type: String },
}

/// A worker's report; `outcome` is Err only for conditions that abort the run
struct PageReport {
    queued: QueuedUrl,
    outcome: Result<PageOutcome, MirrorError>,
}

/// Main mirror coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    context: Arc<PageContext>,
    frontier: Frontier,
    stats: CrawlStatistics,
    cancel: CancellationToken,
    /// Pages dispatched to workers so far
    dispatched: u32,
    /// Slug of every saved page, by frontier key
    saved_slugs: HashMap<String, String>,
    /// (source slug, target key) of every same-origin link that was rewritten
    rewritten_links: Vec<(String, String)>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Builds the HTTP client, creates the output root and enqueues the seeds.
    /// Duplicate seeds collapse into a single frontier entry.
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration, already validated
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(MirrorError)` - A seed is invalid, the client could not be
    ///   built, or the output root could not be created
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        let policy = config.retry_policy();
        let writer = MirrorWriter::new(&config.output.root)?;

        let localizer = ResourceLocalizer::new(client.clone(), policy);
        let transformer = PageTransformer::new(
            localizer,
            config.output.category,
            config.crawler.resource_concurrency as usize,
        );

        let mut frontier = Frontier::new();
        let mut stats = CrawlStatistics::start();
        for seed in &config.seeds {
            let url = normalize_seed(seed)?;
            if frontier.enqueue(url, 0) {
                stats.urls_enqueued += 1;
            } else {
                tracing::debug!("Ignoring duplicate seed {}", seed);
            }
        }

        tracing::info!(
            "Seeded frontier with {} URL(s), writing into {}",
            frontier.pending_len(),
            writer.root().display()
        );

        Ok(Self {
            context: Arc::new(PageContext {
                client,
                policy,
                writer,
                slugs: SlugRegistry::new(),
                transformer,
            }),
            config: Arc::new(config),
            frontier,
            stats,
            cancel: CancellationToken::new(),
            dispatched: 0,
            saved_slugs: HashMap::new(),
            rewritten_links: Vec::new(),
        })
    }

    /// Uses `token` to stop the run early
    ///
    /// Once cancelled, pages in flight are finished and saved, but nothing new
    /// is dispatched or enqueued.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of URLs currently waiting in the frontier
    pub fn pending_urls(&self) -> usize {
        self.frontier.pending_len()
    }

    /// Runs the main mirror loop
    ///
    /// Page-level failures are logged and recorded; only output-directory and
    /// page-write failures abort the run.
    pub async fn run(&mut self) -> Result<CrawlStatistics, MirrorError> {
        let workers = self.config.crawler.workers.max(1) as usize;
        tracing::info!("Starting mirror with {} worker(s)", workers);
        self.stats.started_at = Utc::now();

        let mut in_flight: JoinSet<PageReport> = JoinSet::new();
        let mut reaped: u64 = 0;

        loop {
            // Top up in-flight workers
            while in_flight.len() < workers && self.may_dispatch() {
                let Some(queued) = self.frontier.pop() else {
                    break;
                };

                self.frontier.transition(&queued.key, PageState::Fetching)?;
                self.dispatched += 1;
                tracing::debug!("Dispatching {} (depth {})", queued.url, queued.depth);

                let context = Arc::clone(&self.context);
                in_flight.spawn(process_page(context, queued));
            }

            // Reap one finished worker
            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            if let Err(e) = joined.map_err(MirrorError::from).and_then(|r| self.handle_report(r)) {
                tracing::error!("Aborting mirror: {}", e);
                in_flight.shutdown().await;
                return Err(e);
            }

            reaped += 1;
            if reaped % 10 == 0 {
                tracing::info!(
                    "Progress: {} pages processed, {} in flight, {} in frontier",
                    reaped,
                    in_flight.len(),
                    self.frontier.pending_len()
                );
            }
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("Mirror cancelled, {} URL(s) left pending", self.frontier.pending_len());
        } else if !self.frontier.is_empty() {
            tracing::info!(
                "Page limit reached, {} URL(s) left pending",
                self.frontier.pending_len()
            );
        }

        self.write_link_stubs().await;

        self.stats.urls_left_pending = self.frontier.pending_len() as u64;
        self.stats.cancelled = self.cancel.is_cancelled();
        self.stats.finish();

        tracing::info!(
            "Mirror completed: {} saved, {} failed, {} skipped",
            self.stats.pages_in_state(PageState::Saved),
            self.stats.pages_in_state(PageState::Failed),
            self.stats.pages_in_state(PageState::Skipped)
        );

        Ok(self.stats.clone())
    }

    /// Whether another page may be handed to a worker
    fn may_dispatch(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.config
            .crawler
            .max_pages
            .map_or(true, |limit| self.dispatched < limit)
    }

    /// Applies a worker's report to the frontier and the statistics
    fn handle_report(&mut self, report: PageReport) -> Result<(), MirrorError> {
        let PageReport { queued, outcome } = report;

        match outcome? {
            PageOutcome::Saved { slug, page } => {
                self.frontier.transition(&queued.key, PageState::Saved)?;
                self.stats.record_page(PageState::Saved);
                self.stats.resources_localized += page.resources_localized as u64;
                self.stats.resources_failed += page.resources_failed as u64;

                tracing::info!("Saved {} as {}/{}", queued.url, slug, PAGE_FILE);

                for target in page.local_targets {
                    self.rewritten_links.push((slug.clone(), target));
                }
                self.saved_slugs.insert(queued.key.clone(), slug);
                self.enqueue_links(&queued, page.outbound_links);
            }
            PageOutcome::Failed { error } => {
                self.frontier.transition(&queued.key, PageState::Failed)?;
                self.stats.record_page(PageState::Failed);
                tracing::warn!("Failed to mirror {}: {}", queued.url, error);
            }
            PageOutcome::Skipped { content_type } => {
                self.frontier.transition(&queued.key, PageState::Skipped)?;
                self.stats.record_page(PageState::Skipped);
                tracing::info!("Skipping {}: not HTML ({})", queued.url, content_type);
            }
        }

        Ok(())
    }

    /// Adds the links found on `source` to the frontier
    ///
    /// Cross-origin links are only followed when `follow-external` is set.
    fn enqueue_links(&mut self, source: &QueuedUrl, links: Vec<OutboundLink>) {
        if self.cancel.is_cancelled() {
            return;
        }

        let depth = source.depth + 1;
        if let Some(max_depth) = self.config.crawler.max_depth {
            if depth > max_depth {
                return;
            }
        }

        for link in links {
            if !link.same_origin && !self.config.crawler.follow_external {
                continue;
            }
            if self.frontier.enqueue(link.url, depth) {
                self.stats.urls_enqueued += 1;
                tracing::debug!("Enqueued {} (found on {})", link.key, source.url);
            }
        }
    }

    /// Writes a redirect stub for every rewritten link whose target was saved
    async fn write_link_stubs(&mut self) {
        let links = std::mem::take(&mut self.rewritten_links);

        for (source_slug, target_key) in links {
            let Some(target_slug) = self.saved_slugs.get(&target_key) else {
                continue;
            };

            match self
                .context
                .writer
                .write_link_stub(&source_slug, &target_key, target_slug)
                .await
            {
                Ok(_) => self.stats.link_stubs += 1,
                Err(e) => tracing::warn!("Could not write link stub for {}: {}", target_key, e),
            }
        }
    }
}

/// Worker entry point
async fn process_page(context: Arc<PageContext>, queued: QueuedUrl) -> PageReport {
    let outcome = mirror_page(&context, &queued).await;
    PageReport { queued, outcome }
}

/// Fetches, transforms and writes one page
async fn mirror_page(
    context: &PageContext,
    queued: &QueuedUrl,
) -> Result<PageOutcome, MirrorError> {
    let (final_url, body) =
        match fetch_page(&context.client, queued.url.as_str(), &context.policy).await {
            FetchResult::Success { final_url, body } => (final_url, body),
            FetchResult::ContentMismatch { content_type } => {
                return Ok(PageOutcome::Skipped { content_type })
            }
            FetchResult::Failed { error } => return Ok(PageOutcome::Failed { error }),
        };

    // References resolve against where the page actually came from
    let page_url = Url::parse(&final_url).unwrap_or_else(|_| queued.url.clone());

    let title = extract_title(&body);
    let slug = context
        .slugs
        .claim(derive_slug(title.as_deref(), &queued.url), &queued.key);
    let directory = context.writer.page_dir(&slug).await?;

    let mut page = context
        .transformer
        .transform(&page_url, &body, &directory, &slug)
        .await;

    let record = PageRecord {
        url: queued.url.clone(),
        title,
        slug: slug.clone(),
        directory,
        raw_html: body,
        rewritten_html: std::mem::take(&mut page.html),
    };
    context.writer.write_page(&record).await?;

    Ok(PageOutcome::Saved { slug, page })
}

/// Runs a complete mirror operation
///
/// # Arguments
///
/// * `config` - The mirror configuration
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Mirror completed
/// * `Err(MirrorError)` - Mirror could not start or was aborted
pub async fn run_mirror(config: Config) -> Result<CrawlStatistics, MirrorError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
