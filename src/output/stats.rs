//! Statistics gathered during a mirror run
//!
//! This module provides the counters the coordinator keeps while crawling and
//! the end-of-run report printed by the command-line tool.

use crate::state::PageState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (None while running)
    pub finished_at: Option<DateTime<Utc>>,

    /// Count of pages by terminal state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Distinct resources written to disk
    pub resources_localized: u64,

    /// Distinct resources left pointing at their remote URL
    pub resources_failed: u64,

    /// URLs added to the frontier, seeds included
    pub urls_enqueued: u64,

    /// URLs still pending when the run stopped (page limit or cancellation)
    pub urls_left_pending: u64,

    /// Redirect stubs written for rewritten links
    pub link_stubs: u64,

    /// Whether the run was cancelled before the frontier was exhausted
    pub cancelled: bool,
}

impl CrawlStatistics {
    /// Starts a new set of statistics at the current time
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_by_state: HashMap::new(),
            resources_localized: 0,
            resources_failed: 0,
            urls_enqueued: 0,
            urls_left_pending: 0,
            link_stubs: 0,
            cancelled: false,
        }
    }

    /// Records a page reaching a terminal state
    pub fn record_page(&mut self, state: PageState) {
        *self.pages_by_state.entry(state).or_insert(0) += 1;
    }

    /// Number of pages that reached `state`
    pub fn pages_in_state(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Total number of pages processed
    pub fn total_pages(&self) -> u64 {
        self.pages_by_state.values().sum()
    }

    /// Marks the run as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration of the run, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::start()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Mirror Statistics ===\n");

    println!("Run:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    if stats.cancelled {
        println!("  Cancelled before the frontier was exhausted");
    }
    println!();

    println!("Pages:");
    println!("  Total processed: {}", stats.total_pages());
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));
    for (state, count) in state_counts {
        let percentage = if stats.total_pages() > 0 {
            (*count as f64 / stats.total_pages() as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!("  URLs enqueued: {}", stats.urls_enqueued);
    if stats.urls_left_pending > 0 {
        println!("  URLs left pending: {}", stats.urls_left_pending);
    }
    println!();

    println!("Resources:");
    println!("  Localized: {}", stats.resources_localized);
    println!("  Left remote: {}", stats.resources_failed);
    println!("  Link stubs: {}", stats.link_stubs);
}
