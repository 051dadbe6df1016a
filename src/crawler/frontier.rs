//! Crawl frontier: the FIFO queue of pages to fetch and the set of known URLs
//!
//! A URL becomes known the moment it is enqueued, so it can never be queued
//! twice during a run, whatever happens to it afterwards.

use crate::state::PageState;
use crate::url::frontier_key;
use crate::MirrorError;
use std::collections::{HashMap, VecDeque};
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL to fetch, without fragment
    pub url: Url,

    /// Frontier key of the URL
    pub key: String,

    /// Link hops from the seed that led here
    pub depth: u32,
}

/// Breadth-first frontier
///
/// Owned by the coordinator loop; workers never touch it.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<QueuedUrl>,
    known: HashMap<String, PageState>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `url` unless its key is already known
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and is now pending
    /// * `false` - The URL was seen before and was ignored
    pub fn enqueue(&mut self, url: Url, depth: u32) -> bool {
        let key = frontier_key(&url);
        if self.known.contains_key(&key) {
            return false;
        }

        let mut url = url;
        url.set_fragment(None);

        self.known.insert(key.clone(), PageState::Pending);
        self.pending.push_back(QueuedUrl { url, key, depth });
        true
    }

    /// Takes the oldest pending URL
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.pending.pop_front()
    }

    /// Moves a known URL to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&mut self, key: &str, next: PageState) -> Result<(), MirrorError> {
        let current = self
            .known
            .get_mut(key)
            .ok_or_else(|| MirrorError::InvalidTransition {
                url: key.to_string(),
                from: PageState::Pending,
                to: next,
            })?;

        if !current.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                url: key.to_string(),
                from: *current,
                to: next,
            });
        }

        *current = next;
        Ok(())
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.known.contains_key(key)
    }

    pub fn state_of(&self, key: &str) -> Option<PageState> {
        self.known.get(key).copied()
    }

    /// Number of URLs waiting to be fetched
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of URLs seen during the run, in any state
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn count_in_state(&self, state: PageState) -> usize {
        self.known.values().filter(|s| **s == state).count()
    }
}
