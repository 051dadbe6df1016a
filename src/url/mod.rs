//! URL handling module for Site-Mirror
//!
//! This module decides which URLs are worth crawling, resolves references
//! found in markup, derives the frontier key used for deduplication, and
//! hashes URLs into the deterministic names used on disk.

mod classify;
mod hash;
mod normalize;

// Re-export main functions
pub use classify::{is_crawlable, is_same_origin, resolve, resolve_against};
pub use hash::{short_hash, url_hash};
pub use normalize::{frontier_key, normalize_seed};
