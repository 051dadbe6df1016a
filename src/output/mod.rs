//! Output module for writing the mirror to disk
//!
//! This module owns everything that ends up in the output root:
//! - Directory slugs derived from page titles
//! - Page files, localized resources' directories and link stubs
//! - Run statistics

mod slug;
mod stats;
mod writer;

pub use slug::{derive_slug, SlugRegistry};
pub use stats::{print_statistics, CrawlStatistics};
pub use writer::{local_link_href, stub_filename, MirrorWriter, PageRecord, PAGE_FILE};
