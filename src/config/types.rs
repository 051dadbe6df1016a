use crate::crawler::{ResourceKind, RetryPolicy};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Site-Mirror
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below and can be overridden from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    /// URLs the crawl starts from
    pub seeds: Vec<String>,
}

impl Config {
    /// Builds the retry policy shared by page and resource fetches
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of pages fetched and transformed concurrently
    pub workers: u32,

    /// Maximum number of pages dispatched during a run (unbounded if unset)
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,

    /// Maximum number of link hops from a seed (unbounded if unset)
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Whether links to other hosts are crawled as well
    #[serde(rename = "follow-external")]
    pub follow_external: bool,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Number of resources of one page downloaded concurrently
    #[serde(rename = "resource-concurrency")]
    pub resource_concurrency: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_pages: None,
            max_depth: None,
            follow_external: false,
            request_timeout_secs: 30,
            resource_concurrency: 8,
        }
    }
}

/// Retry behavior for network fetches
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts per fetch, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteMirror".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl fmt::Display for UserAgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory under which every mirrored page gets its own folder
    pub root: String,

    /// Which embedded resources are downloaded
    pub category: ContentCategory,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "mirror".to_string(),
            category: ContentCategory::All,
        }
    }
}

/// Content-category filter selecting which resource kinds are localized
///
/// Tags of excluded kinds are left untouched in the saved page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContentCategory {
    /// Images, stylesheets, scripts and videos
    #[default]
    All,
    /// Images only
    Photos,
    /// Video sources only
    Videos,
    /// Stylesheets and scripts only
    PageStructure,
    /// Images and video sources
    PhotosAndVideos,
}

impl ContentCategory {
    /// Returns true if resources of the given kind are downloaded
    pub fn includes(&self, kind: ResourceKind) -> bool {
        match self {
            Self::All => true,
            Self::Photos => kind == ResourceKind::Image,
            Self::Videos => kind == ResourceKind::Video,
            Self::PageStructure => matches!(kind, ResourceKind::Style | ResourceKind::Script),
            Self::PhotosAndVideos => matches!(kind, ResourceKind::Image | ResourceKind::Video),
        }
    }

    /// Kebab-case name, as used in the config file and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::PageStructure => "page-structure",
            Self::PhotosAndVideos => "photos-and-videos",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_includes_everything() {
        for kind in ResourceKind::all() {
            assert!(ContentCategory::All.includes(kind));
        }
    }

    #[test]
    fn test_photos_only_images() {
        assert!(ContentCategory::Photos.includes(ResourceKind::Image));
        assert!(!ContentCategory::Photos.includes(ResourceKind::Video));
        assert!(!ContentCategory::Photos.includes(ResourceKind::Style));
        assert!(!ContentCategory::Photos.includes(ResourceKind::Script));
    }

    #[test]
    fn test_page_structure_styles_and_scripts() {
        assert!(ContentCategory::PageStructure.includes(ResourceKind::Style));
        assert!(ContentCategory::PageStructure.includes(ResourceKind::Script));
        assert!(!ContentCategory::PageStructure.includes(ResourceKind::Image));
        assert!(!ContentCategory::PageStructure.includes(ResourceKind::Video));
    }

    #[test]
    fn test_photos_and_videos() {
        assert!(ContentCategory::PhotosAndVideos.includes(ResourceKind::Image));
        assert!(ContentCategory::PhotosAndVideos.includes(ResourceKind::Video));
        assert!(!ContentCategory::PhotosAndVideos.includes(ResourceKind::Script));
    }

    #[test]
    fn test_user_agent_display() {
        let ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
        };
        assert_eq!(ua.to_string(), "TestBot/1.0");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.output.category, ContentCategory::All);
        assert!(config.crawler.max_pages.is_none());
        assert!(!config.crawler.follow_external);
    }
}
