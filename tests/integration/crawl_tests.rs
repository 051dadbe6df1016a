//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, transform and write cycle into a temporary directory.

use site_mirror::config::{
    Config, ContentCategory, CrawlerConfig, OutputConfig, RetryConfig, UserAgentConfig,
};
use site_mirror::crawler::{local_filename, Coordinator, ResourceKind};
use site_mirror::output::{derive_slug, PAGE_FILE};
use site_mirror::run_mirror;
use site_mirror::state::PageState;
use site_mirror::url::{frontier_key, url_hash};
use std::path::Path;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `root`
fn create_test_config(root: &Path, seeds: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 1,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 3,
            delay_ms: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestMirror".to_string(),
            crawler_version: "1.0.0".to_string(),
        },
        output: OutputConfig {
            root: root.to_string_lossy().into_owned(),
            category: ContentCategory::All,
        },
        seeds,
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.to_string())
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_with_image_and_link() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body>
           <img src="a.jpg"><a href="/b">B</a>
           </body></html>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/a.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page(
            "<html><head><title>Page B</title></head><body>B</body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", base)]);
    let stats = run_mirror(config).await.expect("mirror failed");

    assert_eq!(stats.pages_in_state(PageState::Saved), 2);
    assert_eq!(stats.resources_localized, 1);

    let home = tmp.path().join("Home");
    let content = std::fs::read_to_string(home.join(PAGE_FILE)).unwrap();

    let image_url = Url::parse(&format!("{}/a.jpg", base)).unwrap();
    let image_name = local_filename(&image_url, ResourceKind::Image);
    assert!(image_name.starts_with("image_"));
    assert!(image_name.ends_with(".jpg"));
    assert_eq!(std::fs::read(home.join(&image_name)).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    assert!(content.contains(&format!(r#"src="{}""#, image_name)));

    let b_url = Url::parse(&format!("{}/b", base)).unwrap();
    let b_hash = url_hash(&frontier_key(&b_url));
    assert!(content.contains(&format!(r#"href="../Home/{}.html""#, b_hash)));

    assert!(tmp.path().join("Page-B").join(PAGE_FILE).is_file());

    // The rewritten link resolves offline through its stub
    let stub = std::fs::read_to_string(home.join(format!("{}.html", b_hash))).unwrap();
    assert!(stub.contains("../Page-B/content.html"));
    assert_eq!(stats.link_stubs, 1);
}

#[tokio::test]
async fn test_failed_resource_keeps_remote_reference() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Gallery</title></head><body><img src="/broken.png"></body></html>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", server.uri())]);
    let stats = run_mirror(config).await.expect("mirror failed");

    assert_eq!(stats.pages_in_state(PageState::Saved), 1);
    assert_eq!(stats.resources_failed, 1);

    let gallery = tmp.path().join("Gallery");
    let content = std::fs::read_to_string(gallery.join(PAGE_FILE)).unwrap();
    assert!(content.contains(&format!(r#"<img src="{}/broken.png">"#, server.uri())));

    let files: Vec<_> = std::fs::read_dir(&gallery)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(files, vec![std::ffi::OsString::from(PAGE_FILE)]);
}

#[tokio::test]
async fn test_untitled_page_gets_hash_slug() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<html><head><title></title></head><body>hi</body></html>").await;

    let seed = format!("{}/", server.uri());
    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![seed.clone()]);
    run_mirror(config).await.expect("mirror failed");

    let slug = derive_slug(None, &Url::parse(&seed).unwrap());
    assert!(slug.starts_with("page-"));
    assert!(tmp.path().join(&slug).join(PAGE_FILE).is_file());
}

#[tokio::test]
async fn test_duplicate_seeds_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<html><head><title>Once</title></head></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let tmp = TempDir::new().unwrap();
    let config = create_test_config(
        tmp.path(),
        vec![seed.clone(), seed.clone(), format!("{}#top", seed)],
    );

    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.urls_enqueued, 1);
    assert_eq!(stats.total_pages(), 1);
}

#[tokio::test]
async fn test_breadth_first_order() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#).await;
    mount_page(&server, "/a", r#"<a href="/c">C</a><a href="/">Home</a>"#).await;
    mount_page(&server, "/b", r#"<a href="/d">D</a><a href="/a">A</a>"#).await;
    mount_page(&server, "/c", "<p>c</p>").await;
    mount_page(&server, "/d", "<p>d</p>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", server.uri())]);
    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.pages_in_state(PageState::Saved), 5);

    let requests = server.received_requests().await.unwrap();
    let order: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(order, vec!["/", "/a", "/b", "/c", "/d"]);
}

#[tokio::test]
async fn test_unreachable_page_does_not_stop_crawl() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<title>Root</title><a href="/missing">gone</a><a href="/ok">ok</a>"#,
    )
    .await;
    mount_page(&server, "/ok", "<title>Fine</title>").await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", server.uri())]);
    let stats = run_mirror(config).await.expect("mirror failed");

    assert_eq!(stats.pages_in_state(PageState::Failed), 1);
    assert_eq!(stats.pages_in_state(PageState::Saved), 2);
    assert!(tmp.path().join("Fine").join(PAGE_FILE).is_file());

    // Only saved targets get a stub
    assert_eq!(stats.link_stubs, 1);
}

#[tokio::test]
async fn test_non_html_page_skipped() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<title>Docs</title><a href="/manual.pdf">PDF</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/manual.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(vec![0x25, 0x50, 0x44, 0x46]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", server.uri())]);
    let stats = run_mirror(config).await.expect("mirror failed");

    assert_eq!(stats.pages_in_state(PageState::Saved), 1);
    assert_eq!(stats.pages_in_state(PageState::Skipped), 1);
}

#[tokio::test]
async fn test_cross_origin_links_followed_only_when_enabled() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;

    // A different port on the same host is still the same origin for the
    // mirror, so the external site is addressed through another host name
    let external_url = Url::parse(&external.uri()).unwrap();
    let external_link = format!(
        "http://localhost:{}/elsewhere",
        external_url.port().unwrap()
    );

    mount_page(
        &site,
        "/",
        &format!(r#"<title>Start</title><a href="{}">out</a>"#, external_link),
    )
    .await;
    mount_page(&external, "/elsewhere", "<title>Elsewhere</title>").await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(tmp.path(), vec![format!("{}/", site.uri())]);
    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.total_pages(), 1);
    assert!(external.received_requests().await.unwrap().is_empty());

    let content = std::fs::read_to_string(tmp.path().join("Start").join(PAGE_FILE)).unwrap();
    assert!(content.contains(&external_link));

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path(), vec![format!("{}/", site.uri())]);
    config.crawler.follow_external = true;
    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.pages_in_state(PageState::Saved), 2);
    assert!(tmp.path().join("Elsewhere").join(PAGE_FILE).is_file());
}

#[tokio::test]
async fn test_page_and_depth_limits() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/1">1</a><a href="/2">2</a>"#).await;
    mount_page(&server, "/1", r#"<a href="/3">3</a>"#).await;
    mount_page(&server, "/2", "<p>2</p>").await;
    mount_page(&server, "/3", "<p>3</p>").await;

    let seed = format!("{}/", server.uri());

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path(), vec![seed.clone()]);
    config.crawler.max_pages = Some(2);
    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.total_pages(), 2);
    assert_eq!(stats.urls_left_pending, 2);

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path(), vec![seed]);
    config.crawler.max_depth = Some(1);
    let stats = run_mirror(config).await.expect("mirror failed");
    assert_eq!(stats.total_pages(), 3);
    assert_eq!(stats.urls_left_pending, 0);
}

#[tokio::test]
async fn test_concurrent_workers_fetch_each_page_once() {
    let server = MockServer::start().await;

    let links: String = (1..=6)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &format!("<title>Hub</title>{}", links)).await;

    for i in 1..=6 {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html_page(&format!(
                "<title>Page {}</title><a href=\"/\">hub</a>{}",
                i, links
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(tmp.path(), vec![format!("{}/", server.uri())]);
    config.crawler.workers = 4;

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let stats = coordinator.run().await.expect("mirror failed");

    assert_eq!(stats.pages_in_state(PageState::Saved), 7);
    assert_eq!(stats.urls_enqueued, 7);
    for i in 1..=6 {
        let dir = tmp.path().join(format!("Page-{}", i));
        assert!(dir.join(PAGE_FILE).is_file());
    }
}
