//! Integration tests for the mirroring workflow
//!
//! These tests use wiremock to stand in for a WordPress site and run whole
//! batches end-to-end into a temporary output directory.

use site_mirror::config::{Config, HostKind, SourceKind};
use site_mirror::crawler::{HttpFetcher, Workflow};
use site_mirror::sitemap::{extract_sitemap_paths, find_sitemap_location};
use site_mirror::{RedirectSource, RunState};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DST_URL: &str = "https://new.example";

/// Creates a crawl-mode project for the mock site
fn crawl_config(src_url: &str, output: &Path) -> Config {
    let mut config = Config::script_mode(
        "admin", "secret", src_url, DST_URL, "404-error", "search", output,
    );
    config.name = "test-site".to_string();
    config.source.kind = SourceKind::Crawl;
    config.destination.host = HostKind::Cloudflare;
    config.redirects = RedirectSource::None;
    config.delay = 0.0;
    config.retries = 1;
    config
}

fn html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(
        &server,
        "/",
        html(
            "Home",
            &format!(
                r#"<h1>Welcome</h1>
                <a href="{base}/about/">About</a>
                <a href="{base}/about/">About again</a>
                <a href="{base}/search/">Search</a>
                <a href="{base}/wp-admin/">Admin</a>
                <a href="https://other.example/page/">Elsewhere</a>"#
            ),
        ),
    )
    .await;

    // Cycle back to the home page and a self-reference on the source host
    Mock::given(method("GET"))
        .and(path("/about/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html(
            "About",
            &format!(r#"<p>About us</p><a href="{base}/">Home</a><img src="{base}/logo.png">"#),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/search/",
        html("Search", r#"<div id="search-results"></div>"#),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/404-error/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(html("Not found", "<p>Gone</p>")))
        .mount(&server)
        .await;

    let mut config = crawl_config(&base, output.path());
    // Same canonical location as the linked /about/
    config.additional = vec![format!("{}/about", base)];

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert_eq!(summary.state, RunState::Done);
    assert!(summary.failed_stages.is_empty(), "{:?}", summary.failed_stages);
    assert_eq!(summary.saved, 4);
    assert_eq!(summary.ignored, 1);

    let out = output.path();

    // Host rewriting
    let home = std::fs::read_to_string(out.join("index.html")).unwrap();
    assert!(home.contains("https://new.example/about/"));
    assert!(!home.contains(&base));
    assert!(home.contains("https://other.example/page/"));

    // Binary content written as fetched
    assert_eq!(
        std::fs::read(out.join("logo.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );

    // Excluded locations are never written
    assert!(!out.join("wp-admin").exists());

    // 404 page
    let not_found = std::fs::read_to_string(out.join("404.html")).unwrap();
    assert!(not_found.contains("Gone"));

    // robots.txt
    let robots = std::fs::read_to_string(out.join("robots.txt")).unwrap();
    assert!(robots.starts_with("User-agent: *"));

    // Redirects: only the search rule when the plugin is disabled
    let redirects = std::fs::read_to_string(out.join("_redirects")).unwrap();
    assert_eq!(redirects, "/*\t/search/\t301\n");

    // Search index excludes the search page itself
    let lunr: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("search/lunr.json")).unwrap())
            .unwrap();
    let hrefs: Vec<&str> = lunr
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["href"].as_str().unwrap())
        .collect();
    assert_eq!(hrefs, vec!["https://new.example/about/", "https://new.example/"]);
    assert!(out.join("search/search.js").is_file());

    let search_page = std::fs::read_to_string(out.join("search/index.html")).unwrap();
    assert!(search_page.contains(r#"<script src="search.js"></script></head>"#));
}

#[tokio::test]
async fn test_dead_link_lands_in_404_page_and_fonts_are_saved() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(
        &server,
        "/",
        html(
            "Home",
            &format!(
                r#"<link rel="preload" href="{base}/fonts/site.woff2" as="font">
                <a href="{base}/gone/">Gone</a>"#
            ),
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/gone/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(html("Missing", "<p>Missing</p>")))
        .expect(1)
        .mount(&server)
        .await;

    let font: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/fonts/site.woff2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(font.clone()))
        .mount(&server)
        .await;

    let config = crawl_config(&base, output.path());
    let mut workflow = Workflow::new(config).unwrap();
    workflow.crawl_url(&format!("{}/", base)).await;
    assert_eq!(workflow.visited_count(), 3);

    let out = output.path();
    let not_found = std::fs::read_to_string(out.join("404.html")).unwrap();
    assert!(not_found.contains("Missing"));
    assert!(!out.join("gone").exists());

    assert_eq!(std::fs::read(out.join("fonts/site.woff2")).unwrap(), font);
}

#[tokio::test]
async fn test_additional_seed_on_destination_host_is_crawled_on_source() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(&server, "/", html("Home", "<p>Hello</p>")).await;
    Mock::given(method("GET"))
        .and(path("/hidden/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html("Hidden", "<p>Unlinked</p>")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = crawl_config(&base, output.path());
    config.additional = vec![format!("{}/hidden/?utm=1", DST_URL)];

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert_eq!(summary.state, RunState::Done);
    let hidden = std::fs::read_to_string(output.path().join("hidden/index.html")).unwrap();
    assert!(hidden.contains("Unlinked"));
}

#[tokio::test]
async fn test_redirect_plugin_rules_are_collected() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(&server, "/", html("Home", "<p>Hello</p>")).await;

    Mock::given(method("GET"))
        .and(path("/wp-json/redirection/v1/redirect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {"url": "/old-post/", "action_data": {"url": "/new-post/"}, "action_code": 301},
                {"url": "/old-post/", "action_data": {"url": "/other/"}, "action_code": 302},
                {"url": "/gone/", "action_data": {"url": "/"}, "action_code": 308}
            ],
            "total": 3
        })))
        .mount(&server)
        .await;

    let mut config = crawl_config(&base, output.path());
    config.redirects = RedirectSource::Redirection;

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert_eq!(summary.redirects, 2);
    let redirects = std::fs::read_to_string(output.path().join("_redirects")).unwrap();
    assert_eq!(redirects, "/old-post/\t/new-post/\t301\n/gone/\t/\t308\n");
}

#[tokio::test]
async fn test_redirect_plugin_failure_is_not_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(&server, "/", html("Home", "<p>Hello</p>")).await;
    mount_html(&server, "/search/", html("Search", "")).await;

    Mock::given(method("GET"))
        .and(path("/wp-json/redirection/v1/redirect"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"code\":\"rest_forbidden\"}"))
        .mount(&server)
        .await;

    let mut config = crawl_config(&base, output.path());
    config.redirects = RedirectSource::Redirection;
    config.additional = vec![format!("{}/search/", base)];

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert!(summary.failed_stages.is_empty(), "{:?}", summary.failed_stages);
    assert_eq!(summary.state, RunState::Done);
    assert_eq!(summary.redirects, 1);
    assert_eq!(
        std::fs::read_to_string(output.path().join("_redirects")).unwrap(),
        "/*\t/search/\t301\n"
    );
}

#[tokio::test]
async fn test_sitemap_index_expansion() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
    <sitemap><loc>{base}/post-sitemap.xml</loc></sitemap>
    <sitemap><loc>{base}/page-sitemap.xml</loc></sitemap>
</sitemapindex>"#
        )))
        .mount(&server)
        .await;

    let output = tempfile::tempdir().unwrap();
    let config = crawl_config(&base, output.path());
    let fetcher = HttpFetcher::new(&config).unwrap();

    let location = find_sitemap_location(config.src_url(), &fetcher, &config.settings).await;
    assert_eq!(location, "/sitemap_index.xml");

    let paths = extract_sitemap_paths(&format!("{}{}", base, location), &fetcher).await;
    assert_eq!(
        paths,
        vec![
            format!("{}/post-sitemap.xml", base),
            format!("{}/page-sitemap.xml", base),
        ]
    );
}

#[tokio::test]
async fn test_sitemap_declared_in_robots() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /wp-admin/\nSitemap: {}/custom-map.xml\n",
            base
        )))
        .mount(&server)
        .await;

    let output = tempfile::tempdir().unwrap();
    let config = crawl_config(&base, output.path());
    let fetcher = HttpFetcher::new(&config).unwrap();

    let location = find_sitemap_location(config.src_url(), &fetcher, &config.settings).await;
    assert_eq!(location, format!("{}/custom-map.xml", base));
}

#[tokio::test]
async fn test_cancellation_stops_further_fetches() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    mount_html(
        &server,
        "/",
        html(
            "Home",
            &format!(r#"<a href="{base}/slow/">Slow</a><a href="{base}/never/">Never</a>"#),
        ),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html("Slow", "<p>slow</p>"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/never/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html("Never", "")))
        .expect(0)
        .mount(&server)
        .await;

    let mut workflow = Workflow::new(crawl_config(&base, output.path())).unwrap();
    let cancel = workflow.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let summary = workflow.batch_processing().await;

    assert_eq!(summary.state, RunState::Stopped);
    assert!(output.path().join("index.html").is_file());
    assert!(!output.path().join("never").exists());
    assert!(!output.path().join("robots.txt").exists());
}

fn export_archive() -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in [
            ("export/index.html", html("Home", "<p>Home page</p>")),
            ("export/about/index.html", html("About", "<p>About page</p>")),
            ("export/search/index.html", html("Search", "")),
            ("export/404-error/index.html", html("Missing", "<p>Lost</p>")),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

#[tokio::test]
async fn test_archive_flow() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(output.path().join(".gitignore"), "node_modules\n").unwrap();
    std::fs::write(output.path().join("stale.html"), "old").unwrap();

    Mock::given(method("GET"))
        .and(path("/wp-json/simplystatic/v1/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "archive_name": "export",
            "archive_status_messages": {
                "create_zip_archive": {
                    "message": format!(
                        "ZIP archive created: <a href=\"{}/wp-content/uploads/simply-static/temp-files/export.zip\">Download</a>",
                        base
                    )
                }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-content/uploads/simply-static/temp-files/export.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(export_archive()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wp-json/redirection/v1/redirect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .mount(&server)
        .await;

    let config = Config::script_mode(
        "admin",
        "secret",
        &base,
        DST_URL,
        "404-error",
        "search",
        output.path(),
    );

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert!(summary.failed_stages.is_empty(), "{:?}", summary.failed_stages);
    let out = output.path();

    // Output cleared except dot-entries, archive flattened
    assert!(out.join(".gitignore").is_file());
    assert!(!out.join("stale.html").exists());
    assert!(!out.join("export").exists());
    assert!(out.join("about/index.html").is_file());
    assert!(!out.join("wp-content").exists());

    // 404 page promoted from the archive
    let not_found = std::fs::read_to_string(out.join("404.html")).unwrap();
    assert!(not_found.contains("Lost"));
    assert!(!out.join("404-error").exists());

    // Netlify redirects with the search rule
    let netlify = std::fs::read_to_string(out.join("netlify.toml")).unwrap();
    let netlify: toml::Value = toml::from_str(&netlify).unwrap();
    assert_eq!(netlify["redirects"][0]["from"].as_str(), Some("/*"));
    assert_eq!(netlify["redirects"][0]["to"].as_str(), Some("/search/"));
    assert_eq!(netlify["redirects"][0]["query"]["s"].as_str(), Some(":s"));

    // Search index over the archive pages
    assert_eq!(summary.search_documents, 2);
    let lunr = std::fs::read_to_string(out.join("search/lunr.json")).unwrap();
    assert!(lunr.contains("https://new.example/about/"));
    assert!(!lunr.contains("404-error"));
}

#[tokio::test]
async fn test_missing_archive_fails_only_its_stage() {
    let server = MockServer::start().await;
    let base = server.uri();
    let output = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/wp-json/simplystatic/v1/settings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"archive_name": "export"})),
        )
        .mount(&server)
        .await;

    let config = Config::script_mode(
        "admin",
        "secret",
        &base,
        DST_URL,
        "404-error",
        "search",
        output.path(),
    );

    let mut workflow = Workflow::new(config).unwrap();
    let summary = workflow.batch_processing().await;

    assert_eq!(summary.state, RunState::Done);
    assert_eq!(summary.failed_stages.len(), 1);
    assert_eq!(summary.failed_stages[0].0, "archive");
    assert!(output.path().join("robots.txt").is_file());
}
