//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full listing-to-detail cycle end-to-end.

use article_harvest::config::{parse_config, Config};
use article_harvest::crawler::{HttpFetcher, PageFetcher, Pipeline};
use article_harvest::record::CrawlWarning;
use article_harvest::{FetchCause, FetchError, HarvestError};
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MAPPING: &str = r#"
[mapping.listing]
item = "article"

[[mapping.listing.preview]]
field = "title"
selector = "h2"
post = ["trim"]

[[mapping.detail]]
field = "title"
selector = "h1"
post = ["trim"]

[[mapping.detail]]
field = "body"
selector = "div.article-body p"
cardinality = "multiple"
post = ["trim", "join"]

[[mapping.detail]]
field = "published-at"
selector = "time"
post = ["trim", { parse-date = "%d %b %Y %H:%M" }]
"#;

/// Builds a validated config pointing at the mock server, robots.txt ignored
fn test_config(base: &str) -> Config {
    config_with(base, "respect-robots = false")
}

fn config_with(base: &str, crawler: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
parallelism = 2
random-delay-ms = 0
retry-backoff-ms = 10
{crawler}

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[site]
base-url = "{base}/news/{{category}}/"
allowed-domains = ["127.0.0.1"]
categories = ["business"]
{MAPPING}
"#
    );
    parse_config(&toml).expect("test config should be valid")
}

fn pipeline(config: &Config) -> Pipeline<HttpFetcher> {
    let fetcher = HttpFetcher::new(config).expect("Failed to build HTTP client");
    Pipeline::new(fetcher, config).expect("Failed to build pipeline")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

fn listing_html(links: &[&str]) -> String {
    links
        .iter()
        .map(|href| format!(r#"<article><a href="{}">more</a></article>"#, href))
        .collect()
}

fn detail_html(title: &str, paragraphs: &[&str], date: &str) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!(
        r#"<h1>{}</h1><time>{}</time><div class="article-body">{}</div>"#,
        title, date, body
    )
}

async fn mount_listing(server: &MockServer, category: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/news/{}/", category)))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_article_fixture() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/a", "/b"])).await;
    mount_page(
        &server,
        "/a",
        detail_html("X", &["p1", "p2"], "01 Jan 2024 10:00"),
    )
    .await;
    mount_page(&server, "/b", detail_html("Y", &["only"], "02 Jan 2024 08:30")).await;

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 2);
    let a = &report.articles[0];
    assert_eq!(a.title, "X");
    assert_eq!(a.body, "p1\np2");
    assert!(a.url.ends_with("/a"));
    assert_eq!(a.category, "business");
    assert_eq!(
        a.published_at,
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(report.articles[1].title, "Y");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[tokio::test]
async fn test_n_links_yield_n_articles_in_listing_order() {
    let server = MockServer::start().await;
    let pages = ["/n1", "/n2", "/n3", "/n4", "/n5"];
    mount_listing(&server, "business", listing_html(&pages)).await;
    for (i, page) in pages.iter().enumerate() {
        let title = format!("Story {}", i + 1);
        mount_page(&server, page, detail_html(&title, &["text"], "01 Jan 2024 10:00")).await;
    }

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 10, &CancellationToken::new())
        .await
        .unwrap();

    let titles: Vec<&str> = report.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Story 1", "Story 2", "Story 3", "Story 4", "Story 5"]
    );
    assert_eq!(report.discovered, 5);
    assert_eq!(report.dispatched, 5);
    // One listing fetch plus five detail fetches
    assert_eq!(report.requests_by_domain.get("127.0.0.1"), Some(&6));
}

#[tokio::test]
async fn test_limit_caps_detail_fetches() {
    let server = MockServer::start().await;
    let pages = ["/l1", "/l2", "/l3"];
    mount_listing(&server, "business", listing_html(&pages)).await;
    for page in pages {
        mount_page(&server, page, detail_html(page, &["text"], "01 Jan 2024 10:00")).await;
    }

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 2);
    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/l3"));
}

#[tokio::test]
async fn test_listing_title_takes_precedence() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "business",
        r#"<article><h2> Listing headline </h2><a href="/p">more</a></article>"#.to_string(),
    )
    .await;
    mount_page(
        &server,
        "/p",
        detail_html("Detail headline", &["text"], "01 Jan 2024 10:00"),
    )
    .await;

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.articles[0].title, "Listing headline");
}

#[tokio::test]
async fn test_bad_date_is_absent_not_now() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/d"])).await;
    mount_page(&server, "/d", detail_html("Dated", &["text"], "yesterday-ish")).await;

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.articles[0].published_at, None);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, CrawlWarning::DateParseFailure { raw, .. } if raw == "yesterday-ish")));
}

#[tokio::test]
async fn test_rerun_yields_equal_articles() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/r1", "/r2"])).await;
    mount_page(&server, "/r1", detail_html("R1", &["a", "b"], "03 Feb 2024 12:00")).await;
    mount_page(&server, "/r2", detail_html("R2", &["c"], "04 Feb 2024 12:00")).await;

    let config = test_config(&server.uri());
    let pipeline = pipeline(&config);
    let first = pipeline
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();
    let second = pipeline
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.articles, second.articles);
}

#[tokio::test]
async fn test_out_of_scope_url_makes_no_request() {
    let server = MockServer::start().await;
    let config = test_config(&server.uri());
    let fetcher = HttpFetcher::new(&config).unwrap();

    let url = Url::parse("http://elsewhere.invalid/news/").unwrap();
    let result = fetcher.fetch(&url).await;

    match result {
        Err(FetchError::OutOfScope(e)) => assert_eq!(e.domain, "elsewhere.invalid"),
        other => panic!("expected scope error, got {:?}", other.map(|p| p.status)),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(fetcher.requests_by_domain().is_empty());
}

#[tokio::test]
async fn test_offsite_links_are_warned_and_skipped() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        "business",
        listing_html(&["/local", "https://other.example.org/story"]),
    )
    .await;
    mount_page(&server, "/local", detail_html("Local", &["x"], "01 Jan 2024 10:00")).await;

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.dispatched, 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, CrawlWarning::OutOfScope { domain, .. } if domain == "other.example.org")));
}

#[tokio::test]
async fn test_listing_failure_aborts_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let result = pipeline(&config)
        .run("missing", 0, &CancellationToken::new())
        .await;

    match result {
        Err(HarvestError::Listing { category, source }) => {
            assert_eq!(category, "missing");
            assert!(matches!(
                source,
                FetchError::Failed {
                    cause: FetchCause::Status(404),
                    ..
                }
            ));
        }
        other => panic!("expected listing error, got {:?}", other.map(|r| r.articles.len())),
    }
}

#[tokio::test]
async fn test_failed_detail_is_isolated() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/ok", "/gone"])).await;
    mount_page(&server, "/ok", detail_html("Fine", &["x"], "01 Jan 2024 10:00")).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.dropped(), 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, CrawlWarning::FetchFailed { url, .. } if url.ends_with("/gone"))));
}

#[tokio::test]
async fn test_retries_transient_server_errors() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/flaky"])).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", detail_html("Recovered", &["x"], "01 Jan 2024 10:00")).await;

    let config = config_with(&server.uri(), "respect-robots = false\nmax-retries = 2");
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.articles[0].title, "Recovered");
    let flaky_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/flaky")
        .count();
    assert_eq!(flaky_hits, 2);
}

#[tokio::test]
async fn test_robots_disallow_is_honoured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .mount(&server)
        .await;
    mount_listing(&server, "business", listing_html(&["/public", "/private/secret"])).await;
    mount_page(&server, "/public", detail_html("Public", &["x"], "01 Jan 2024 10:00")).await;
    mount_page(
        &server,
        "/private/secret",
        detail_html("Secret", &["x"], "01 Jan 2024 10:00"),
    )
    .await;

    let config = config_with(&server.uri(), "respect-robots = true");
    let report = pipeline(&config)
        .run("business", 0, &CancellationToken::new())
        .await
        .unwrap();

    let titles: Vec<&str> = report.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Public"]);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, CrawlWarning::FetchFailed { url, .. } if url.ends_with("/private/secret"))));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.iter().any(|r| r.url.path() == "/private/secret"));
    assert_eq!(
        requests.iter().filter(|r| r.url.path() == "/robots.txt").count(),
        1
    );
}

#[tokio::test]
async fn test_run_many_continues_after_failed_category() {
    let server = MockServer::start().await;
    mount_listing(&server, "business", listing_html(&["/m1"])).await;
    mount_page(&server, "/m1", detail_html("M1", &["x"], "01 Jan 2024 10:00")).await;

    let config = test_config(&server.uri());
    let categories = vec!["absent".to_string(), "business".to_string()];
    let results = pipeline(&config)
        .with_config_hash("cafe")
        .run_many(&categories, 0, &CancellationToken::new())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].1.is_err());
    let report = results[1].1.as_ref().unwrap();
    assert_eq!(report.articles.len(), 1);
    assert_eq!(report.config_hash.as_deref(), Some("cafe"));
}
