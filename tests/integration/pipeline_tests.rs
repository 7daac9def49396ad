//! Integration tests for the harvesting pipeline
//!
//! These tests use wiremock to stand in for the catalog site, the quotes site
//! and the bibliographic search API, and drive the extractors and the full
//! pipeline against them.

use book_harvest::config::{parse_config, Config};
use book_harvest::model::AuthorRecord;
use book_harvest::output::{BOOKS_EXPORT, QUOTES_EXPORT, RELATIONS_EXPORT};
use book_harvest::run_full_pipeline;
use book_harvest::scrape::Scraper;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = r#"
<html><body>
<div class="side_categories">
  <ul class="nav nav-list">
    <li><a href="catalogue/category/books_1/index.html">Books</a>
      <ul>
        <li><a href="catalogue/category/books/poetry_23/index.html">Poetry 2</a></li>
        <li><a href="catalogue/category/books/travel_2/index.html">Travel</a></li>
      </ul>
    </li>
  </ul>
</div>
</body></html>
"#;

const LISTING_PAGE: &str = r#"
<html><body><ol class="row">
<li><article class="product_pod">
  <div class="image_container"><a href="first-book_1/index.html"><img src="../media/first.jpg" alt="First Book"></a></div>
  <p class="star-rating Two"></p>
  <h3><a href="first-book_1/index.html" title="First Book">First Book</a></h3>
  <div class="product_price">
    <p class="price_color">£10.00</p>
    <p class="instock availability">In stock</p>
  </div>
</article></li>
<li><article class="product_pod">
  <div class="image_container"><a href="second-book_2/index.html"><img src="../media/second.jpg" alt="Second Book"></a></div>
  <p class="star-rating Four"></p>
  <h3><a href="second-book_2/index.html" title="Second Book">Second Book</a></h3>
  <div class="product_price">
    <p class="price_color">£20.00</p>
    <p class="instock availability">In stock</p>
  </div>
</article></li>
</ol></body></html>
"#;

const EMPTY_LISTING_PAGE: &str = r#"<html><body><ol class="row"></ol></body></html>"#;

const QUOTES_PAGE: &str = r#"
<html><body>
<div class="quote">
  <span class="text">“Life is love.”</span>
  <span>by <small class="author">Jane Doe</small></span>
  <div class="tags">
    <a class="tag" href="/tag/life/">life</a>
    <a class="tag" href="/tag/love/">love</a>
  </div>
</div>
</body></html>
"#;

fn detail_page(category: &str, upc: &str, availability: &str) -> String {
    format!(
        r#"<html><body>
<ul class="breadcrumb">
  <li><a href="../../index.html">Home</a></li>
  <li><a href="../category/books_1/index.html">Books</a></li>
  <li><a href="../category/books/x/index.html">{category}</a></li>
  <li class="active">Title</li>
</ul>
<div id="product_description" class="sub-header"><h2>Product Description</h2></div>
<p>A fine book.</p>
<table class="table table-striped">
  <tr><th>UPC</th><td>{upc}</td></tr>
  <tr><th>Availability</th><td>{availability}</td></tr>
</table>
</body></html>"#
    )
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

/// Mounts a two-book catalog, paging ending with a 404 on page 2
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOME_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(html(LISTING_PAGE))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/first-book_1/index.html"))
        .respond_with(html(detail_page("Poetry", "aaa111", "In stock (22 available)")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/catalogue/second-book_2/index.html"))
        .respond_with(html(detail_page("Travel", "bbb222", "In stock, reprinted 2011")))
        .mount(server)
        .await;
}

async fn mount_quotes(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(QUOTES_PAGE))
        .mount(server)
        .await;
}

async fn mount_openlibrary(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/authors.json"))
        .and(query_param("q", "Jane Doe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "numFound": 1,
            "docs": [{
                "key": "OL123A",
                "name": "Jane Doe",
                "birth_date": "3 May 1901",
                "death_date": "1980"
            }]
        })))
        .mount(server)
        .await;
}

/// Creates a test configuration with no pauses between requests
fn create_test_config(catalog: &str, quotes: &str, openlibrary: &str, dir: &Path) -> Config {
    let toml = format!(
        r#"
[http]
timeout-secs = 5
page-delay-ms = 0
detail-delay-ms = 0
lookup-delay-ms = 0

[sources]
catalog-url = "{catalog}"
quotes-url = "{quotes}"
openlibrary-url = "{openlibrary}"

[scrape]
max-catalog-pages = 5
max-quote-pages = 5

[database]
path = "{db}"

[output]
directory = "{out}"
"#,
        db = dir.join("books.db").display(),
        out = dir.join("out").display(),
    );
    parse_config(&toml).expect("test config should parse")
}

struct Sites {
    catalog: MockServer,
    quotes: MockServer,
    openlibrary: MockServer,
}

async fn start_sites() -> Sites {
    let sites = Sites {
        catalog: MockServer::start().await,
        quotes: MockServer::start().await,
        openlibrary: MockServer::start().await,
    };
    mount_catalog(&sites.catalog).await;
    mount_quotes(&sites.quotes).await;
    mount_openlibrary(&sites.openlibrary).await;
    sites
}

fn config_for(sites: &Sites, dir: &Path) -> Config {
    create_test_config(
        &sites.catalog.uri(),
        &sites.quotes.uri(),
        &sites.openlibrary.uri(),
        dir,
    )
}

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let sites = start_sites().await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&sites, dir.path());

    let mut rng = StdRng::seed_from_u64(42);
    let report = run_full_pipeline(&config, &mut rng)
        .await
        .expect("pipeline should succeed");

    assert!(
        report.phases().all(|p| p.is_complete()),
        "every phase should complete: {:?}",
        report.phases().collect::<Vec<_>>()
    );

    let counts = report.counts.expect("table counts");
    assert_eq!(counts.categories, 2);
    assert_eq!(counts.publishers, 20);
    assert_eq!(counts.authors, 1);
    assert_eq!(counts.books, 2);
    assert_eq!(counts.book_authors, 2);
    assert_eq!(counts.tags, 2);
    assert_eq!(counts.quotes, 1);
    assert_eq!(counts.quote_tags, 2);

    let conn = Connection::open(&config.database.path).unwrap();

    let ratings: Vec<(String, f64, i64)> = {
        let mut stmt = conn
            .prepare("SELECT title, price, rating FROM books ORDER BY title")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap();
        rows.collect::<Result<_, _>>().unwrap()
    };
    assert_eq!(
        ratings,
        vec![
            ("First Book".to_string(), 10.0, 2),
            ("Second Book".to_string(), 20.0, 4)
        ]
    );

    let (category, year): (String, i64) = conn
        .query_row(
            "SELECT c.name, b.publication_year FROM books b
             JOIN categories c ON b.category_id = c.id
             WHERE b.title = 'Second Book'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(category, "Travel");
    assert_eq!(year, 2011);

    let first_year: i64 = conn
        .query_row(
            "SELECT publication_year FROM books WHERE title = 'First Book'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!((2000..=2023).contains(&first_year));

    let (birth, death, key): (String, String, String) = conn
        .query_row(
            "SELECT birth_date, death_date, openlibrary_key FROM authors WHERE name = 'Jane Doe'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(birth, "1901-01-01");
    assert_eq!(death, "1980-01-01");
    assert_eq!(key, "OL123A");

    let tags: Vec<String> = {
        let mut stmt = conn.prepare("SELECT name FROM tags ORDER BY name").unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<Result<_, _>>().unwrap()
    };
    assert_eq!(tags, vec!["life", "love"]);

    let out = dir.path().join("out");
    let raw = std::fs::read_to_string(out.join(QUOTES_EXPORT)).unwrap();
    let quotes: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let quotes = quotes.as_array().unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0]["text"], "Life is love.");
    assert_eq!(quotes[0]["author"], "Jane Doe");
    assert_eq!(quotes[0]["tags"], serde_json::json!(["life", "love"]));

    let books = std::fs::read_to_string(out.join(BOOKS_EXPORT)).unwrap();
    let mut lines = books.lines();
    assert_eq!(
        lines.next(),
        Some("title,price,rating,category,publisher,publication_year")
    );
    assert!(lines.next().unwrap().starts_with("First Book,10.00,2,Poetry,"));
    assert!(lines.next().unwrap().starts_with("Second Book,20.00,4,Travel,"));

    let relations = std::fs::read_to_string(out.join(RELATIONS_EXPORT)).unwrap();
    assert_eq!(relations.lines().count(), 3);
    assert!(relations.starts_with("author,book,publication_year\n"));
}

#[tokio::test]
async fn test_exports_are_identical_for_the_same_seed() {
    let sites = start_sites().await;

    let mut outputs = Vec::new();
    let mut dirs = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&sites, dir.path());
        let mut rng = StdRng::seed_from_u64(7);
        run_full_pipeline(&config, &mut rng).await.unwrap();

        let out = dir.path().join("out");
        let files: Vec<Vec<u8>> = [BOOKS_EXPORT, QUOTES_EXPORT, RELATIONS_EXPORT]
            .iter()
            .map(|name| std::fs::read(out.join(name)).unwrap())
            .collect();
        outputs.push(files);
        dirs.push(dir);
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_catalog_ends_on_empty_page() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(html(EMPTY_LISTING_PAGE))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (books, summary) = scraper.extract_books(&mut rng).await;

    assert_eq!(books.len(), 2);
    assert!(summary.is_complete());
    assert_eq!(books[0].rating, Some(2));
    assert_eq!(books[1].rating, Some(4));
    assert_eq!(books[0].upc, "aaa111");
    assert_eq!(books[0].category.as_deref(), Some("Poetry"));
    assert_eq!(books[0].description.as_deref(), Some("A fine book."));
    assert!(books[0].image_url.ends_with("/media/first.jpg"));
}

#[tokio::test]
async fn test_catalog_ends_on_not_found() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (books, summary) = scraper.extract_books(&mut rng).await;

    assert_eq!(books.len(), 2);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_catalog_server_error_keeps_collected_books() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (books, summary) = scraper.extract_books(&mut rng).await;

    assert_eq!(books.len(), 2);
    assert!(!summary.is_complete());
}

#[tokio::test]
async fn test_missing_detail_page_keeps_book() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-1.html"))
        .respond_with(html(LISTING_PAGE))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let (books, _) = scraper.extract_books(&mut rng).await;

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].upc, "");
    assert_eq!(books[0].category, None);
    assert!((2000..=2023).contains(&books[0].publication_year));
}

#[tokio::test]
async fn test_categories_exclude_root_label() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let (categories, summary) = scraper.extract_categories().await;
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(names, vec!["Poetry", "Travel"]);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_quotes_pagination() {
    let server = MockServer::start().await;
    mount_quotes(&server).await;
    Mock::given(method("GET"))
        .and(path("/page/2/"))
        .respond_with(html(
            r#"<div class="quote"><span class="text">"Second."</span>
               <small class="author">John Roe</small>
               <a class="tag">life</a></div>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/3/"))
        .respond_with(html("<html><body></body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let scrape = scraper.extract_quotes().await;

    assert!(scrape.summary.is_complete());
    assert_eq!(scrape.quotes.len(), 2);
    assert_eq!(scrape.quotes[1].text, "Second.");
    let authors: Vec<&str> = scrape.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(authors, vec!["Jane Doe", "John Roe"]);
    assert_eq!(scrape.tags.len(), 2);
}

#[tokio::test]
async fn test_quote_block_without_text_still_yields_author() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<div class="quote"><span class="text">"Kept."</span>
               <small class="author">Jane Doe</small></div>
               <div class="quote"><small class="author">Only Author</small>
               <a class="tag">silence</a></div>"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let scrape = scraper.extract_quotes().await;

    let authors: Vec<&str> = scrape.authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(authors, vec!["Jane Doe", "Only Author"]);
    assert_eq!(scrape.quotes.len(), 1);
    assert_eq!(scrape.quotes[0].text, "Kept.");
    assert!(scrape.tags.is_empty());
    assert_eq!(scrape.summary.succeeded, 1);
    assert_eq!(scrape.summary.skipped.len(), 1);
    assert!(scrape.summary.is_complete());
}

#[tokio::test]
async fn test_category_request_is_followed_by_page_delay() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    config.http.page_delay_ms = 150;
    let scraper = Scraper::new(&config).unwrap();

    let started = std::time::Instant::now();
    let (categories, _) = scraper.extract_categories().await;

    assert_eq!(categories.len(), 2);
    assert!(started.elapsed() >= std::time::Duration::from_millis(150));
}

#[tokio::test]
async fn test_enrichment_is_best_effort() {
    let server = MockServer::start().await;
    mount_openlibrary(&server).await;
    Mock::given(method("GET"))
        .and(path("/search/authors.json"))
        .and(query_param("q", "Nobody Known"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "numFound": 0,
            "docs": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/authors.json"))
        .and(query_param("q", "Broken Lookup"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &server.uri(), &server.uri(), dir.path());
    let scraper = Scraper::new(&config).unwrap();

    let authors = vec![
        AuthorRecord::named("Jane Doe"),
        AuthorRecord::named("Nobody Known"),
        AuthorRecord::named("Broken Lookup"),
    ];
    let (enriched, summary) = scraper.enrich_authors(&authors).await;

    assert_eq!(enriched.len(), 3);
    assert_eq!(enriched[0].birth_date.as_deref(), Some("1901-01-01"));
    assert_eq!(enriched[1], authors[1]);
    assert_eq!(enriched[2], authors[2]);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn test_unreachable_sources_do_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
        dir.path(),
    );

    let mut rng = StdRng::seed_from_u64(3);
    let report = run_full_pipeline(&config, &mut rng)
        .await
        .expect("only the database is fatal");

    assert!(report.extraction.iter().all(|p| !p.is_complete()));
    let counts = report.counts.expect("table counts");
    assert_eq!(counts.books, 0);
    assert_eq!(counts.publishers, 20);

    let export = report.export.expect("exports");
    assert_eq!(export.books, 0);
    let quotes = std::fs::read_to_string(dir.path().join("out").join(QUOTES_EXPORT)).unwrap();
    assert_eq!(quotes, "[]");
}

#[tokio::test]
async fn test_unopenable_database_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
        dir.path(),
    );
    config.database.path = dir
        .path()
        .join("missing")
        .join("books.db")
        .display()
        .to_string();

    let mut rng = StdRng::seed_from_u64(3);
    assert!(run_full_pipeline(&config, &mut rng).await.is_err());
}
