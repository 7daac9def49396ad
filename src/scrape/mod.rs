//! Scraping module for the catalog, quotes and lookup sources
//!
//! This module contains the extraction side of the pipeline:
//! - HTTP fetching with fixed pauses and no retry
//! - HTML parsing of listing, detail and quote pages
//! - Catalog and quotes pagination
//! - Best-effort author enrichment against the bibliographic search API

mod catalog;
mod enrich;
mod fetcher;
mod parser;
mod quotes;

pub use catalog::random_publication_year;
pub use enrich::{year_as_date, AuthorDoc};
pub use fetcher::{build_http_client, fetch_url, pause, FetchResult};
pub use quotes::QuotesScrape;
pub use parser::{
    extract_year, parse_book_details, parse_categories, parse_listing, parse_price,
    parse_quotes, rating_from_word, strip_quotation_marks, BookDetails, ListingEntry,
    QuoteEntry, ROOT_CATEGORY_LABEL,
};

use crate::config::{Config, HttpConfig, ScrapeConfig, SourcesConfig};
use crate::model::{Extraction, PhaseSummary};
use crate::Result;
use rand::Rng;
use reqwest::Client;

/// Extraction front end holding the shared HTTP client
///
/// The scraper keeps no accumulated state: every extraction method returns
/// its records together with a [`PhaseSummary`].
pub struct Scraper {
    client: Client,
    http: HttpConfig,
    sources: SourcesConfig,
    limits: ScrapeConfig,
}

impl Scraper {
    /// Creates a scraper for the given configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self {
            client,
            http: config.http.clone(),
            sources: config.sources.clone(),
            limits: config.scrape.clone(),
        })
    }

    /// Runs categories, books and quotes extraction in order
    ///
    /// Each phase keeps whatever it gathered before an error ended it.
    pub async fn extract_all<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> (Extraction, Vec<PhaseSummary>) {
        let (categories, category_phase) = self.extract_categories().await;
        let (books, book_phase) = self.extract_books(rng).await;
        let quotes_scrape = self.extract_quotes().await;

        let extraction = Extraction {
            categories,
            books,
            authors: quotes_scrape.authors,
            quotes: quotes_scrape.quotes,
            tags: quotes_scrape.tags,
        };

        (
            extraction,
            vec![category_phase, book_phase, quotes_scrape.summary],
        )
    }
}

/// Builds `<base>/<path>` without doubling the separator
fn join_base(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_base() {
        assert_eq!(
            join_base("https://books.toscrape.com", "catalogue/page-2.html"),
            "https://books.toscrape.com/catalogue/page-2.html"
        );
        assert_eq!(
            join_base("https://quotes.toscrape.com/", "/page/2/"),
            "https://quotes.toscrape.com/page/2/"
        );
    }
}
