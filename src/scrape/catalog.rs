//! Catalog extraction: categories, listing pages and book details

use super::fetcher::{fetch_url, pause, FetchResult};
use super::parser::{extract_year, parse_book_details, parse_categories, parse_listing, BookDetails};
use super::{join_base, Scraper};
use crate::model::{BookRecord, Category, ItemOutcome, PhaseSummary};
use crate::HarvestError;
use rand::Rng;
use url::Url;

/// Earliest synthesized publication year
pub const MIN_SYNTHETIC_YEAR: i32 = 2000;

/// Latest synthesized publication year
pub const MAX_SYNTHETIC_YEAR: i32 = 2023;

/// Draws a publication year for a book whose page carries none
pub fn random_publication_year<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(MIN_SYNTHETIC_YEAR..=MAX_SYNTHETIC_YEAR)
}

impl Scraper {
    /// Extracts the category list from the catalog home page
    pub async fn extract_categories(&self) -> (Vec<Category>, PhaseSummary) {
        tracing::info!("Extracting categories...");
        let mut summary = PhaseSummary::new("extract categories");
        let home = &self.sources.catalog_url;

        let fetched = fetch_url(&self.client, home).await;
        pause(self.http.page_delay_ms).await;

        let body = match fetched {
            FetchResult::Success { body, .. } => body,
            other => {
                let reason = other.describe(home);
                tracing::error!("Category extraction failed: {}", reason);
                summary.abort(reason);
                return (Vec::new(), summary);
            }
        };

        let parsed = Url::parse(home).map_err(HarvestError::from).and_then(|base| {
            parse_categories(&body, &base).map_err(|message| HarvestError::HtmlParse {
                url: home.clone(),
                message,
            })
        });

        let categories: Vec<Category> = match parsed {
            Ok(found) => found
                .into_iter()
                .map(|(name, url)| Category { name, url })
                .collect(),
            Err(error) => {
                tracing::error!("Category extraction failed: {}", error);
                summary.abort(error.to_string());
                return (Vec::new(), summary);
            }
        };

        for _ in &categories {
            summary.record(ItemOutcome::Done);
        }
        tracing::info!("Found {} categories", categories.len());

        (categories, summary)
    }

    /// Extracts every book of the paginated catalog listing
    ///
    /// Paging stops on a page without book containers, on a 404, or at the
    /// configured page cap. Any other failure ends the phase early and keeps
    /// the books gathered so far.
    pub async fn extract_books<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> (Vec<BookRecord>, PhaseSummary) {
        tracing::info!("Extracting books...");
        let mut summary = PhaseSummary::new("extract books");
        let mut books = Vec::new();
        let mut page: u32 = 1;

        loop {
            if let Some(cap) = self.limits.max_catalog_pages {
                if page > cap {
                    tracing::info!("Stopping at the catalog page cap ({})", cap);
                    break;
                }
            }

            let page_url = join_base(
                &self.sources.catalog_url,
                &format!("catalogue/page-{}.html", page),
            );

            let body = match fetch_url(&self.client, &page_url).await {
                FetchResult::Success { body, .. } => body,
                FetchResult::NotFound => {
                    tracing::debug!("{} not found, end of catalog", page_url);
                    break;
                }
                other => {
                    let reason = other.describe(&page_url);
                    tracing::error!("Catalog page {} failed: {}", page, reason);
                    summary.abort(reason);
                    break;
                }
            };

            let entries = match Url::parse(&page_url)
                .map_err(HarvestError::from)
                .and_then(|url| {
                    parse_listing(&body, &url).map_err(|message| HarvestError::HtmlParse {
                        url: page_url.clone(),
                        message,
                    })
                }) {
                Ok(entries) => entries,
                Err(error) => {
                    tracing::error!("Catalog page {} failed: {}", page, error);
                    summary.abort(error.to_string());
                    break;
                }
            };

            if entries.is_empty() {
                tracing::debug!("{} has no books, end of catalog", page_url);
                break;
            }

            let found = entries.len();
            for entry in entries {
                let listing = match entry {
                    Ok(listing) => listing,
                    Err(reason) => {
                        tracing::warn!("Skipping book on page {}: {}", page, reason);
                        summary.record(ItemOutcome::Skipped(reason));
                        continue;
                    }
                };

                let details = self.fetch_book_details(&listing.detail_url).await;
                let publication_year = details
                    .availability_info
                    .as_deref()
                    .and_then(extract_year)
                    .unwrap_or_else(|| random_publication_year(rng));

                books.push(BookRecord {
                    title: listing.title,
                    price: listing.price,
                    availability: listing.availability,
                    rating: listing.rating,
                    image_url: listing.image_url,
                    url: listing.detail_url,
                    description: details.description,
                    upc: details.upc,
                    publication_year,
                    category: details.category,
                });
                summary.record(ItemOutcome::Done);
            }

            tracing::info!("Page {}: {} books found", page, found);
            page += 1;
            pause(self.http.page_delay_ms).await;
        }

        tracing::info!("Total: {} books extracted", books.len());
        (books, summary)
    }

    /// Reads the detail page of one book
    ///
    /// A failed detail page leaves the book with empty details.
    async fn fetch_book_details(&self, url: &str) -> BookDetails {
        let result = fetch_url(&self.client, url).await;
        pause(self.http.detail_delay_ms).await;

        match result {
            FetchResult::Success { body, .. } => match parse_book_details(&body) {
                Ok(details) => details,
                Err(message) => {
                    tracing::warn!("Unreadable detail page {}: {}", url, message);
                    BookDetails::default()
                }
            },
            other => {
                tracing::warn!("Book details unavailable: {}", other.describe(url));
                BookDetails::default()
            }
        }
    }
}
