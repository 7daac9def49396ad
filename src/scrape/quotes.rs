//! Quotes extraction: quote text, authors and tags

use super::fetcher::{fetch_url, pause, FetchResult};
use super::parser::parse_quotes;
use super::{join_base, Scraper};
use crate::model::{AuthorRecord, ItemOutcome, PhaseSummary, QuoteRecord};
use crate::HarvestError;
use std::collections::{BTreeSet, HashSet};

/// Records gathered from the quotes site
#[derive(Debug, Clone)]
pub struct QuotesScrape {
    pub quotes: Vec<QuoteRecord>,
    /// Distinct authors in first-seen order, fields empty
    pub authors: Vec<AuthorRecord>,
    pub tags: BTreeSet<String>,
    pub summary: PhaseSummary,
}

impl Scraper {
    /// URL of the n-th quotes page: the root for the first page, `/page/N/` after
    pub(crate) fn quotes_page_url(&self, page: u32) -> String {
        if page == 1 {
            self.sources.quotes_url.clone()
        } else {
            join_base(&self.sources.quotes_url, &format!("page/{}/", page))
        }
    }

    /// Extracts quotes, authors and tags from the paginated quotes site
    pub async fn extract_quotes(&self) -> QuotesScrape {
        tracing::info!("Extracting authors and quotes...");
        let mut summary = PhaseSummary::new("extract quotes");
        let mut quotes = Vec::new();
        let mut authors = Vec::new();
        let mut seen_authors = HashSet::new();
        let mut tags = BTreeSet::new();
        let mut page: u32 = 1;

        loop {
            if let Some(cap) = self.limits.max_quote_pages {
                if page > cap {
                    tracing::info!("Stopping at the quotes page cap ({})", cap);
                    break;
                }
            }

            let page_url = self.quotes_page_url(page);
            let body = match fetch_url(&self.client, &page_url).await {
                FetchResult::Success { body, .. } => body,
                FetchResult::NotFound => {
                    tracing::debug!("{} not found, end of quotes", page_url);
                    break;
                }
                other => {
                    let reason = other.describe(&page_url);
                    tracing::error!("Quotes page {} failed: {}", page, reason);
                    summary.abort(reason);
                    break;
                }
            };

            let entries = match parse_quotes(&body) {
                Ok(entries) => entries,
                Err(message) => {
                    let error = HarvestError::HtmlParse {
                        url: page_url.clone(),
                        message,
                    };
                    tracing::error!("Quotes page {} failed: {}", page, error);
                    summary.abort(error.to_string());
                    break;
                }
            };

            if entries.is_empty() {
                tracing::debug!("{} has no quotes, end of quotes", page_url);
                break;
            }

            let found = entries.len();
            for entry in entries {
                match &entry.author {
                    Some(name) => {
                        if seen_authors.insert(name.clone()) {
                            authors.push(AuthorRecord::named(name.clone()));
                        }
                    }
                    None => tracing::warn!("Quote without author on page {}", page),
                }

                let Some(text) = entry.text else {
                    summary.record(ItemOutcome::Skipped(format!(
                        "quote without text on page {}",
                        page
                    )));
                    continue;
                };

                tags.extend(entry.tags.iter().cloned());
                quotes.push(QuoteRecord {
                    text,
                    author: entry.author,
                    tags: entry.tags,
                });
                summary.record(ItemOutcome::Done);
            }

            tracing::info!("Page {}: {} quotes found", page, found);
            page += 1;
            pause(self.http.page_delay_ms).await;
        }

        tracing::info!(
            "Total: {} authors and {} quotes",
            authors.len(),
            quotes.len()
        );

        QuotesScrape {
            quotes,
            authors,
            tags,
            summary,
        }
    }
}
