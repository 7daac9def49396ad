//! Best-effort author enrichment against the bibliographic search API
//!
//! Each author is looked up by name; the first hit contributes birth and
//! death years and its external key. A failed lookup leaves the author as it
//! was and never stops the loop.

use super::fetcher::pause;
use super::{join_base, Scraper};
use crate::model::{AuthorRecord, ItemOutcome, PhaseSummary};
use crate::{HarvestError, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Search response body
#[derive(Debug, Clone, Default, Deserialize)]
struct AuthorSearch {
    #[serde(default)]
    docs: Vec<AuthorDoc>,
}

/// One author document of a search response
///
/// Date fields are free text upstream, occasionally numbers, so they are
/// kept as raw JSON values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthorDoc {
    pub key: Option<String>,
    pub birth_date: Option<Value>,
    pub death_date: Option<Value>,
}

impl AuthorDoc {
    /// Returns the author with the fields this document provides merged in
    pub fn merge_into(&self, author: &AuthorRecord) -> AuthorRecord {
        let mut enriched = author.clone();
        if let Some(key) = &self.key {
            enriched.openlibrary_key = Some(key.clone());
        }
        if let Some(date) = self.birth_date.as_ref().and_then(year_as_date) {
            enriched.birth_date = Some(date);
        }
        if let Some(date) = self.death_date.as_ref().and_then(year_as_date) {
            enriched.death_date = Some(date);
        }
        enriched
    }
}

/// Turns a loose date value into `YYYY-01-01` using its first 4-digit run
pub fn year_as_date(value: &Value) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d{4}").expect("year pattern is valid"));

    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    re.find(&text).map(|m| format!("{}-01-01", m.as_str()))
}

impl Scraper {
    /// Enriches every author, returning a new author list and the phase summary
    ///
    /// Authors with a match count as succeeded, authors without one as
    /// ignored, and failed lookups as skipped with the error text.
    pub async fn enrich_authors(
        &self,
        authors: &[AuthorRecord],
    ) -> (Vec<AuthorRecord>, PhaseSummary) {
        tracing::info!("Enriching {} authors...", authors.len());
        let mut summary = PhaseSummary::new("enrich authors");
        let mut enriched = Vec::with_capacity(authors.len());

        for (i, author) in authors.iter().enumerate() {
            match self.lookup_author(&author.name).await {
                Ok(Some(doc)) => {
                    enriched.push(doc.merge_into(author));
                    summary.record(ItemOutcome::Done);
                }
                Ok(None) => {
                    tracing::debug!("No lookup match for {}", author.name);
                    enriched.push(author.clone());
                    summary.record(ItemOutcome::Ignored);
                }
                Err(e) => {
                    tracing::warn!("Enrichment failed for {}: {}", author.name, e);
                    enriched.push(author.clone());
                    summary.record(ItemOutcome::Skipped(format!("{}: {}", author.name, e)));
                }
            }

            pause(self.http.lookup_delay_ms).await;

            if (i + 1) % 10 == 0 {
                tracing::info!("Enriched {}/{} authors", i + 1, authors.len());
            }
        }

        (enriched, summary)
    }

    /// Queries the search endpoint and returns the first document, if any
    async fn lookup_author(&self, name: &str) -> Result<Option<AuthorDoc>> {
        let url = join_base(&self.sources.openlibrary_url, "search/authors.json");
        let response = self
            .client
            .get(url.as_str())
            .query(&[("q", name), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let search: AuthorSearch = response.json().await?;
        Ok(search.docs.into_iter().next())
    }
}
