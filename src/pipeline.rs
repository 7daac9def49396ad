//! End-to-end pipeline orchestration
//!
//! Runs extraction, enrichment, normalization, persistence, verification and
//! export in that order over one HTTP client and one database connection.
//! Only opening the database and creating the schema are fatal; every other
//! failure is logged, recorded in the report and the pipeline carries on.

use crate::config::{validate, Config};
use crate::model::PhaseSummary;
use crate::normalize::{normalize, NormalizedData};
use crate::output::{
    display_summary, export_all, load_table_counts, verify_relations, ExportReport, TableCounts,
    VerificationReport,
};
use crate::scrape::Scraper;
use crate::storage::SqliteStore;
use crate::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::path::Path;

/// Outcome of the insert phases
#[derive(Debug, Clone, Default)]
pub struct PersistenceReport {
    /// One summary per insert phase, in execution order
    pub phases: Vec<PhaseSummary>,
    pub book_ids: Vec<i64>,
    pub quote_ids: Vec<i64>,
}

impl PersistenceReport {
    /// Phases that were rolled back
    pub fn failed_phases(&self) -> impl Iterator<Item = &PhaseSummary> {
        self.phases.iter().filter(|p| !p.is_complete())
    }
}

/// Everything a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub extraction: Vec<PhaseSummary>,
    pub enrichment: PhaseSummary,
    pub persistence: PersistenceReport,
    /// Absent when counting failed
    pub counts: Option<TableCounts>,
    /// Absent when a verification query failed
    pub verification: Option<VerificationReport>,
    /// Absent when exporting failed
    pub export: Option<ExportReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    /// All phase summaries in execution order
    pub fn phases(&self) -> impl Iterator<Item = &PhaseSummary> {
        self.extraction
            .iter()
            .chain(std::iter::once(&self.enrichment))
            .chain(self.persistence.phases.iter())
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Inserts normalized data phase by phase
///
/// Each phase is its own transaction; a rolled-back phase leaves later
/// phases to work with whatever is in the tables.
pub fn persist<R: Rng + ?Sized>(
    store: &mut SqliteStore,
    data: &NormalizedData,
    rng: &mut R,
) -> PersistenceReport {
    let mut phases = Vec::with_capacity(8);

    phases.push(store.insert_categories(&data.categories));
    phases.push(store.insert_publishers(&data.publishers));
    phases.push(store.insert_authors(&data.authors));

    let (book_ids, books_phase) = store.insert_books(&data.books, rng);
    phases.push(books_phase);
    phases.push(store.insert_book_authors(&book_ids, rng));

    let (quotes, quotes_phase) = store.insert_quotes(&data.quotes, rng);
    phases.push(quotes_phase);
    phases.push(store.insert_tags(&data.tags));
    phases.push(store.insert_quote_tags(&quotes));

    PersistenceReport {
        phases,
        book_ids,
        quote_ids: quotes.iter().map(|q| q.id).collect(),
    }
}

/// Runs the whole pipeline against the configured sources and database
///
/// The configuration is validated first. The database connection is closed
/// before returning, whatever the outcome.
pub async fn run_full_pipeline<R: Rng + ?Sized>(
    config: &Config,
    rng: &mut R,
) -> Result<PipelineReport> {
    validate(config)?;
    let started_at = Utc::now();
    tracing::info!("Pipeline started at {}", started_at.to_rfc3339());

    let mut store = SqliteStore::open(Path::new(&config.database.path))?;
    let outcome = run_stages(config, &mut store, rng, started_at).await;

    if let Err(e) = store.close() {
        tracing::warn!("Failed to close database: {}", e);
    }

    let report = outcome?;
    tracing::info!(
        "Pipeline finished at {} ({:.1}s)",
        report.finished_at.to_rfc3339(),
        report.duration().num_milliseconds() as f64 / 1000.0
    );
    Ok(report)
}

async fn run_stages<R: Rng + ?Sized>(
    config: &Config,
    store: &mut SqliteStore,
    rng: &mut R,
    started_at: DateTime<Utc>,
) -> Result<PipelineReport> {
    store.create_schema()?;
    let scraper = Scraper::new(config)?;

    let (extracted, extraction) = scraper.extract_all(rng).await;
    tracing::info!(
        "Extracted {} categories, {} books, {} authors, {} quotes, {} tags",
        extracted.categories.len(),
        extracted.books.len(),
        extracted.authors.len(),
        extracted.quotes.len(),
        extracted.tags.len()
    );

    let (authors, enrichment) = scraper.enrich_authors(&extracted.authors).await;
    let enriched = extracted.with_authors(authors);

    let normalized = normalize(&enriched, rng);
    let persistence = persist(store, &normalized, rng);

    for phase in extraction
        .iter()
        .chain(std::iter::once(&enrichment))
        .chain(persistence.phases.iter())
    {
        if let Some(reason) = &phase.aborted {
            tracing::warn!("Phase '{}' incomplete: {}", phase.phase, reason);
        }
    }

    let counts = match load_table_counts(store) {
        Ok(counts) => {
            display_summary(&counts);
            Some(counts)
        }
        Err(e) => {
            tracing::error!("Failed to count rows: {}", e);
            None
        }
    };

    let verification = match verify_relations(store) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!("Verification failed: {}", e);
            None
        }
    };

    let export = export_to(store, Path::new(&config.output.directory));

    Ok(PipelineReport {
        extraction,
        enrichment,
        persistence,
        counts,
        verification,
        export,
        started_at,
        finished_at: Utc::now(),
    })
}

fn export_to(store: &SqliteStore, dir: &Path) -> Option<ExportReport> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::error!("Cannot create output directory {}: {}", dir.display(), e);
        return None;
    }
    match export_all(store, dir) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!("Export failed: {}", e);
            None
        }
    }
}
