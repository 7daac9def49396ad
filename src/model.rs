//! Records exchanged between pipeline stages
//!
//! Each stage consumes the previous stage's snapshot by reference and returns
//! a new one: extraction produces an [`Extraction`], normalization produces a
//! [`crate::normalize::NormalizedData`], persistence produces a
//! [`crate::pipeline::PersistenceReport`]. Per-item outcomes are folded into a
//! [`PhaseSummary`] for every phase.

use std::collections::BTreeSet;

/// A category discovered in the catalog navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub url: String,
}

/// A book assembled from a listing entry and its detail page
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    pub title: String,
    pub price: f64,
    pub availability: String,
    pub rating: Option<u8>,
    pub image_url: String,
    pub url: String,
    pub description: Option<String>,
    pub upc: String,
    pub publication_year: i32,
    /// Category name taken from the detail page breadcrumb
    pub category: Option<String>,
}

/// An author seen on the quotes site, possibly enriched afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub name: String,
    /// `YYYY-01-01`
    pub birth_date: Option<String>,
    /// `YYYY-01-01`
    pub death_date: Option<String>,
    pub bio: Option<String>,
    pub openlibrary_key: Option<String>,
}

impl AuthorRecord {
    /// A freshly seen author with every optional field empty
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            birth_date: None,
            death_date: None,
            bio: None,
            openlibrary_key: None,
        }
    }
}

/// A quote with its author display name and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub text: String,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

/// Everything collected from the two sites
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub categories: Vec<Category>,
    pub books: Vec<BookRecord>,
    pub authors: Vec<AuthorRecord>,
    pub quotes: Vec<QuoteRecord>,
    pub tags: BTreeSet<String>,
}

impl Extraction {
    /// Returns a copy of this snapshot with the author list replaced
    pub fn with_authors(&self, authors: Vec<AuthorRecord>) -> Self {
        Self {
            authors,
            ..self.clone()
        }
    }
}

/// Outcome of processing a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Record stored, extracted or enriched
    Done,
    /// Record already present (unique-constraint conflict) or nothing to do
    Ignored,
    /// Record dropped, with the reason
    Skipped(String),
}

/// Aggregated outcome of one pipeline phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    pub phase: String,
    pub succeeded: usize,
    pub ignored: usize,
    pub skipped: Vec<String>,
    /// Set when the phase ended early or its transaction was rolled back
    pub aborted: Option<String>,
}

impl PhaseSummary {
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            succeeded: 0,
            ignored: 0,
            skipped: Vec::new(),
            aborted: None,
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Done => self.succeeded += 1,
            ItemOutcome::Ignored => self.ignored += 1,
            ItemOutcome::Skipped(reason) => self.skipped.push(reason),
        }
    }

    /// Marks the phase as ended early; collected results stay valid
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = Some(reason.into());
    }

    /// Marks the phase as rolled back; nothing it did was kept
    pub fn roll_back(&mut self, reason: impl Into<String>) {
        self.succeeded = 0;
        self.ignored = 0;
        self.aborted = Some(reason.into());
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}
