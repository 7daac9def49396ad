//! Entity normalization between extraction and persistence
//!
//! Deduplicates categories, authors and tags by name, synthesizes the
//! publisher list, and gives every book a category and a publisher. Publisher
//! assignment is purely synthetic: nothing scraped says who published a book.

use crate::model::{AuthorRecord, BookRecord, Extraction, QuoteRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// The fixed fictional publisher list
pub const FICTIONAL_PUBLISHERS: [&str; 20] = [
    "Penguin Random House",
    "HarperCollins",
    "Macmillan Publishers",
    "Simon & Schuster",
    "Hachette Book Group",
    "Scholastic",
    "Wiley",
    "Pearson Education",
    "McGraw-Hill Education",
    "Oxford University Press",
    "Cambridge University Press",
    "Bloomsbury Publishing",
    "Faber & Faber",
    "Little, Brown and Company",
    "Vintage Books",
    "Bantam Books",
    "Doubleday",
    "Knopf",
    "Grove Atlantic",
    "Farrar, Straus and Giroux",
];

/// A book with its category and publisher resolved
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBook {
    pub book: BookRecord,
    /// Breadcrumb category, or a random known category when that is unknown
    pub category: Option<String>,
    /// Randomly assigned publisher
    pub publisher: Option<String>,
}

/// Deduplicated entities ready for persistence
#[derive(Debug, Clone, Default)]
pub struct NormalizedData {
    pub categories: Vec<String>,
    /// Shuffled publisher names
    pub publishers: Vec<String>,
    pub authors: Vec<AuthorRecord>,
    pub books: Vec<NormalizedBook>,
    pub quotes: Vec<QuoteRecord>,
    /// Sorted distinct tag names
    pub tags: Vec<String>,
}

/// Keeps the first occurrence of each key, preserving order
fn dedup_by_key<T, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Shuffles the fictional publisher list
pub fn generate_publishers<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let mut publishers: Vec<String> = FICTIONAL_PUBLISHERS.iter().map(|p| p.to_string()).collect();
    publishers.shuffle(rng);
    tracing::info!("Generated {} publishers", publishers.len());
    publishers
}

/// Normalizes an extraction snapshot
///
/// A book whose breadcrumb category is not among the extracted categories
/// gets a uniformly random one (none if there are no categories at all).
/// Every book gets a uniformly random publisher.
pub fn normalize<R: Rng + ?Sized>(extraction: &Extraction, rng: &mut R) -> NormalizedData {
    let categories = dedup_by_key(
        extraction
            .categories
            .iter()
            .map(|c| c.name.trim().to_string())
            .filter(|name| !name.is_empty()),
        |name| name.clone(),
    );
    let known_categories: HashSet<&str> = categories.iter().map(String::as_str).collect();

    let publishers = generate_publishers(rng);

    let authors = dedup_by_key(extraction.authors.iter().cloned(), |a| a.name.clone());

    let books = extraction
        .books
        .iter()
        .map(|book| {
            let category = match book.category.as_deref() {
                Some(name) if known_categories.contains(name) => Some(name.to_string()),
                other => {
                    let fallback = categories.choose(rng).cloned();
                    tracing::debug!(
                        "Book '{}' has category {:?}, assigned {:?}",
                        book.title,
                        other,
                        fallback
                    );
                    fallback
                }
            };
            let publisher = publishers.choose(rng).cloned();

            NormalizedBook {
                book: book.clone(),
                category,
                publisher,
            }
        })
        .collect();

    let quotes = extraction
        .quotes
        .iter()
        .map(|quote| QuoteRecord {
            tags: dedup_by_key(quote.tags.iter().cloned(), |t| t.clone()),
            ..quote.clone()
        })
        .collect();

    let tags = extraction.tags.iter().cloned().collect();

    NormalizedData {
        categories,
        publishers,
        authors,
        books,
        quotes,
        tags,
    }
}
