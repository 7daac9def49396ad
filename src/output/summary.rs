//! Row counts of every table after persistence

use crate::storage::{SqliteStore, StorageResult};

/// Row count of each of the eight tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub categories: u64,
    pub publishers: u64,
    pub authors: u64,
    pub books: u64,
    pub book_authors: u64,
    pub tags: u64,
    pub quotes: u64,
    pub quote_tags: u64,
}

impl TableCounts {
    /// `(table, count)` pairs in dependency order
    pub fn rows(&self) -> [(&'static str, u64); 8] {
        [
            ("categories", self.categories),
            ("publishers", self.publishers),
            ("authors", self.authors),
            ("books", self.books),
            ("book_authors", self.book_authors),
            ("tags", self.tags),
            ("quotes", self.quotes),
            ("quote_tags", self.quote_tags),
        ]
    }
}

/// Counts the rows of every table
pub fn load_table_counts(store: &SqliteStore) -> StorageResult<TableCounts> {
    Ok(TableCounts {
        categories: store.count_rows("categories")?,
        publishers: store.count_rows("publishers")?,
        authors: store.count_rows("authors")?,
        books: store.count_rows("books")?,
        book_authors: store.count_rows("book_authors")?,
        tags: store.count_rows("tags")?,
        quotes: store.count_rows("quotes")?,
        quote_tags: store.count_rows("quote_tags")?,
    })
}

/// Logs the insert summary
pub fn display_summary(counts: &TableCounts) {
    tracing::info!("=== Insert summary ===");
    for (table, count) in counts.rows() {
        tracing::info!("{:<14} {:>6} rows", table, count);
    }
}
