//! Read-only verification queries over the joined schema
//!
//! Results are logged and returned, nothing is written.

use crate::storage::{SqliteStore, StorageResult};
use rusqlite::Connection;

const QUOTE_PREVIEW_CHARS: usize = 50;

/// A book with its category and publisher names
#[derive(Debug, Clone, PartialEq)]
pub struct BookOverview {
    pub title: String,
    pub category: String,
    pub publisher: String,
    pub price: Option<f64>,
}

/// An author with the comma-separated titles linked to them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorBooks {
    pub author: String,
    pub books: String,
}

/// A quote with its author and comma-separated tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteOverview {
    pub text: String,
    pub author: String,
    pub tags: Option<String>,
}

/// Global counts and the average book price
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub books: u64,
    pub authors: u64,
    pub quotes: u64,
    pub categories: u64,
    pub average_price: Option<f64>,
}

/// Results of the four verification queries
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub books: Vec<BookOverview>,
    pub authors: Vec<AuthorBooks>,
    pub quotes: Vec<QuoteOverview>,
    pub statistics: Statistics,
}

fn books_with_relations(conn: &Connection) -> StorageResult<Vec<BookOverview>> {
    let mut stmt = conn.prepare(
        "SELECT b.title, c.name, p.name, b.price
         FROM books b
         JOIN categories c ON b.category_id = c.id
         JOIN publishers p ON b.publisher_id = p.id
         ORDER BY b.id
         LIMIT 10",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BookOverview {
                title: row.get(0)?,
                category: row.get(1)?,
                publisher: row.get(2)?,
                price: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn authors_with_books(conn: &Connection) -> StorageResult<Vec<AuthorBooks>> {
    let mut stmt = conn.prepare(
        "SELECT a.name, group_concat(b.title, ', ')
         FROM authors a
         JOIN book_authors ba ON a.id = ba.author_id
         JOIN books b ON ba.book_id = b.id
         GROUP BY a.id, a.name
         ORDER BY a.id
         LIMIT 10",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AuthorBooks {
                author: row.get(0)?,
                books: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn quotes_with_tags(conn: &Connection) -> StorageResult<Vec<QuoteOverview>> {
    let mut stmt = conn.prepare(
        "SELECT q.text, a.name, group_concat(t.name, ', ')
         FROM quotes q
         JOIN authors a ON q.author_id = a.id
         LEFT JOIN quote_tags qt ON q.id = qt.quote_id
         LEFT JOIN tags t ON qt.tag_id = t.id
         GROUP BY q.id, q.text, a.name
         ORDER BY q.id
         LIMIT 5",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(QuoteOverview {
                text: row.get(0)?,
                author: row.get(1)?,
                tags: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn statistics(conn: &Connection) -> StorageResult<Statistics> {
    let stats = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM books),
                (SELECT COUNT(*) FROM authors),
                (SELECT COUNT(*) FROM quotes),
                (SELECT COUNT(*) FROM categories),
                (SELECT AVG(price) FROM books)",
        [],
        |row| {
            Ok(Statistics {
                books: row.get::<_, i64>(0)? as u64,
                authors: row.get::<_, i64>(1)? as u64,
                quotes: row.get::<_, i64>(2)? as u64,
                categories: row.get::<_, i64>(3)? as u64,
                average_price: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

/// Cuts `text` to at most `max` characters, appending `...` when cut
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Runs the verification queries and logs their results
pub fn verify_relations(store: &SqliteStore) -> StorageResult<VerificationReport> {
    tracing::info!("Verifying relations...");
    let conn = store.conn();

    let books = books_with_relations(conn)?;
    tracing::info!("Books with category and publisher:");
    for book in &books {
        tracing::info!(
            "  {} | {} | {} | {:.2}",
            book.title,
            book.category,
            book.publisher,
            book.price.unwrap_or_default()
        );
    }

    let authors = authors_with_books(conn)?;
    tracing::info!("Authors with their books:");
    for entry in &authors {
        tracing::info!("  {}: {}", entry.author, entry.books);
    }

    let quotes = quotes_with_tags(conn)?;
    tracing::info!("Quotes with author and tags:");
    for quote in &quotes {
        tracing::info!(
            "  \"{}\" by {} [{}]",
            preview(&quote.text, QUOTE_PREVIEW_CHARS),
            quote.author,
            quote.tags.as_deref().unwrap_or("")
        );
    }

    let statistics = statistics(conn)?;
    tracing::info!(
        "Statistics: {} books, {} authors, {} quotes, {} categories, average price {:.2}",
        statistics.books,
        statistics.authors,
        statistics.quotes,
        statistics.categories,
        statistics.average_price.unwrap_or_default()
    );

    Ok(VerificationReport {
        books,
        authors,
        quotes,
        statistics,
    })
}
