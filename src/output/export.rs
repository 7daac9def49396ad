//! Flat-file exports of the stored data
//!
//! Three views are written to the output directory: books as CSV, quotes with
//! their tags as JSON, and author-book pairs as CSV. Every query has a total
//! ORDER BY so the same database always yields the same bytes.

use crate::storage::SqliteStore;
use crate::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const BOOKS_EXPORT: &str = "books_export.csv";
pub const QUOTES_EXPORT: &str = "quotes_export.json";
pub const RELATIONS_EXPORT: &str = "author_books_relations.csv";

#[derive(Debug, Serialize)]
struct BookRow {
    title: String,
    price: Option<String>,
    rating: Option<u8>,
    category: Option<String>,
    publisher: Option<String>,
    publication_year: Option<i32>,
}

/// One element of the quotes JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteExport {
    pub text: String,
    pub author: Option<String>,
    pub book_source: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RelationRow {
    author: String,
    book: String,
    publication_year: Option<i32>,
}

/// Number of records written per file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub books: usize,
    pub quotes: usize,
    pub relations: usize,
    pub files: Vec<PathBuf>,
}

/// Writes `rows` as CSV with a header taken from the row fields
///
/// An empty row set produces an empty file.
fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn export_books(conn: &Connection, path: &Path) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT b.title, b.price, b.rating, c.name, p.name, b.publication_year
         FROM books b
         LEFT JOIN categories c ON b.category_id = c.id
         LEFT JOIN publishers p ON b.publisher_id = p.id
         ORDER BY b.title, b.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BookRow {
                title: row.get(0)?,
                price: row.get::<_, Option<f64>>(1)?.map(|p| format!("{:.2}", p)),
                rating: row.get(2)?,
                category: row.get(3)?,
                publisher: row.get(4)?,
                publication_year: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    write_csv(path, &rows)?;
    tracing::info!("Books exported to {}: {} records", path.display(), rows.len());
    Ok(rows.len())
}

/// Loads quotes with their tags in tag-link order
pub fn load_quote_exports(conn: &Connection) -> Result<Vec<QuoteExport>> {
    let mut quotes_stmt = conn.prepare(
        "SELECT q.id, q.text, a.name, q.book_source
         FROM quotes q
         LEFT JOIN authors a ON q.author_id = a.id
         ORDER BY a.name, q.id",
    )?;
    let mut tags_stmt = conn.prepare(
        "SELECT t.name
         FROM quote_tags qt
         JOIN tags t ON qt.tag_id = t.id
         WHERE qt.quote_id = ?1
         ORDER BY qt.id",
    )?;

    let quotes = quotes_stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut exports = Vec::with_capacity(quotes.len());
    for (id, text, author, book_source) in quotes {
        let tags = tags_stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        exports.push(QuoteExport {
            text,
            author,
            book_source,
            tags,
        });
    }
    Ok(exports)
}

fn export_quotes(conn: &Connection, path: &Path) -> Result<usize> {
    let quotes = load_quote_exports(conn)?;

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &quotes)?;
    writer.flush()?;

    tracing::info!("Quotes exported to {}: {} records", path.display(), quotes.len());
    Ok(quotes.len())
}

fn export_relations(conn: &Connection, path: &Path) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT a.name, b.title, b.publication_year
         FROM authors a
         JOIN book_authors ba ON a.id = ba.author_id
         JOIN books b ON ba.book_id = b.id
         ORDER BY a.name, b.title, ba.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RelationRow {
                author: row.get(0)?,
                book: row.get(1)?,
                publication_year: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    write_csv(path, &rows)?;
    tracing::info!(
        "Author-book relations exported to {}: {} records",
        path.display(),
        rows.len()
    );
    Ok(rows.len())
}

/// Writes the three export files into `dir`
pub fn export_all(store: &SqliteStore, dir: &Path) -> Result<ExportReport> {
    tracing::info!("Exporting data to {}...", dir.display());
    let conn = store.conn();

    let books_path = dir.join(BOOKS_EXPORT);
    let quotes_path = dir.join(QUOTES_EXPORT);
    let relations_path = dir.join(RELATIONS_EXPORT);

    let books = export_books(conn, &books_path)?;
    let quotes = export_quotes(conn, &quotes_path)?;
    let relations = export_relations(conn, &relations_path)?;

    Ok(ExportReport {
        books,
        quotes,
        relations,
        files: vec![books_path, quotes_path, relations_path],
    })
}
