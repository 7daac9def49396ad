//! SQLite relational store
//!
//! Every insert phase runs in its own transaction. The first error in a phase
//! rolls back that phase only; the returned [`PhaseSummary`] then carries the
//! reason and the pipeline moves on to the next phase.

use crate::model::{AuthorRecord, ItemOutcome, PhaseSummary, QuoteRecord};
use crate::normalize::NormalizedBook;
use crate::storage::schema::{recreate_schema, TABLES};
use crate::storage::{StorageError, StorageResult};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;

/// Probability that a quote gets a (random) book source
const BOOK_SOURCE_PROBABILITY: f64 = 0.3;

/// Number of leading books quote sources are drawn from
const BOOK_SOURCE_POOL: u32 = 50;

/// Upper bound of authors linked to one book
const MAX_AUTHORS_PER_BOOK: usize = 3;

/// A quote row together with the tags still to be linked to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedQuote {
    pub id: i64,
    pub tags: Vec<String>,
}

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database file
    ///
    /// The schema is not touched; call [`SqliteStore::create_schema`].
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        tracing::info!("Opened database {}", path.display());
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Drops and recreates all eight tables
    pub fn create_schema(&self) -> StorageResult<()> {
        recreate_schema(&self.conn)?;
        tracing::info!("Schema created ({} tables)", TABLES.len());
        Ok(())
    }

    /// Runs `body` in a transaction and reports the phase outcome
    ///
    /// On error the transaction is dropped (rolled back), the summary is
    /// marked rolled back and `T::default()` is returned.
    fn run_phase<T, F>(&mut self, phase: &str, table: &str, body: F) -> (T, PhaseSummary)
    where
        T: Default,
        F: FnOnce(&Transaction<'_>, &mut PhaseSummary) -> StorageResult<T>,
    {
        tracing::info!("Inserting {}...", phase);
        let mut summary = PhaseSummary::new(phase);

        let outcome = self
            .conn
            .transaction()
            .map_err(StorageError::from)
            .and_then(|tx| {
                let value = body(&tx, &mut summary)?;
                tx.commit()?;
                Ok(value)
            });

        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Inserting {} failed, phase rolled back: {}", phase, e);
                summary.roll_back(e.to_string());
                T::default()
            }
        };

        match self.count_rows(table) {
            Ok(count) => tracing::info!("{} in table: {}", table, count),
            Err(e) => tracing::warn!("Could not count {}: {}", table, e),
        }
        if !summary.skipped.is_empty() {
            tracing::warn!("{} {} skipped", summary.skipped.len(), phase);
        }

        (value, summary)
    }

    fn insert_names(&mut self, table: &str, names: &[String]) -> PhaseSummary {
        let sql = format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", table);
        let ((), summary) = self.run_phase(table, table, |tx, summary| {
            let mut stmt = tx.prepare(&sql)?;
            for name in names {
                let changed = stmt.execute(params![name])?;
                summary.record(insert_outcome(changed));
            }
            Ok(())
        });
        summary
    }

    /// Inserts category names, ignoring names already present
    pub fn insert_categories(&mut self, names: &[String]) -> PhaseSummary {
        self.insert_names("categories", names)
    }

    /// Inserts publisher names, ignoring names already present
    pub fn insert_publishers(&mut self, names: &[String]) -> PhaseSummary {
        self.insert_names("publishers", names)
    }

    /// Inserts tag names, ignoring names already present
    pub fn insert_tags(&mut self, names: &[String]) -> PhaseSummary {
        self.insert_names("tags", names)
    }

    /// Inserts authors, ignoring an existing (name, birth_date) pair
    pub fn insert_authors(&mut self, authors: &[AuthorRecord]) -> PhaseSummary {
        let ((), summary) = self.run_phase("authors", "authors", |tx, summary| {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO authors (name, birth_date, death_date, bio, openlibrary_key)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for author in authors {
                let changed = stmt.execute(params![
                    author.name,
                    author.birth_date,
                    author.death_date,
                    author.bio,
                    author.openlibrary_key
                ])?;
                summary.record(insert_outcome(changed));
            }
            Ok(())
        });
        summary
    }

    /// Inserts books and returns their row ids in input order
    ///
    /// The category is looked up by name, falling back to a random existing
    /// category. The publisher is looked up the same way.
    pub fn insert_books<R: Rng + ?Sized>(
        &mut self,
        books: &[NormalizedBook],
        rng: &mut R,
    ) -> (Vec<i64>, PhaseSummary) {
        self.run_phase("books", "books", |tx, summary| {
            let (categories, category_ids) = name_ids(tx, "categories")?;
            let (publishers, publisher_ids) = name_ids(tx, "publishers")?;

            let mut stmt = tx.prepare(
                "INSERT INTO books (title, price, availability, description, rating,
                                    image_url, upc, publication_year, category_id, publisher_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            let mut ids = Vec::with_capacity(books.len());
            for entry in books {
                let category_id = match lookup(&categories, entry.category.as_deref()) {
                    Some(id) => Some(id),
                    None => category_ids.choose(rng).copied(),
                };
                let publisher_id = match lookup(&publishers, entry.publisher.as_deref()) {
                    Some(id) => Some(id),
                    None => publisher_ids.choose(rng).copied(),
                };

                let book = &entry.book;
                let id = stmt.insert(params![
                    book.title,
                    book.price,
                    book.availability,
                    book.description,
                    book.rating,
                    book.image_url,
                    book.upc,
                    book.publication_year,
                    category_id,
                    publisher_id
                ])?;
                ids.push(id);
                summary.record(ItemOutcome::Done);
            }
            Ok(ids)
        })
    }

    /// Links every book to 1..=3 distinct random authors
    ///
    /// With no authors in the table each book is recorded as skipped.
    pub fn insert_book_authors<R: Rng + ?Sized>(
        &mut self,
        book_ids: &[i64],
        rng: &mut R,
    ) -> PhaseSummary {
        let ((), summary) = self.run_phase("book authors", "book_authors", |tx, summary| {
            let (_, author_ids) = name_ids(tx, "authors")?;
            if author_ids.is_empty() {
                for book_id in book_ids {
                    summary.record(ItemOutcome::Skipped(format!(
                        "book {}: no authors to link",
                        book_id
                    )));
                }
                return Ok(());
            }

            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO book_authors (book_id, author_id) VALUES (?1, ?2)",
            )?;
            let upper = author_ids.len().min(MAX_AUTHORS_PER_BOOK);
            for &book_id in book_ids {
                let count = rng.gen_range(1..=upper);
                for &author_id in author_ids.choose_multiple(rng, count) {
                    let changed = stmt.execute(params![book_id, author_id])?;
                    summary.record(insert_outcome(changed));
                }
            }
            Ok(())
        });
        summary
    }

    /// Inserts quotes and returns their row ids with the tags to link
    ///
    /// Unknown or missing authors leave `author_id` NULL. With probability
    /// 0.3 a quote gets a random title among the first 50 books as its
    /// source.
    pub fn insert_quotes<R: Rng + ?Sized>(
        &mut self,
        quotes: &[QuoteRecord],
        rng: &mut R,
    ) -> (Vec<InsertedQuote>, PhaseSummary) {
        self.run_phase("quotes", "quotes", |tx, summary| {
            let (authors, _) = name_ids(tx, "authors")?;
            let titles = {
                let mut stmt = tx.prepare("SELECT title FROM books ORDER BY id LIMIT ?1")?;
                let rows = stmt.query_map(params![BOOK_SOURCE_POOL], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            let mut stmt =
                tx.prepare("INSERT INTO quotes (text, author_id, book_source) VALUES (?1, ?2, ?3)")?;

            let mut inserted = Vec::with_capacity(quotes.len());
            for quote in quotes {
                let author_id = lookup(&authors, quote.author.as_deref());
                if author_id.is_none() {
                    tracing::warn!("No author row for quote by {:?}", quote.author);
                }

                let book_source = if rng.gen_bool(BOOK_SOURCE_PROBABILITY) {
                    titles.choose(rng).cloned()
                } else {
                    None
                };

                let id = stmt.insert(params![quote.text, author_id, book_source])?;
                inserted.push(InsertedQuote {
                    id,
                    tags: quote.tags.clone(),
                });
                summary.record(ItemOutcome::Done);
            }
            Ok(inserted)
        })
    }

    /// Links inserted quotes to their tags; tags missing from the table are skipped
    pub fn insert_quote_tags(&mut self, quotes: &[InsertedQuote]) -> PhaseSummary {
        let ((), summary) = self.run_phase("quote tags", "quote_tags", |tx, summary| {
            let (tags, _) = name_ids(tx, "tags")?;
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO quote_tags (quote_id, tag_id) VALUES (?1, ?2)")?;

            for quote in quotes {
                for tag in &quote.tags {
                    match tags.get(tag) {
                        Some(&tag_id) => {
                            let changed = stmt.execute(params![quote.id, tag_id])?;
                            summary.record(insert_outcome(changed));
                        }
                        None => summary.record(ItemOutcome::Skipped(format!(
                            "quote {}: unknown tag {}",
                            quote.id, tag
                        ))),
                    }
                }
            }
            Ok(())
        });
        summary
    }

    /// Counts the rows of one of the schema's tables
    pub fn count_rows(&self, table: &str) -> StorageResult<u64> {
        if !TABLES.contains(&table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Read access for reporting queries
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::from(e))?;
        tracing::info!("Database connection closed");
        Ok(())
    }
}

fn insert_outcome(changed: usize) -> ItemOutcome {
    if changed > 0 {
        ItemOutcome::Done
    } else {
        ItemOutcome::Ignored
    }
}

fn lookup(ids: &HashMap<String, i64>, name: Option<&str>) -> Option<i64> {
    name.and_then(|name| ids.get(name).copied())
}

/// Loads `name -> id` of a named table along with all ids in insertion order
fn name_ids(conn: &Connection, table: &str) -> StorageResult<(HashMap<String, i64>, Vec<i64>)> {
    let mut stmt = conn.prepare(&format!("SELECT id, name FROM {} ORDER BY id", table))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let ids = rows.iter().map(|(id, _)| *id).collect();
    let by_name = rows.into_iter().map(|(id, name)| (name, id)).collect();
    Ok((by_name, ids))
}
