//! Output module for reporting on the stored data
//!
//! This module handles:
//! - The per-table insert summary
//! - Read-only verification joins
//! - CSV and JSON exports of derived views

mod export;
mod summary;
mod verify;

pub use export::{
    export_all, load_quote_exports, ExportReport, QuoteExport, BOOKS_EXPORT, QUOTES_EXPORT,
    RELATIONS_EXPORT,
};
pub use summary::{display_summary, load_table_counts, TableCounts};
pub use verify::{
    verify_relations, AuthorBooks, BookOverview, QuoteOverview, Statistics, VerificationReport,
};
