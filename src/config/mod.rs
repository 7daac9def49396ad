//! Configuration module for Book-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use book_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Catalog: {}", config.sources.catalog_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatabaseConfig, HttpConfig, OutputConfig, RandomConfig, ScrapeConfig, SourcesConfig,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
