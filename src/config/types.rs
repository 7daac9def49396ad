use serde::Deserialize;

/// Main configuration structure for Book-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub random: RandomConfig,
}

/// HTTP client and pacing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause after each listing page (milliseconds)
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Pause after each book detail page (milliseconds)
    #[serde(default = "default_detail_delay_ms")]
    pub detail_delay_ms: u64,

    /// Pause after each author lookup (milliseconds)
    #[serde(default = "default_lookup_delay_ms")]
    pub lookup_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            page_delay_ms: default_page_delay_ms(),
            detail_delay_ms: default_detail_delay_ms(),
            lookup_delay_ms: default_lookup_delay_ms(),
        }
    }
}

/// Base URLs of the scraped sites and the lookup API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourcesConfig {
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default = "default_quotes_url")]
    pub quotes_url: String,

    #[serde(default = "default_openlibrary_url")]
    pub openlibrary_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            quotes_url: default_quotes_url(),
            openlibrary_url: default_openlibrary_url(),
        }
    }
}

/// Pagination safety caps
///
/// Paging normally ends on an empty page or a 404; these caps only bound
/// runs where that never happens (or tests that want fewer pages).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScrapeConfig {
    pub max_catalog_pages: Option<u32>,
    pub max_quote_pages: Option<u32>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the export files
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Randomness configuration for synthetic assignments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RandomConfig {
    /// Fixed seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_detail_delay_ms() -> u64 {
    200
}

fn default_lookup_delay_ms() -> u64 {
    500
}

fn default_catalog_url() -> String {
    "https://books.toscrape.com".to_string()
}

fn default_quotes_url() -> String {
    "https://quotes.toscrape.com".to_string()
}

fn default_openlibrary_url() -> String {
    "https://openlibrary.org".to_string()
}

fn default_output_directory() -> String {
    ".".to_string()
}
