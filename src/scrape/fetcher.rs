//! HTTP fetcher implementation
//!
//! This module handles all page requests for the scraper:
//! - Building one keep-alive HTTP client with the configured user agent
//! - GET requests classified into content, end-of-pagination and failures
//! - Fixed pauses between requests

use crate::config::HttpConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body content
        body: String,
    },

    /// HTTP 404, the pagination end signal
    NotFound,

    /// Any other non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Transport failure (connection refused, timeout, body read error)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Describes a terminal result for log lines and phase summaries
    pub fn describe(&self, url: &str) -> String {
        match self {
            Self::Success { .. } => format!("{} fetched", url),
            Self::NotFound => format!("{} returned 404", url),
            Self::HttpError { status_code } => format!("{} returned HTTP {}", url, status_code),
            Self::NetworkError { error } => format!("{} unreachable: {}", url, error),
        }
    }
}

/// Builds the HTTP client shared by every request of a run
///
/// # Example
///
/// ```no_run
/// use book_harvest::config::HttpConfig;
/// use book_harvest::scrape::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 2xx | Success |
/// | HTTP 404 | NotFound |
/// | Other HTTP status | HttpError |
/// | Timeout / connection / body error | NetworkError |
///
/// There is no retry: a failed request ends the calling phase.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            let final_url = response.url().to_string();

            if status == StatusCode::NOT_FOUND {
                return FetchResult::NotFound;
            }

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success { final_url, body },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            FetchResult::NetworkError { error }
        }
    }
}

/// Sleeps for the given number of milliseconds; zero returns immediately
pub async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
