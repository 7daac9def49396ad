use crate::config::types::{Config, DatabaseConfig, HttpConfig, OutputConfig, SourcesConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_sources(&config.sources)?;
    validate_database_config(&config.database)?;
    validate_output_config(&config.output)?;

    if config.scrape.max_catalog_pages == Some(0) || config.scrape.max_quote_pages == Some(0) {
        return Err(ConfigError::Validation(
            "page caps must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates the source base URLs
fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("catalog_url", &config.catalog_url),
        ("quotes_url", &config.quotes_url),
        ("openlibrary_url", &config.openlibrary_url),
    ] {
        validate_base_url(name, value)?;
    }
    Ok(())
}

/// A base URL must be absolute http(s)
fn validate_base_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}
