use crate::config::types::{Config, SourceKind};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_source(config)?;
    validate_destination(config)?;
    validate_page_names(config)?;
    validate_crawler_settings(config)?;
    validate_additional_urls(&config.additional)?;
    Ok(())
}

/// Validates the source URL and the credentials the source mode needs
fn validate_source(config: &Config) -> ConfigResult<()> {
    if config.source.url.is_empty() {
        return Err(ConfigError::Validation(
            "source url cannot be empty".to_string(),
        ));
    }

    validate_http_url("source url", &config.source.url)?;

    if config.source.kind == SourceKind::Archive && config.auth_token().is_empty() {
        return Err(ConfigError::Validation(
            "archive mode needs wordpress user and api-token".to_string(),
        ));
    }

    Ok(())
}

/// Validates destination URL and output directory
fn validate_destination(config: &Config) -> ConfigResult<()> {
    if !config.destination.url.is_empty() {
        validate_http_url("destination url", &config.destination.url)?;
    }

    if config.destination.output.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the search and 404 page directory names
fn validate_page_names(config: &Config) -> ConfigResult<()> {
    for (label, value) in [("search", &config.search), ("404", &config.page_404)] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} page name cannot be empty",
                label
            )));
        }

        if value.contains('/') || value.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "{} page name must be a single directory name, got '{}'",
                label, value
            )));
        }
    }

    Ok(())
}

/// Validates delay and retry settings
fn validate_crawler_settings(config: &Config) -> ConfigResult<()> {
    if !config.delay.is_finite() || config.delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            config.delay
        )));
    }

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.settings.schemes.is_empty() {
        return Err(ConfigError::Validation(
            "settings.schemes cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates additional seed URLs
fn validate_additional_urls(urls: &[String]) -> ConfigResult<()> {
    for url in urls {
        validate_http_url("additional url", url)?;
    }
    Ok(())
}

/// Parses a URL and requires an http(s) scheme and a host
fn validate_http_url(label: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            label, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            label, value
        )));
    }

    Ok(())
}
