//! site-mirror: WordPress as a static site
//!
//! This crate mirrors a live WordPress site (or its export archive) into a
//! self-contained static tree, rewriting the source host to the destination
//! host and adding a search index, a 404 page, a robots policy and a
//! redirect map.

pub mod config;
pub mod crawler;
pub mod output;
pub mod redirects;
pub mod search;
pub mod sitemap;
pub mod state;
pub mod url;
pub mod verify;

use thiserror::Error;

/// Main error type for site-mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Remote API {url} answered with status {status}")]
    RemoteApi { url: String, status: u16 },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialisation error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("XML parse error for {url}: {message}")]
    XmlParse { url: String, message: String },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),
}

/// Result type alias for site-mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelHandle, HttpFetcher, UrlResource, Workflow};
pub use redirects::{Redirect, RedirectSource, Redirects};
pub use search::{SearchDocument, SearchIndex};
pub use state::RunState;
pub use url::UrlKind;
