//! Configuration module for site-mirror
//!
//! This module handles loading, parsing, and validating TOML project files,
//! and building the script-mode configuration from environment variables.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("project.toml")).unwrap();
//! println!("Mirroring {} into {}", config.src_url(), config.output().display());
//! ```

mod parser;
mod settings;
mod types;
mod validation;

// Re-export types
pub use settings::{
    ApiSettings, CleanSettings, FormatRule, LunrSettings, RedirectFiles, SearchSettings,
    Settings, UserAgentSettings,
};
pub use types::{
    default_exclude, ArchiveConfig, Config, DestinationConfig, HostKind, SourceConfig, SourceKind,
    UserAgentProfile, WordPressConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
