//! Crawler module for fetching and materialising the mirrored site
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching with retries and a per-run GET cache
//! - HTML parsing for titles, indexable text and sitemap links
//! - Classified resources that fetch and save themselves
//! - Export archive download and unpacking
//! - Overall batch orchestration with cancellation

mod archive;
mod coordinator;
mod fetcher;
mod parser;
mod resource;

pub use archive::{clear_output_dir, extract_zip, flatten_wrapper, ExportSettings};
pub use coordinator::{CancelHandle, Workflow};
pub use fetcher::{build_http_client, FetchedPage, HttpFetcher, UNREACHABLE_STATUS};
pub use parser::{find_sitemap_link, parse_html, ParsedPage};
pub use resource::UrlResource;
