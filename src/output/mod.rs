//! Output module for generated artifacts and run reports
//!
//! This module handles:
//! - Writing the robots.txt policy
//! - Recording run statistics and printing them
//! - Rendering markdown run reports
//! - Indented JSON serialisation shared by the JSON writers

mod markdown;
mod robots;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use robots::{write_robots_txt, DEFAULT_ROBOTS_TXT};
pub use stats::{print_summary, RunSummary};

use crate::Result;
use serde::Serialize;

/// Serialises a value as JSON with a four-space indent
pub fn to_indented_json<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}
