//! Markdown run report
//!
//! Renders a [`RunSummary`] as a small markdown document that can be kept
//! next to the mirrored tree.

use crate::output::stats::RunSummary;
use crate::Result;
use std::path::Path;

/// Writes the markdown report of a run to `output_path`
pub fn write_markdown_report(summary: &RunSummary, output_path: &Path) -> Result<()> {
    std::fs::write(output_path, format_markdown_report(summary))?;
    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_report(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Mirror Report: {}\n\n", summary.project));

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **State**: {}\n", summary.state));
    md.push_str(&format!(
        "- **Started**: {}\n",
        summary.started_at.to_rfc3339()
    ));
    if let Some(finished) = summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!("- **Duration**: {:.1} seconds\n", duration));
    }
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Project Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Resources\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Saved | {} |\n", summary.saved));
    md.push_str(&format!("| Ignored | {} |\n", summary.ignored));
    md.push_str(&format!("| Unreachable | {} |\n\n", summary.unreachable));

    md.push_str("## Artifacts\n\n");
    md.push_str(&format!("- **Redirects**: {}\n", summary.redirects));
    md.push_str(&format!(
        "- **Search Documents**: {}\n\n",
        summary.search_documents
    ));

    if !summary.failed_stages.is_empty() {
        md.push_str("## Failed Stages\n\n");
        for (stage, error) in &summary.failed_stages {
            md.push_str(&format!("- `{}`: {}\n", stage, error));
        }
        md.push('\n');
    }

    md
}
