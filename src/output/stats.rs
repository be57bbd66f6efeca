//! Run statistics
//!
//! This module provides the counters collected while a batch run executes
//! and their console rendering.

use crate::state::RunState;
use chrono::{DateTime, Utc};

/// Outcome of one batch run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Project name
    pub project: String,

    /// Hash of the project file, when the run was started from one
    pub config_hash: Option<String>,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// State the run ended in
    pub state: RunState,

    /// Resources written to the output tree
    pub saved: u64,

    /// Resources excluded or answered with an error status
    pub ignored: u64,

    /// Resources that could not be reached at all (subset of `ignored`)
    pub unreachable: u64,

    /// Redirect rules written
    pub redirects: usize,

    /// Documents in the search index
    pub search_documents: usize,

    /// Stages that failed, with their error message
    pub failed_stages: Vec<(String, String)>,
}

impl RunSummary {
    /// Starts a summary for a run beginning now
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            config_hash: None,
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Running,
            saved: 0,
            ignored: 0,
            unreachable: 0,
            redirects: 0,
            search_documents: 0,
            failed_stages: Vec::new(),
        }
    }

    /// Records one crawled resource
    pub fn record_resource(&mut self, ignored: bool, unreachable: bool) {
        if ignored {
            self.ignored += 1;
            if unreachable {
                self.unreachable += 1;
            }
        } else {
            self.saved += 1;
        }
    }

    /// Records a stage that returned an error
    pub fn record_failure(&mut self, stage: &str, error: &str) {
        self.failed_stages
            .push((stage.to_string(), error.to_string()));
    }

    /// Stamps the finish time and final state
    pub fn finish(&mut self, state: RunState) {
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    /// Number of distinct resources visited
    pub fn visited(&self) -> u64 {
        self.saved + self.ignored
    }

    /// Wall-clock duration, once finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Returns true if every stage succeeded and the run was not cancelled
    pub fn is_clean(&self) -> bool {
        self.state == RunState::Done && self.failed_stages.is_empty()
    }
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Mirror Summary: {} ===\n", summary.project);

    println!("Run:");
    println!("  State: {}", summary.state);
    println!("  Started: {}", summary.started_at.to_rfc3339());
    if let Some(duration) = summary.duration_seconds() {
        println!("  Duration: {:.1}s", duration);
    }
    if let Some(hash) = &summary.config_hash {
        println!("  Project hash: {}", hash);
    }
    println!();

    println!("Resources:");
    println!("  Visited: {}", summary.visited());
    println!("  Saved: {}", summary.saved);
    println!(
        "  Ignored: {} ({} unreachable)",
        summary.ignored, summary.unreachable
    );
    println!();

    println!("Artifacts:");
    println!("  Redirects: {}", summary.redirects);
    println!("  Search documents: {}", summary.search_documents);
    println!();

    if !summary.failed_stages.is_empty() {
        println!("Failed Stages:");
        for (stage, error) in &summary.failed_stages {
            println!("  - {}: {}", stage, error);
        }
        println!();
    }
}
