//! Crawl orchestrator - main batch run logic
//!
//! This module contains the [`Workflow`] that drives one batch run:
//! - Acquiring content (export archive or recursive crawl)
//! - Deduplicating resources by identity hash
//! - Politeness delays between requests
//! - Post-processing stages (404 page, robots.txt, redirects, search)
//! - Cooperative cancellation from another task

use crate::config::{Config, SourceKind};
use crate::crawler::archive::{clear_output_dir, extract_zip, flatten_wrapper, ExportSettings};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::resource::UrlResource;
use crate::output::{write_robots_txt, RunSummary};
use crate::redirects::Redirects;
use crate::search::{index_output_tree, SearchIndex};
use crate::sitemap::{extract_sitemap_paths, find_sitemap_location};
use crate::state::RunState;
use crate::url::{extract_urls_from_raw_text, UrlKind};
use crate::{MirrorError, Result};
use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Requests cancellation of a running [`Workflow`]
///
/// Cloneable and usable from any task. Cancellation is polled: a request
/// already in flight completes first.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            tracing::warn!("Cancellation requested, stopping after the current request");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Orchestrates one mirroring project
pub struct Workflow {
    config: Config,
    config_hash: Option<String>,
    fetcher: HttpFetcher,
    state: RunState,
    cancel: CancelHandle,
    visited: HashSet<String>,
    redirects: Redirects,
    summary: RunSummary,
}

impl Workflow {
    /// Creates a workflow with an HTTP client built from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The project configuration, owned by this workflow
    ///
    /// # Returns
    ///
    /// * `Ok(Workflow)` - Ready to run, in state [`RunState::Idle`]
    /// * `Err(MirrorError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Creates a workflow around an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: HttpFetcher) -> Self {
        let summary = RunSummary::new(&config.name);
        Self {
            config,
            config_hash: None,
            fetcher,
            state: RunState::Idle,
            cancel: CancelHandle::default(),
            visited: HashSet::new(),
            redirects: Redirects::new(),
            summary,
        }
    }

    /// Records the hash of the project file in run summaries
    pub fn set_config_hash(&mut self, hash: &str) {
        self.config_hash = Some(hash.to_string());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Handle for requesting cancellation from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Number of distinct resources visited in the current run
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Redirects collected by the last run
    pub fn redirects(&self) -> &Redirects {
        &self.redirects
    }

    fn keep_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Run state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Runs every stage of a batch
    ///
    /// Stages run in order, each skipped once cancellation is requested:
    /// 1. Content: export archive or recursive crawl
    /// 2. 404 page
    /// 3. robots.txt
    /// 4. Redirects
    /// 5. Search index
    ///
    /// A failing stage is logged and recorded; the remaining stages still
    /// run. The run ends in [`RunState::Done`], or [`RunState::Stopped`]
    /// when cancelled.
    pub async fn batch_processing(&mut self) -> RunSummary {
        self.summary = RunSummary::new(&self.config.name);
        self.summary.config_hash = self.config_hash.clone();

        if let Err(e) = self.transition(RunState::Running) {
            tracing::error!("Cannot start run: {}", e);
            self.summary.record_failure("start", &e.to_string());
            self.summary.finish(self.state);
            return self.summary.clone();
        }

        tracing::info!(
            "Starting {} run for {} into {}",
            match self.config.source.kind {
                SourceKind::Archive => "archive",
                SourceKind::Crawl => "crawl",
            },
            self.config.src_url(),
            self.config.output().display()
        );

        self.visited.clear();
        self.fetcher.clear_cache();
        self.redirects = Redirects::new();

        if self.keep_running() {
            let (stage, result) = match self.config.source.kind {
                SourceKind::Archive => ("archive", self.archive_stage().await),
                SourceKind::Crawl => ("crawl", self.crawl_stage().await),
            };
            self.record_stage(stage, result);
        }

        if self.keep_running() {
            let result = self.add_404_page().await;
            self.record_stage("404", result);
        }

        if self.keep_running() {
            let result = self.add_robots_txt();
            self.record_stage("robots", result);
        }

        if self.keep_running() {
            let result = self.add_redirects().await;
            self.record_stage("redirects", result);
        }

        if self.keep_running() {
            let result = self.add_search();
            self.record_stage("search", result);
        }

        self.finish_run();
        self.summary.clone()
    }

    fn record_stage(&mut self, stage: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::error!("Stage {} failed: {}", stage, e);
            self.summary.record_failure(stage, &e.to_string());
        }
    }

    fn finish_run(&mut self) {
        let outcome = if self.keep_running() {
            self.transition(RunState::Done)
        } else {
            self.transition(RunState::Stopping)
                .and_then(|_| self.transition(RunState::Stopped))
        };
        if let Err(e) = outcome {
            tracing::error!("{}", e);
        }

        self.summary.finish(self.state);
        tracing::info!(
            "Run {}: {} saved, {} ignored",
            self.state,
            self.summary.saved,
            self.summary.ignored
        );
    }

    async fn archive_stage(&mut self) -> Result<()> {
        self.update_export_settings().await?;
        self.download_archive().await?;
        if self.keep_running() {
            self.setup_archive_folders()?;
        }
        Ok(())
    }

    /// Refreshes the archive coordinates from the export plugin
    ///
    /// Falls back to configured coordinates when the plugin cannot be read.
    pub async fn update_export_settings(&mut self) -> Result<()> {
        match ExportSettings::fetch(&self.config, &self.fetcher).await {
            Ok(settings) => {
                tracing::info!("Export archive: {}", settings.archive_name);
                settings.apply(&mut self.config);
                Ok(())
            }
            Err(e) if !self.config.source.archive.name.is_empty() => {
                tracing::warn!(
                    "Export settings unavailable ({}), using configured archive {}",
                    e,
                    self.config.source.archive.name
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Clears the output root and downloads the export archive into it
    pub async fn download_archive(&mut self) -> Result<()> {
        clear_output_dir(self.config.output())?;

        let mut archive = UrlResource::new(&self.config.archive_url(), UrlKind::Zip, "", &self.config);
        archive.fetch(&self.fetcher).await;
        if archive.is_ignored() {
            return Err(MirrorError::Archive(format!(
                "archive {} answered with status {}",
                archive.loc(),
                archive.status()
            )));
        }

        archive
            .save(self.config.output(), "", &self.fetcher)
            .await?;
        tracing::info!("Downloaded {}", archive.loc());
        Ok(())
    }

    /// Unpacks the downloaded archive and flattens its wrapper directory
    pub fn setup_archive_folders(&mut self) -> Result<()> {
        let archive_path = self.config.archive_path();
        let output = self.config.output();

        extract_zip(&archive_path, output)?;
        std::fs::remove_file(&archive_path)?;

        // Prune the now-empty download folders up to the output root
        let mut dir = archive_path.parent();
        while let Some(current) = dir {
            if current == output || std::fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }

        if !flatten_wrapper(output, &self.config.source.archive.name)? {
            tracing::warn!(
                "No {} directory in the archive, keeping its layout",
                self.config.source.archive.name
            );
        }
        Ok(())
    }

    async fn crawl_stage(&mut self) -> Result<()> {
        std::fs::create_dir_all(self.config.output())?;

        for seed in self.crawl_seeds().await {
            if !self.keep_running() {
                break;
            }
            self.crawl_url(&seed).await;
        }
        Ok(())
    }

    /// Seeds of a crawl, in order: the sitemap, the sitemaps it lists, the
    /// additional locations and the home page
    async fn crawl_seeds(&mut self) -> Vec<String> {
        if self.config.sitemap.is_empty() {
            let located =
                find_sitemap_location(self.config.src_url(), &self.fetcher, &self.config.settings)
                    .await;
            self.config.sitemap = located;
        }

        let mut seeds = Vec::new();
        if let Some(sitemap_url) = self.config.sitemap_url() {
            let leaves = extract_sitemap_paths(&sitemap_url, &self.fetcher).await;
            tracing::info!("Sitemap {} lists {} locations", sitemap_url, leaves.len());
            seeds.push(sitemap_url);
            seeds.extend(leaves);
        }
        // Additional entries may already point at the destination host
        let additional = self.config.additional.join("\n");
        seeds.extend(extract_urls_from_raw_text(
            &additional,
            self.config.dst_url(),
            self.config.src_url(),
        ));
        seeds.push(format!("{}/", self.config.src_url()));
        seeds
    }

    /// Crawls `loc` and everything reachable from it on the same host
    ///
    /// Depth-first over an explicit stack. Each location is fetched at most
    /// once per run; cancellation is checked before every location.
    pub async fn crawl_url(&mut self, loc: &str) {
        let scheme = self.config.scheme();
        let mut stack = vec![loc.to_string()];

        while let Some(next) = stack.pop() {
            if !self.keep_running() {
                tracing::debug!("Crawl of {} interrupted", loc);
                break;
            }

            let mut resource = UrlResource::new(&next, UrlKind::Folder, &scheme, &self.config);
            if self.visited.contains(resource.hash()) {
                continue;
            }

            let fetchable = resource.is_valid() && resource.kind() != UrlKind::None;
            if fetchable {
                self.politeness_delay().await;
            }
            resource.fetch(&self.fetcher).await;

            let (path, save_failed) = match resource
                .save(self.config.output(), self.config.dst_url(), &self.fetcher)
                .await
            {
                Ok(path) => (path, false),
                Err(e) => {
                    tracing::warn!("Failed to save {}: {}", resource.loc(), e);
                    (resource.path().to_string(), true)
                }
            };
            self.visited.insert(resource.hash().to_string());

            let ignored = resource.is_ignored() || save_failed;
            self.summary
                .record_resource(ignored, fetchable && resource.page().is_unreachable());
            tracing::info!(
                "{}: {} {} {}",
                if ignored { "Ignored" } else { "Saved" },
                resource.status(),
                resource.kind(),
                path
            );

            // Reversed so the first link is crawled first
            stack.extend(resource.internal_links().iter().rev().cloned());
        }
    }

    async fn politeness_delay(&self) {
        let jitter: f64 = rand::rng().random_range(0.0..0.01);
        let delay = (self.config.delay + jitter).max(0.0);
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }

    /// Fetches the custom 404 page and promotes it to `404.html`
    ///
    /// A page answered with 404 is written straight to `404.html`; otherwise
    /// its `index.html` in the 404 directory is copied up and the directory
    /// removed.
    pub async fn add_404_page(&mut self) -> Result<()> {
        let scheme = self.config.scheme();
        let mut page = UrlResource::new(
            &self.config.page_404_url(),
            UrlKind::Folder,
            &scheme,
            &self.config,
        );
        page.fetch(&self.fetcher).await;
        if let Err(e) = page
            .save(self.config.output(), self.config.dst_url(), &self.fetcher)
            .await
        {
            tracing::warn!("Failed to save 404 page {}: {}", page.loc(), e);
        }

        let page_404_dir = self.config.page_404_path();
        let page_404_index = page_404_dir.join("index.html");
        if page_404_index.is_file() {
            std::fs::copy(&page_404_index, self.config.output().join("404.html"))?;
            std::fs::remove_dir_all(&page_404_dir)?;
            tracing::info!("Promoted {} to 404.html", page_404_index.display());
        } else if page.status() == 404 {
            tracing::info!("Saved 404 page from {}", page.loc());
        } else {
            tracing::warn!("No 404 page produced for {}", page.loc());
        }
        Ok(())
    }

    /// Writes robots.txt into the output root
    pub fn add_robots_txt(&mut self) -> Result<()> {
        write_robots_txt(
            self.config.output(),
            self.config.settings.robots_template.as_deref(),
        )?;
        Ok(())
    }

    /// Collects redirects and writes the host's redirect file
    ///
    /// A failing redirect plugin leaves only the search rule.
    pub async fn add_redirects(&mut self) -> Result<()> {
        if let Some(api_url) = self.config.redirects_api_url() {
            self.redirects
                .get_from_plugin(&api_url, &self.config.auth_token(), &self.fetcher)
                .await;
        }

        if self.config.search_path().is_dir() {
            self.redirects.add_search(&self.config.search);
        }

        self.redirects
            .save(&self.config.redirects_file(), self.config.destination.host)?;
        self.summary.redirects = self.redirects.len();
        Ok(())
    }

    /// Builds the search index when the mirror has a search page
    pub fn add_search(&mut self) -> Result<()> {
        let search_dir = self.config.search_path();
        if !search_dir.is_dir() {
            tracing::info!(
                "No search page at {}, search index skipped",
                search_dir.display()
            );
            return Ok(());
        }

        let mut index = SearchIndex::new(
            &search_dir,
            self.config.dst_url(),
            &self.config.reserved_dirs(),
            &self.config.settings,
        );
        let cancel = self.cancel.clone();
        let pages = index_output_tree(&self.config, &mut index, || !cancel.is_cancelled())?;
        index.copy_scripts()?;
        index.save()?;

        tracing::info!(
            "Indexed {} of {} pages for search",
            index.len(),
            pages
        );
        self.summary.search_documents = index.len();
        Ok(())
    }
}
