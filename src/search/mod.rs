//! Client-side search index generation
//!
//! This module handles:
//! - Collecting a [`SearchDocument`] for each mirrored HTML page
//! - Injecting the search scripts into the search page
//! - Writing the JSON document index and the local search script
//! - Walking the output tree to feed the index

use crate::config::{Config, Settings};
use crate::crawler::parse_html;
use crate::output::to_indented_json;
use crate::url::update_links;
use crate::Result;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Index script shipped with the crate
const BUNDLED_SEARCH_SCRIPT: &str = include_str!("../../assets/search.js");

/// One indexed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchDocument {
    pub title: String,
    pub content: String,
    pub href: String,
}

/// Accumulates search documents for one run
#[derive(Debug, Clone)]
pub struct SearchIndex {
    search_dir: PathBuf,
    dst_url: String,
    reserved_dirs: Vec<String>,
    html_tags: Vec<String>,
    include_content: bool,
    script_name: String,
    index_name: String,
    script_template: Option<PathBuf>,
    lunr_tag: String,
    documents: Vec<SearchDocument>,
}

impl SearchIndex {
    /// Creates an empty index
    ///
    /// # Arguments
    ///
    /// * `search_dir` - Search page directory inside the output root
    /// * `dst_url` - Destination URL the hrefs are built on
    /// * `reserved_dirs` - Top-level directory names never indexed
    /// * `settings` - Supplies tags, file names and the lunr script tag
    pub fn new(
        search_dir: &Path,
        dst_url: &str,
        reserved_dirs: &[String],
        settings: &Settings,
    ) -> Self {
        let lunr = &settings.lunr;
        let lunr_tag = format!(
            r#"<script src="{}" integrity="{}" crossorigin="{}" referrerpolicy="{}"></script>"#,
            lunr.src, lunr.integrity, lunr.crossorigin, lunr.referrerpolicy
        );

        Self {
            search_dir: search_dir.to_path_buf(),
            dst_url: dst_url.trim_end_matches('/').to_string(),
            reserved_dirs: reserved_dirs.to_vec(),
            html_tags: settings.search.html_tags.clone(),
            include_content: settings.search.include_content,
            script_name: settings.search.index_script.clone(),
            index_name: settings.search.index_file.clone(),
            script_template: settings.search.script_template.clone(),
            lunr_tag,
            documents: Vec::new(),
        }
    }

    /// Indexed documents in insertion order
    pub fn documents(&self) -> &[SearchDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Adds a page to the index
    ///
    /// `url_path` is the page directory relative to the output root, `""`
    /// for the home page. Pages inside a reserved directory and pages
    /// without a title are skipped.
    ///
    /// # Returns
    ///
    /// True if a document was added
    pub fn add(&mut self, html: &str, url_path: &str) -> bool {
        let url_path = url_path.trim_matches('/');

        let top = url_path.split('/').next().unwrap_or_default();
        if !top.is_empty() && self.reserved_dirs.iter().any(|dir| dir == top) {
            debug!("Not indexing reserved page /{}/", url_path);
            return false;
        }

        let parsed = parse_html(html, &self.html_tags);
        let Some(title) = parsed.title else {
            debug!("Not indexing /{}/: no title", url_path);
            return false;
        };

        let href = self.href_for(url_path);
        let content = if self.include_content {
            parsed.text
        } else {
            title.clone()
        };

        self.documents.push(SearchDocument {
            title,
            content,
            href,
        });
        true
    }

    fn href_for(&self, url_path: &str) -> String {
        if url_path.is_empty() {
            format!("{}/", self.dst_url)
        } else {
            format!("{}/{}/", self.dst_url, url_path)
        }
    }

    /// Injects the search scripts into the search page and rewrites it
    ///
    /// Both tags go right before `</head>`. A page without a head, or one
    /// that already carries the local script tag, is left unchanged.
    pub fn update(&self, html: &str, output_path: &Path) -> Result<()> {
        let script_tag = format!(r#"<script src="{}"></script>"#, self.script_name);

        if html.contains(&script_tag) {
            debug!("Search scripts already present in {}", output_path.display());
            return Ok(());
        }

        let Some(head_end) = html.find("</head>") else {
            warn!(
                "Search page {} has no </head>, scripts not injected",
                output_path.display()
            );
            return Ok(());
        };

        let mut page = String::with_capacity(html.len() + self.lunr_tag.len() + script_tag.len());
        page.push_str(&html[..head_end]);
        page.push_str(&self.lunr_tag);
        page.push_str(&script_tag);
        page.push_str(&html[head_end..]);

        std::fs::write(output_path, page)?;
        info!("Injected search scripts into {}", output_path.display());
        Ok(())
    }

    /// Writes the index script into the search directory
    ///
    /// Uses the configured template when it exists, the bundled script
    /// otherwise.
    pub fn copy_scripts(&self) -> Result<()> {
        let destination = self.search_dir.join(&self.script_name);

        match &self.script_template {
            Some(template) if template.is_file() => {
                std::fs::copy(template, &destination)?;
            }
            Some(template) => {
                warn!(
                    "Search script template {} not found, using bundled script",
                    template.display()
                );
                std::fs::write(&destination, BUNDLED_SEARCH_SCRIPT)?;
            }
            None => std::fs::write(&destination, BUNDLED_SEARCH_SCRIPT)?,
        }

        debug!("Wrote {}", destination.display());
        Ok(())
    }

    /// Writes the document index, only when the search directory exists
    pub fn save(&self) -> Result<()> {
        if !self.search_dir.is_dir() {
            debug!(
                "Search directory {} missing, index not written",
                self.search_dir.display()
            );
            return Ok(());
        }

        let path = self.search_dir.join(&self.index_name);
        std::fs::write(&path, to_indented_json(&self.documents)?)?;
        info!("Wrote {} search documents to {}", self.len(), path.display());
        Ok(())
    }
}

/// Feeds every mirrored `index.html` into `index`
///
/// Pages under a path component equal to an exclusion entry are skipped.
/// Each page has its source host rewritten first; the search page itself is
/// passed to [`SearchIndex::update`], every other page to
/// [`SearchIndex::add`]. Unreadable pages are logged and skipped. The walk
/// stops early once `keep_running` returns false.
///
/// # Returns
///
/// The number of pages visited
pub fn index_output_tree<F>(config: &Config, index: &mut SearchIndex, keep_running: F) -> Result<usize>
where
    F: Fn() -> bool,
{
    let output = config.output();
    let excluded: Vec<&str> = config
        .exclude
        .iter()
        .map(|entry| entry.trim_matches('/'))
        .filter(|entry| !entry.is_empty())
        .collect();

    let mut visited = 0;

    for entry in WalkDir::new(output).sort_by_file_name() {
        if !keep_running() {
            info!("Search indexing interrupted");
            break;
        }

        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != "index.html" {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(output) else {
            continue;
        };
        let components: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if components.iter().any(|c| excluded.contains(&c.as_str())) {
            continue;
        }

        let content = match std::fs::read(entry.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!("Cannot read {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let content = update_links(&content, config.src_url(), config.dst_url());

        let url_path = components[..components.len() - 1].join("/");
        if url_path == config.search {
            index.update(&content, entry.path())?;
        } else {
            index.add(&content, &url_path);
        }
        visited += 1;
    }

    Ok(visited)
}
