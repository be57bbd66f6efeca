//! Export archive handling
//!
//! This module covers the archive source mode:
//! - Reading the archive coordinates from the export plugin
//! - Clearing the output root before a download
//! - Unpacking the archive and flattening its wrapper directory

use crate::config::Config;
use crate::crawler::fetcher::HttpFetcher;
use crate::url::find_links;
use crate::{MirrorError, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Component, Path};
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

/// Archive coordinates published by the export plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Archive base name without the `.zip` extension
    pub archive_name: String,

    /// URL path of the folder holding the archive, when the plugin reported
    /// a download link
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportSettingsResponse {
    archive_name: String,
    #[serde(default)]
    archive_status_messages: Option<StatusMessages>,
}

#[derive(Debug, Deserialize)]
struct StatusMessages {
    create_zip_archive: Option<StatusMessage>,
}

#[derive(Debug, Deserialize)]
struct StatusMessage {
    #[serde(default)]
    message: String,
}

impl ExportSettings {
    /// Reads the export plugin settings with the project credentials
    pub async fn fetch(config: &Config, fetcher: &HttpFetcher) -> Result<Self> {
        let api_url = config.export_settings_url();
        let (status, body) = fetcher.get_authorized(&api_url, &config.auth_token()).await?;
        if status >= 399 {
            return Err(MirrorError::RemoteApi {
                url: api_url,
                status,
            });
        }
        Self::from_json(&body)
    }

    /// Parses a settings payload
    pub fn from_json(body: &str) -> Result<Self> {
        let response: ExportSettingsResponse = serde_json::from_str(body)?;

        let message = response
            .archive_status_messages
            .and_then(|messages| messages.create_zip_archive)
            .map(|status| status.message)
            .unwrap_or_default();

        let folder = find_links(&message)
            .first()
            .and_then(|link| Url::parse(link).ok())
            .and_then(|link| {
                link.path()
                    .split(response.archive_name.as_str())
                    .next()
                    .map(str::to_string)
            })
            .filter(|folder| !folder.is_empty());

        Ok(Self {
            archive_name: response.archive_name,
            folder,
        })
    }

    /// Writes the coordinates into the project configuration
    pub fn apply(&self, config: &mut Config) {
        config.source.archive.name = self.archive_name.clone();
        if let Some(folder) = &self.folder {
            config.source.archive.folder = folder.clone();
        }
    }
}

/// Removes everything under `root` except entries whose name starts with a dot
pub fn clear_output_dir(root: &Path) -> Result<()> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        return Ok(());
    }

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }

    debug!("Cleared {}", root.display());
    Ok(())
}

/// Unpacks `archive` into `destination`
///
/// # Returns
///
/// The number of entries in the archive
pub fn extract_zip(archive: &Path, destination: &Path) -> Result<usize> {
    if !archive.is_file() {
        return Err(MirrorError::Archive(format!(
            "archive {} not found",
            archive.display()
        )));
    }

    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let entries = zip.len();
    zip.extract(destination)?;

    info!(
        "Extracted {} entries from {} into {}",
        entries,
        archive.display(),
        destination.display()
    );
    Ok(entries)
}

/// Lifts the directory named `wrapper` up into `root`
///
/// The first directory with that name anywhere under `root` has its
/// contents copied onto `root`, then the top-level directory that contained
/// it is removed.
///
/// # Returns
///
/// False if no such directory exists
pub fn flatten_wrapper(root: &Path, wrapper: &str) -> Result<bool> {
    if wrapper.is_empty() {
        return Ok(false);
    }

    let found = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_dir() && entry.file_name() == wrapper);

    let Some(found) = found else {
        return Ok(false);
    };
    let wrapper_dir = found.into_path();

    copy_tree(&wrapper_dir, root)?;

    let top = wrapper_dir
        .strip_prefix(root)
        .ok()
        .and_then(|relative| relative.components().next())
        .and_then(|component| match component {
            Component::Normal(name) => Some(root.join(name)),
            _ => None,
        });
    if let Some(top) = top {
        std::fs::remove_dir_all(&top)?;
        debug!("Removed {}", top.display());
    }

    info!("Flattened {} into {}", wrapper, root.display());
    Ok(true)
}

/// Copies every file under `from` to the same relative path under `to`
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
