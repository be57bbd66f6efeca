//! Project verification
//!
//! Checks a project configuration against the live source site before a
//! run: reachable source, usable output directory, accepted credentials
//! and the presence of the sitemap and export plugin.

use crate::config::{Config, SourceKind};
use crate::crawler::HttpFetcher;
use crate::sitemap::find_sitemap_location;
use std::fmt;
use tracing::info;

/// Outcome of one verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            if self.passed { "ok" } else { "FAIL" },
            self.name,
            self.detail
        )
    }
}

/// Runs every project check, in a fixed order
///
/// Network failures count as failed checks; this never returns an error.
pub async fn verify_project(config: &Config, fetcher: &HttpFetcher) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(Check::new(
        "project name",
        !config.name.is_empty(),
        if config.name.is_empty() {
            "project name is empty".to_string()
        } else {
            config.name.clone()
        },
    ));

    let source = fetcher.get(&format!("{}/", config.src_url())).await;
    checks.push(Check::new(
        "source url",
        source.status < 399,
        format!("{} answered {}", config.src_url(), source.status),
    ));

    let output = config.output();
    checks.push(Check::new(
        "output directory",
        output.is_dir(),
        output.display().to_string(),
    ));

    let token = config.auth_token();
    checks.push(match config.redirects_api_url() {
        Some(api_url) => authorized_check("wordpress user", &api_url, &token, fetcher).await,
        None => Check::new("wordpress user", true, "redirect collection disabled"),
    });

    let sitemap = match config.sitemap_url() {
        Some(url) => url,
        None => {
            let located =
                find_sitemap_location(config.src_url(), fetcher, &config.settings).await;
            let mut probe = config.clone();
            probe.sitemap = located;
            probe.sitemap_url().unwrap_or_default()
        }
    };
    checks.push(if sitemap.is_empty() {
        Check::new("sitemap", false, "no sitemap found")
    } else {
        let page = fetcher.get(&sitemap).await;
        Check::new(
            "sitemap",
            page.status < 399,
            format!("{} answered {}", sitemap, page.status),
        )
    });

    if config.source.kind == SourceKind::Archive {
        checks.push(
            authorized_check("export plugin", &config.export_settings_url(), &token, fetcher)
                .await,
        );
    }

    for check in &checks {
        info!("{}", check);
    }
    checks
}

async fn authorized_check(
    name: &'static str,
    url: &str,
    token: &str,
    fetcher: &HttpFetcher,
) -> Check {
    match fetcher.get_authorized(url, token).await {
        Ok((status, _)) => Check::new(name, status < 399, format!("{} answered {}", url, status)),
        Err(e) => Check::new(name, false, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_display() {
        let check = Check::new("sitemap", false, "no sitemap found");
        assert_eq!(check.to_string(), "[FAIL] sitemap: no sitemap found");
        assert_eq!(
            Check::new("project name", true, "blog").to_string(),
            "[ok] project name: blog"
        );
    }
}
