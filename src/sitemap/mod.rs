//! Sitemap discovery and expansion
//!
//! This module locates a site's sitemap and expands sitemap-index
//! documents into the sitemaps they list.

use crate::config::Settings;
use crate::crawler::{find_sitemap_link, HttpFetcher};
use crate::url::clean_url;
use crate::{MirrorError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, warn};
use url::Url;

/// Locates the sitemap of the site at `home_url`
///
/// # Strategies (first success wins)
///
/// 1. Probe each configured sitemap path; the first answering below 400
///    yields the path of its final URL
/// 2. The first `Sitemap:` line of `robots.txt`
/// 3. A sitemap `<link>` on the home page
///
/// # Returns
///
/// The location found, or an empty string if every strategy fails
pub async fn find_sitemap_location(
    home_url: &str,
    fetcher: &HttpFetcher,
    settings: &Settings,
) -> String {
    let chars = &settings.clean.chars;

    for candidate in &settings.sitemap_search_paths {
        let sitemap_url = clean_url(home_url, candidate, "", chars);
        let page = fetcher.get(&sitemap_url).await;
        if page.status < 400 {
            let path = Url::parse(&page.url)
                .map(|u| u.path().to_string())
                .unwrap_or_else(|_| format!("/{}", candidate.trim_start_matches('/')));
            info!("Sitemap found at {}", path);
            return path;
        }
        debug!("No sitemap at {} ({})", sitemap_url, page.status);
    }

    let robots_url = clean_url(home_url, "robots.txt", "", chars);
    let robots = fetcher.get(&robots_url).await;
    if robots.is_ok() {
        if let Some(location) = sitemap_from_robots(&robots.text()) {
            info!("Sitemap declared in robots.txt: {}", location);
            return location;
        }
    }

    let home = fetcher.get(home_url).await;
    if home.is_ok() {
        if let Some(href) = find_sitemap_link(&home.text()) {
            info!("Sitemap linked from home page: {}", href);
            return href;
        }
    }

    warn!("No sitemap found for {}", home_url);
    String::new()
}

/// Value of the first `Sitemap:` line of a robots.txt body
fn sitemap_from_robots(robots: &str) -> Option<String> {
    robots
        .lines()
        .find(|line| line.starts_with("Sitemap:"))
        .and_then(|line| line.split("Sitemap:").last())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Expands a sitemap into the locations it references
///
/// Returns the stylesheet links embedded in the raw text (rebuilt as
/// `http:` + the text from `//` through `.xsl`), followed by the `<loc>` of
/// every `<sitemap>` entry when the document is a sitemap index. Malformed
/// XML is logged and contributes nothing beyond the stylesheet links.
pub async fn extract_sitemap_paths(sitemap_url: &str, fetcher: &HttpFetcher) -> Vec<String> {
    let page = fetcher.get(sitemap_url).await;
    let text = page.text();

    let mut paths = stylesheet_links(&text);

    match parse_sitemap_index(sitemap_url, &text) {
        Ok(locs) => paths.extend(locs),
        Err(e) => warn!("{}", e),
    }

    debug!("{} expands to {} locations", sitemap_url, paths.len());
    paths
}

/// Stylesheet references (`.xsl`) found line by line in raw XML
fn stylesheet_links(text: &str) -> Vec<String> {
    text.split('\n')
        .filter_map(|line| {
            let end = line.find(".xsl")?;
            let start = line.find("//")?;
            (start < end).then(|| format!("http:{}", &line[start..end + 4]))
        })
        .collect()
}

/// `<loc>` values of `<sitemap>` entries, empty unless the document is a
/// sitemap index
fn parse_sitemap_index(sitemap_url: &str, xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut is_index = false;
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"sitemap" => in_sitemap = true,
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"sitemap" => in_sitemap = false,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(te)) if in_sitemap && in_loc => {
                let value = te.unescape().map_err(|e| MirrorError::XmlParse {
                    url: sitemap_url.to_string(),
                    message: e.to_string(),
                })?;
                let value = value.trim();
                if !value.is_empty() {
                    locs.push(value.to_string());
                }
            }
            Ok(Event::CData(cdata)) if in_sitemap && in_loc => {
                let value = String::from_utf8_lossy(&cdata).trim().to_string();
                if !value.is_empty() {
                    locs.push(value);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MirrorError::XmlParse {
                    url: sitemap_url.to_string(),
                    message: e.to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(if is_index { locs } else { Vec::new() })
}
