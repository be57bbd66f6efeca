use crate::url::normalize::update_links;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Matches absolute http(s) locations in arbitrary text, including
/// backslash-escaped ones found in inline JSON
fn link_regex() -> Option<&'static Regex> {
    static LINK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    LINK_REGEX
        .get_or_init(|| {
            Regex::new(r"https?:(?://|\\)+(?:[\w:#@%/;$()~?+,\-.<=\\&](?:#!)?)*").ok()
        })
        .as_ref()
}

/// Finds every distinct absolute location in `text`, in first-seen order
///
/// # Examples
///
/// ```
/// use site_mirror::url::find_links;
///
/// let html = r#"<a href="https://old.example/a/">A</a> <img src="https://old.example/a/">"#;
/// assert_eq!(find_links(html), vec!["https://old.example/a/".to_string()]);
/// ```
pub fn find_links(text: &str) -> Vec<String> {
    let Some(regex) = link_regex() else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    regex
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Extracts source-site locations from free text
///
/// Each match loses its query and any bracket characters, is rewritten from
/// `dst_url` to `src_url`, and is kept only if it then contains `src_url`.
/// Used to turn pasted text (which may already use destination links) into
/// additional crawl seeds.
pub fn extract_urls_from_raw_text(raw_text: &str, dst_url: &str, src_url: &str) -> Vec<String> {
    let Some(regex) = link_regex() else {
        return Vec::new();
    };
    regex
        .find_iter(raw_text)
        .filter_map(|m| {
            let item = m.as_str().replace("\\/", "/");
            let item: String = item
                .split('?')
                .next()
                .unwrap_or_default()
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
                .collect();
            let link = update_links(&item, dst_url, src_url);
            (!link.is_empty() && link.contains(src_url)).then_some(link)
        })
        .collect()
}
