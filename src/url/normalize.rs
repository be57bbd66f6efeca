use crate::url::domain::netloc;
use url::Url;

/// Decodes percent-escapes and JSON-escaped slashes in a raw location
///
/// Invalid UTF-8 after decoding leaves the input untouched.
pub fn decode_location(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.replace("\\/", "/")
}

/// Rebuilds a URL from its scheme, host and path only
///
/// # Cleaning Steps
///
/// 1. Cut everything from the first `</` (a link running into markup)
/// 2. Drop every character listed in `strip_chars`
/// 3. Parse and rebuild as `scheme://host[:port]path`, discarding query,
///    params and fragment
/// 4. Replace the path with `path` and the scheme with `scheme` when those
///    are non-empty
///
/// # Arguments
///
/// * `url` - The location to clean
/// * `path` - Replacement path, empty to keep the original one
/// * `scheme` - Replacement scheme, empty to keep the original one
/// * `strip_chars` - Characters removed from the location
///
/// # Examples
///
/// ```
/// use site_mirror::url::clean_url;
///
/// let clean = clean_url("https://old.example/a/?p=1#top", "", "", "");
/// assert_eq!(clean, "https://old.example/a/");
///
/// let sitemap = clean_url("https://old.example/blog/", "sitemap.xml", "", "");
/// assert_eq!(sitemap, "https://old.example/sitemap.xml");
/// ```
pub fn clean_url(url: &str, path: &str, scheme: &str, strip_chars: &str) -> String {
    let input = sanitize(url, strip_chars);

    let rebuilt = match Url::parse(&input) {
        Ok(parsed) if parsed.has_host() => {
            let scheme = if scheme.is_empty() {
                parsed.scheme()
            } else {
                scheme
            };
            let path = if path.is_empty() {
                parsed.path().to_string()
            } else if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            };
            format!("{}://{}{}", scheme, netloc(&parsed), path)
        }
        // Not a hierarchical URL: only drop query and fragment textually
        _ => input
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    sanitize(&rebuilt, strip_chars)
}

fn sanitize(value: &str, strip_chars: &str) -> String {
    value
        .split("</")
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !strip_chars.contains(*c))
        .collect()
}

/// Replaces every occurrence of `from` with `to` in `content`
///
/// Both locations are decoded first and lose their trailing slashes, so
/// `update_links(text, "https://old.example/", "https://new.example")`
/// rewrites `https://old.example` wherever it occurs. An empty `to` makes
/// the rewritten locations root-relative: `https://old.example/about/`
/// becomes `/about/`.
pub fn update_links(content: &str, from: &str, to: &str) -> String {
    let from = decode_location(from);
    let to = decode_location(to);
    let from = from.trim_end_matches('/');
    let to = to.trim_end_matches('/');

    if from.is_empty() {
        return content.to_string();
    }

    content.replace(from, to)
}
