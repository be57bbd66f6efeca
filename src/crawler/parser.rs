//! HTML parser for extracting page metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Indexable body text (headings and paragraphs)
//! - Sitemap `<link>` declarations

use scraper::{ElementRef, Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text of the indexed elements under `<body>`, space separated
    pub text: String,
}

/// Parses HTML content and extracts the title and indexable text
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `tags` - Element names under `<body>` whose text is collected,
///   in document order
///
/// # Example
///
/// ```
/// use site_mirror::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><h1>Hi</h1><p>there</p></body></html>"#;
/// let parsed = parse_html(html, &["h1".to_string(), "p".to_string()]);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.text, "Hi there");
/// ```
pub fn parse_html(html: &str, tags: &[String]) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: extract_body_text(&document, tags),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects text nodes of the given elements under `<body>`
fn extract_body_text(document: &Html, tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let (Ok(body_selector), Ok(tag_selector)) =
        (Selector::parse("body"), Selector::parse(&tags.join(", ")))
    else {
        return String::new();
    };

    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    body.select(&tag_selector)
        .flat_map(|element: ElementRef<'_>| element.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds the `href` of a `<link>` that declares a sitemap
///
/// Matches `rel="sitemap"` as well as a bare `sitemap` attribute.
pub fn find_sitemap_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("link[href]").ok()?;

    document
        .select(&link_selector)
        .find(|element| {
            let attrs = element.value();
            attrs.attr("sitemap").is_some()
                || attrs
                    .attr("rel")
                    .map(|rel| {
                        rel.split_whitespace()
                            .any(|r| r.eq_ignore_ascii_case("sitemap"))
                    })
                    .unwrap_or(false)
        })
        .and_then(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}
