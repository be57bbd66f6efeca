use crate::url::UrlKind;
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime settings shared by every component of a run
///
/// Constructed once (defaults, optionally overridden by the `[settings]`
/// table of the project file) and handed to each component by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Schemes a location may already carry
    pub schemes: Vec<String>,

    /// Scheme prefixed to locations that carry none of `schemes`
    pub default_scheme: String,

    /// URL cleaning policy
    pub clean: CleanSettings,

    /// Extension table used to infer a resource kind
    pub formats: Vec<FormatRule>,

    /// Candidate sitemap paths probed against the home URL, in order
    pub sitemap_search_paths: Vec<String>,

    /// User-agent strings per profile
    pub user_agents: UserAgentSettings,

    /// Value of the `Accept` header sent with every GET
    pub accept: String,

    /// Most responses kept by the GET cache; least recently used go first
    pub cache_size: usize,

    /// Third-party text-indexing script injected into the search page
    pub lunr: LunrSettings,

    /// Search index generation
    pub search: SearchSettings,

    /// WordPress plugin endpoints
    pub api: ApiSettings,

    /// Redirect file name per destination host kind
    pub redirect_files: RedirectFiles,

    /// Optional robots.txt template copied into the output root
    pub robots_template: Option<PathBuf>,
}

/// URL cleaning policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CleanSettings {
    /// Rebuild every location from scheme, host and path only
    pub url: bool,

    /// Characters stripped from cleaned locations
    pub chars: String,
}

/// Maps a set of upper-case file extensions onto one resource kind
#[derive(Debug, Clone, Deserialize)]
pub struct FormatRule {
    pub kind: UrlKind,
    pub extensions: Vec<String>,
}

/// User-agent strings for each selectable profile
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentSettings {
    pub firefox: String,
    pub chrome: String,
    pub custom: String,
}

/// Script tag attributes for the lunr text-indexing library
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LunrSettings {
    pub src: String,
    pub integrity: String,
    pub crossorigin: String,
    pub referrerpolicy: String,
}

/// Search index generation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchSettings {
    /// Elements under `<body>` whose text is indexed
    pub html_tags: Vec<String>,

    /// Index body text; when false the title doubles as content
    pub include_content: bool,

    /// File name of the local index script inside the search directory
    pub index_script: String,

    /// File name of the JSON document index inside the search directory
    pub index_file: String,

    /// Optional replacement for the bundled index script
    pub script_template: Option<PathBuf>,
}

/// WordPress plugin endpoints, relative to the source URL
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApiSettings {
    /// Export plugin settings endpoint
    pub export_settings: String,

    /// Default folder the export plugin writes archives into
    pub export_folder: String,

    /// Redirect plugin listing endpoint
    pub redirection: String,
}

/// Redirect file names per destination host kind
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedirectFiles {
    pub netlify: String,
    pub cloudflare: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schemes: vec!["http".to_string(), "https".to_string()],
            default_scheme: "https".to_string(),
            clean: CleanSettings::default(),
            formats: default_formats(),
            sitemap_search_paths: [
                "sitemap_index.xml",
                "sitemap.xml",
                "wp-sitemap.xml",
                "sitemap-index.xml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            user_agents: UserAgentSettings::default(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .to_string(),
            cache_size: 128,
            lunr: LunrSettings::default(),
            search: SearchSettings::default(),
            api: ApiSettings::default(),
            redirect_files: RedirectFiles::default(),
            robots_template: None,
        }
    }
}

impl Default for CleanSettings {
    fn default() -> Self {
        Self {
            url: true,
            chars: "\"'<>\\{}|^`".to_string(),
        }
    }
}

impl Default for UserAgentSettings {
    fn default() -> Self {
        Self {
            firefox: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            chrome: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36".to_string(),
            custom: concat!("site-mirror/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for LunrSettings {
    fn default() -> Self {
        Self {
            src: "https://cdnjs.cloudflare.com/ajax/libs/lunr.js/2.3.9/lunr.min.js".to_string(),
            integrity: "sha512-4xUl/d6D6THrAnXAwGajXkoWaeMNwEKK4iNfq5DotEbLPAfk6FSxSP3ydNxqDgCw1c/0Z1Jg6L8h2j+++9BZmg==".to_string(),
            crossorigin: "anonymous".to_string(),
            referrerpolicy: "no-referrer".to_string(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            html_tags: ["h1", "h2", "h3", "h4", "h5", "h6", "p"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            include_content: true,
            index_script: "search.js".to_string(),
            index_file: "lunr.json".to_string(),
            script_template: None,
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            export_settings: "/wp-json/simplystatic/v1/settings".to_string(),
            export_folder: "/wp-content/uploads/simply-static/temp-files/".to_string(),
            redirection: "wp-json/redirection/v1/redirect".to_string(),
        }
    }
}

impl Default for RedirectFiles {
    fn default() -> Self {
        Self {
            netlify: "netlify.toml".to_string(),
            cloudflare: "_redirects".to_string(),
        }
    }
}

fn rule(kind: UrlKind, extensions: &[&str]) -> FormatRule {
    FormatRule {
        kind,
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
    }
}

/// The default extension table
fn default_formats() -> Vec<FormatRule> {
    vec![
        rule(
            UrlKind::Image,
            &["PNG", "JPG", "JPEG", "GIF", "SVG", "WEBP", "AVIF", "ICO", "BMP", "TIFF"],
        ),
        rule(UrlKind::Pdf, &["PDF"]),
        rule(UrlKind::Html, &["HTML", "HTM", "PHP"]),
        rule(UrlKind::Js, &["JS", "MJS"]),
        rule(UrlKind::Css, &["CSS"]),
        rule(UrlKind::Txt, &["TXT"]),
        rule(UrlKind::Xml, &["XML", "XSL", "RSS"]),
        rule(UrlKind::Json, &["JSON", "WEBMANIFEST"]),
        rule(UrlKind::Fonts, &["WOFF", "WOFF2", "TTF", "OTF", "EOT"]),
        rule(UrlKind::Zip, &["ZIP"]),
        rule(
            UrlKind::Binary,
            &["MP3", "MP4", "WEBM", "OGG", "WAV", "MOV", "DOC", "DOCX", "XLS", "XLSX", "PPT", "PPTX", "CSV"],
        ),
    ]
}

impl Settings {
    /// Looks up the kind registered for an upper-case extension
    pub fn kind_for_extension(&self, extension: &str) -> Option<UrlKind> {
        self.formats
            .iter()
            .find(|rule| {
                rule.extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(extension))
            })
            .map(|rule| rule.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extension_lookup() {
        let settings = Settings::default();
        assert_eq!(settings.kind_for_extension("PNG"), Some(UrlKind::Image));
        assert_eq!(settings.kind_for_extension("png"), Some(UrlKind::Image));
        assert_eq!(settings.kind_for_extension("WOFF2"), Some(UrlKind::Fonts));
        assert_eq!(settings.kind_for_extension("XML"), Some(UrlKind::Xml));
        assert_eq!(settings.kind_for_extension("ABOUT/"), None);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
default-scheme = "http"

[search]
include-content = false
"#,
        )
        .unwrap();

        assert_eq!(settings.default_scheme, "http");
        assert_eq!(settings.cache_size, 128);
        assert!(!settings.search.include_content);
        assert_eq!(settings.search.index_file, "lunr.json");
        assert_eq!(settings.schemes.len(), 2);
    }

    #[test]
    fn test_format_table_override() {
        let settings: Settings = toml::from_str(
            r#"
[[formats]]
kind = "BINARY"
extensions = ["PNG"]
"#,
        )
        .unwrap();

        assert_eq!(settings.formats.len(), 1);
        assert_eq!(settings.kind_for_extension("PNG"), Some(UrlKind::Binary));
    }
}
