use crate::config::settings::Settings;
use crate::redirects::RedirectSource;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main project configuration for site-mirror
///
/// Constructed once per run (from TOML or from the environment) and
/// read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Project name, informational only
    #[serde(default)]
    pub name: String,

    pub source: SourceConfig,

    pub destination: DestinationConfig,

    #[serde(default)]
    pub wordpress: WordPressConfig,

    /// Where redirect rules are collected from
    #[serde(default)]
    pub redirects: RedirectSource,

    /// Sitemap location, absolute or relative to the source URL.
    /// Empty means "locate it".
    #[serde(default)]
    pub sitemap: String,

    /// Directory name of the search page
    #[serde(default = "default_search")]
    pub search: String,

    /// Directory name of the custom 404 page on the source site
    #[serde(default = "default_404", rename = "404")]
    pub page_404: String,

    /// Extra seed URLs crawled after the sitemap
    #[serde(default)]
    pub additional: Vec<String>,

    /// Path substrings that are never fetched or saved
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Politeness delay between requests, in seconds
    #[serde(default = "default_delay")]
    pub delay: f64,

    #[serde(default)]
    pub user_agent: UserAgentProfile,

    /// Attempts per GET before a resource is declared unreachable
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default)]
    pub settings: Settings,
}

/// Where the site content comes from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type", default)]
    pub kind: SourceKind,

    /// Base URL of the live WordPress site
    pub url: String,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Source mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    /// Follow links on the live site
    #[default]
    Crawl,
    /// Download and unpack the export plugin's archive
    #[serde(alias = "ZIP")]
    Archive,
}

/// Export archive coordinates, normally filled from the export plugin API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveConfig {
    /// URL path of the folder holding the archive, with surrounding slashes
    #[serde(default)]
    pub folder: String,

    /// Archive base name without the `.zip` extension
    #[serde(default)]
    pub name: String,
}

/// Where the mirrored site is written and served from
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    #[serde(default)]
    pub host: HostKind,

    /// Public URL the static copy is served from
    #[serde(default)]
    pub url: String,

    /// Output root directory
    pub output: PathBuf,
}

/// Destination hosting kind; decides the redirect file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostKind {
    #[default]
    Netlify,
    Cloudflare,
}

impl HostKind {
    /// Returns true if this host reads block-structured redirect rules
    pub fn uses_block_redirects(&self) -> bool {
        matches!(self, Self::Netlify)
    }
}

/// WordPress credentials used for plugin API calls
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WordPressConfig {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub api_token: String,
}

/// Header profile sent with every GET
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserAgentProfile {
    #[default]
    Firefox,
    Chrome,
    Custom,
}

fn default_search() -> String {
    "search".to_string()
}

fn default_404() -> String {
    "404-error".to_string()
}

fn default_delay() -> f64 {
    0.1
}

fn default_retries() -> u32 {
    3
}

/// Path substrings excluded from every crawl unless the project overrides them
pub fn default_exclude() -> Vec<String> {
    [
        "wp-json",
        "wp-admin",
        "wp-login.php",
        "xmlrpc.php",
        "/feed/",
        "/embed/",
        "/trackback/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Builds the configuration used by environment-driven script mode
    ///
    /// Script mode always unpacks the export archive, targets Netlify and
    /// pulls redirects from the redirect plugin.
    pub fn script_mode(
        user: &str,
        token: &str,
        src_url: &str,
        dst_url: &str,
        page_404: &str,
        search: &str,
        output: &Path,
    ) -> Self {
        Self {
            name: "export-archive-deploy".to_string(),
            source: SourceConfig {
                kind: SourceKind::Archive,
                url: src_url.to_string(),
                archive: ArchiveConfig::default(),
            },
            destination: DestinationConfig {
                host: HostKind::Netlify,
                url: dst_url.to_string(),
                output: output.to_path_buf(),
            },
            wordpress: WordPressConfig {
                user: user.to_string(),
                api_token: token.to_string(),
            },
            redirects: RedirectSource::Redirection,
            sitemap: String::new(),
            search: search.to_string(),
            page_404: page_404.to_string(),
            additional: Vec::new(),
            exclude: default_exclude(),
            delay: default_delay(),
            user_agent: UserAgentProfile::default(),
            retries: default_retries(),
            settings: Settings::default(),
        }
    }

    /// Builds the script-mode configuration from environment variables
    ///
    /// Reads `user`, `token`, `src`, `dst` (required) and `404`, `search`,
    /// `output` (optional).
    pub fn from_env() -> crate::ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable lookup
    pub fn from_lookup<F>(lookup: F) -> crate::ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| crate::ConfigError::MissingEnv(key.to_string()))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let user = required("user")?;
        let token = required("token")?;
        let src = required("src")?;
        let dst = required("dst")?;
        let page_404 = optional("404", "404-error");
        let search = optional("search", "search");
        let output = optional("output", "output");

        Ok(Self::script_mode(
            &user,
            &token,
            &src,
            &dst,
            &page_404,
            &search,
            Path::new(&output),
        ))
    }

    /// Source URL without a trailing slash
    pub fn src_url(&self) -> &str {
        self.source.url.trim_end_matches('/')
    }

    /// Destination URL without a trailing slash
    pub fn dst_url(&self) -> &str {
        self.destination.url.trim_end_matches('/')
    }

    /// Output root directory
    pub fn output(&self) -> &Path {
        &self.destination.output
    }

    /// Scheme of the source URL, falling back to the default scheme
    pub fn scheme(&self) -> String {
        ::url::Url::parse(self.src_url())
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| self.settings.default_scheme.clone())
    }

    /// Base64 of `user:api-token`, empty when either part is missing
    pub fn auth_token(&self) -> String {
        if self.wordpress.user.is_empty() || self.wordpress.api_token.is_empty() {
            return String::new();
        }
        base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.wordpress.user, self.wordpress.api_token
        ))
    }

    /// Absolute sitemap URL, or `None` when the sitemap must be located
    pub fn sitemap_url(&self) -> Option<String> {
        if self.sitemap.is_empty() {
            return None;
        }
        if self.sitemap.starts_with("http://") || self.sitemap.starts_with("https://") {
            return Some(self.sitemap.clone());
        }
        Some(format!(
            "{}/{}",
            self.src_url(),
            self.sitemap.trim_start_matches('/')
        ))
    }

    /// URL of the custom 404 page on the source site
    pub fn page_404_url(&self) -> String {
        format!("{}/{}", self.src_url(), self.page_404)
    }

    /// Directory of the search page inside the output root
    pub fn search_path(&self) -> PathBuf {
        self.output().join(&self.search)
    }

    /// Directory of the custom 404 page inside the output root
    pub fn page_404_path(&self) -> PathBuf {
        self.output().join(&self.page_404)
    }

    /// Redirect plugin endpoint, `None` when redirects are disabled
    pub fn redirects_api_url(&self) -> Option<String> {
        match self.redirects {
            RedirectSource::None => None,
            RedirectSource::Redirection => Some(format!(
                "{}/{}",
                self.src_url(),
                self.settings.api.redirection.trim_start_matches('/')
            )),
        }
    }

    /// Export plugin settings endpoint
    pub fn export_settings_url(&self) -> String {
        format!("{}{}", self.src_url(), self.settings.api.export_settings)
    }

    /// Folder of the export archive, falling back to the plugin default
    pub fn archive_folder(&self) -> &str {
        if self.source.archive.folder.is_empty() {
            &self.settings.api.export_folder
        } else {
            &self.source.archive.folder
        }
    }

    /// Download URL of the export archive
    pub fn archive_url(&self) -> String {
        format!(
            "{}{}{}.zip",
            self.src_url(),
            self.archive_folder(),
            self.source.archive.name
        )
    }

    /// Local path the export archive is downloaded to
    pub fn archive_path(&self) -> PathBuf {
        self.output()
            .join(self.archive_folder().trim_matches('/'))
            .join(format!("{}.zip", self.source.archive.name))
    }

    /// Path of the redirect file for the configured host kind
    pub fn redirects_file(&self) -> PathBuf {
        let name = match self.destination.host {
            HostKind::Netlify => &self.settings.redirect_files.netlify,
            HostKind::Cloudflare => &self.settings.redirect_files.cloudflare,
        };
        self.output().join(name)
    }

    /// Directory names never indexed for search
    pub fn reserved_dirs(&self) -> Vec<String> {
        vec![
            self.search.clone(),
            self.page_404.clone(),
            "robots.txt".to_string(),
        ]
    }

    /// User-agent string of the selected profile
    pub fn user_agent_string(&self) -> &str {
        match self.user_agent {
            UserAgentProfile::Firefox => &self.settings.user_agents.firefox,
            UserAgentProfile::Chrome => &self.settings.user_agents.chrome,
            UserAgentProfile::Custom => &self.settings.user_agents.custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> Config {
        Config::script_mode(
            "admin",
            "secret",
            "https://old.example/",
            "https://new.example",
            "404-error",
            "search",
            Path::new("/tmp/out"),
        )
    }

    #[test]
    fn test_auth_token() {
        let config = sample();
        // base64("admin:secret")
        assert_eq!(config.auth_token(), "YWRtaW46c2VjcmV0");
    }

    #[test]
    fn test_auth_token_empty_without_credentials() {
        let mut config = sample();
        config.wordpress.api_token.clear();
        assert_eq!(config.auth_token(), "");
    }

    #[test]
    fn test_derived_urls() {
        let mut config = sample();
        assert_eq!(config.src_url(), "https://old.example");
        assert_eq!(config.page_404_url(), "https://old.example/404-error");
        assert_eq!(
            config.redirects_api_url().as_deref(),
            Some("https://old.example/wp-json/redirection/v1/redirect")
        );
        assert_eq!(
            config.export_settings_url(),
            "https://old.example/wp-json/simplystatic/v1/settings"
        );
        assert_eq!(config.sitemap_url(), None);

        config.sitemap = "sitemap_index.xml".to_string();
        assert_eq!(
            config.sitemap_url().as_deref(),
            Some("https://old.example/sitemap_index.xml")
        );
    }

    #[test]
    fn test_archive_coordinates() {
        let mut config = sample();
        config.source.archive.folder = "/wp-content/uploads/exports/".to_string();
        config.source.archive.name = "site-export-1".to_string();

        assert_eq!(
            config.archive_url(),
            "https://old.example/wp-content/uploads/exports/site-export-1.zip"
        );
        assert_eq!(
            config.archive_path(),
            PathBuf::from("/tmp/out/wp-content/uploads/exports/site-export-1.zip")
        );
    }

    #[test]
    fn test_redirects_disabled() {
        let mut config = sample();
        config.redirects = RedirectSource::None;
        assert_eq!(config.redirects_api_url(), None);
    }

    #[test]
    fn test_redirects_file_per_host() {
        let mut config = sample();
        assert_eq!(config.redirects_file(), PathBuf::from("/tmp/out/netlify.toml"));
        config.destination.host = HostKind::Cloudflare;
        assert_eq!(config.redirects_file(), PathBuf::from("/tmp/out/_redirects"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let vars: HashMap<&str, &str> = [
            ("user", "admin"),
            ("token", "secret"),
            ("src", "https://old.example"),
            ("dst", "https://new.example"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.source.kind, SourceKind::Archive);
        assert_eq!(config.page_404, "404-error");
        assert_eq!(config.search, "search");
        assert_eq!(config.output(), Path::new("output"));
        assert_eq!(config.redirects, RedirectSource::Redirection);
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let result = Config::from_lookup(|k| (k == "user").then(|| "admin".to_string()));
        assert!(matches!(
            result.unwrap_err(),
            crate::ConfigError::MissingEnv(key) if key == "token"
        ));
    }

    #[test]
    fn test_scheme_from_source() {
        let mut config = sample();
        assert_eq!(config.scheme(), "https");
        config.source.url = "http://old.example".to_string();
        assert_eq!(config.scheme(), "http");
    }
}
