//! A single crawled location
//!
//! A [`UrlResource`] is classified on construction, fetched through the
//! shared [`HttpFetcher`] and saved into the output tree according to its
//! kind.

use crate::config::Config;
use crate::crawler::fetcher::{FetchedPage, HttpFetcher};
use crate::output::to_indented_json;
use crate::url::{classify, decode_location, find_links, netloc, UrlKind};
use crate::{MirrorError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use url::Url;

/// Chunk size used when writing font files
const FONT_CHUNK_SIZE: usize = 1024;

/// One crawled or planned unit of content
#[derive(Debug, Clone)]
pub struct UrlResource {
    loc: String,
    url: Option<Url>,
    kind: UrlKind,
    hash: String,
    valid: bool,
    page: Arc<FetchedPage>,
    internal_links: Vec<String>,
    external_links: Vec<String>,
}

impl UrlResource {
    /// Classifies a raw location into a resource shell
    ///
    /// # Arguments
    ///
    /// * `raw` - The location as found in content or configuration
    /// * `hint` - Kind kept when the extension table has no match
    /// * `scheme_override` - Scheme forced onto the location, empty for none
    /// * `config` - Supplies the settings and exclusion substrings
    pub fn new(raw: &str, hint: UrlKind, scheme_override: &str, config: &Config) -> Self {
        let classified = classify(
            raw,
            hint,
            scheme_override,
            &config.settings,
            &config.exclude,
        );

        Self {
            page: Arc::new(FetchedPage::unreachable(&classified.loc)),
            valid: classified.is_valid(),
            loc: classified.loc,
            url: classified.url,
            kind: classified.kind,
            hash: classified.hash,
            internal_links: Vec::new(),
            external_links: Vec::new(),
        }
    }

    /// Canonical absolute location
    pub fn loc(&self) -> &str {
        &self.loc
    }

    pub fn kind(&self) -> UrlKind {
        self.kind
    }

    /// Identity hash of the canonical location
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Status of the last fetch; the unreachable sentinel before any fetch
    pub fn status(&self) -> u16 {
        self.page.status
    }

    /// The fetched response
    pub fn page(&self) -> &FetchedPage {
        &self.page
    }

    pub fn internal_links(&self) -> &[String] {
        &self.internal_links
    }

    pub fn external_links(&self) -> &[String] {
        &self.external_links
    }

    pub fn scheme(&self) -> &str {
        self.url.as_ref().map(|u| u.scheme()).unwrap_or_default()
    }

    /// Host plus explicit port
    pub fn netloc(&self) -> String {
        self.url.as_ref().map(netloc).unwrap_or_default()
    }

    /// URL path of the location
    pub fn path(&self) -> &str {
        self.url.as_ref().map(|u| u.path()).unwrap_or_default()
    }

    /// Returns true if the location may be fetched; see
    /// [`Classified::is_valid`](crate::url::Classified::is_valid)
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns true if the last fetch failed or was never saved-worthy
    pub fn is_ignored(&self) -> bool {
        self.status() >= 400 || self.kind == UrlKind::None
    }

    /// Fetches the location through the memoising fetcher
    ///
    /// No-op for invalid or excluded locations. Bodies of link-bearing
    /// kinds are scanned for absolute locations, split into internal
    /// (containing this host) and external.
    pub async fn fetch(&mut self, fetcher: &HttpFetcher) {
        if !self.is_valid() || self.kind == UrlKind::None {
            trace!("Not fetching {} ({})", self.loc, self.kind);
            return;
        }

        self.page = fetcher.get(&self.loc).await;

        if self.kind.is_link_source() {
            let host = self.netloc();
            let (internal, external): (Vec<String>, Vec<String>) = find_links(&self.page.text())
                .into_iter()
                .partition(|link| link.contains(&host));
            debug!(
                "{}: {} internal, {} external links",
                self.loc,
                internal.len(),
                external.len()
            );
            self.internal_links = internal;
            self.external_links = external;
        }
    }

    /// Output file for this resource under `output_root`
    ///
    /// Mirrors the decoded URL path; a 404 response maps to `404.html` at
    /// the root and directory-like kinds gain an `index.html`.
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        if self.status() == 404 {
            return output_root.join("404.html");
        }

        let decoded = decode_location(self.path());
        let mut path = output_root.join(decoded.trim_start_matches('/'));
        if self.kind.is_directory() {
            path.push("index.html");
        }
        path
    }

    /// Writes the fetched content into the output tree
    ///
    /// # Arguments
    ///
    /// * `output_root` - Root of the mirrored tree
    /// * `dst_url` - Destination URL used for host rewriting, empty to keep
    ///   content as fetched
    /// * `fetcher` - Used to re-download archives with cache busting
    ///
    /// # Returns
    ///
    /// The URL path of the resource. Invalid, excluded and unreachable
    /// resources are not written.
    pub async fn save(
        &mut self,
        output_root: &Path,
        dst_url: &str,
        fetcher: &HttpFetcher,
    ) -> Result<String> {
        let path = self.path().to_string();

        if !self.is_valid() || self.kind == UrlKind::None || self.page.is_unreachable() {
            return Ok(path);
        }

        if self.status() == 404 {
            self.kind = UrlKind::Html;
        }

        let output_path = self.output_path(output_root);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        match self.kind {
            kind if kind.is_text() => {
                let text = self.rewrite_host(&self.page.text(), dst_url);
                fs::write(&output_path, text).await?;
            }
            UrlKind::Image | UrlKind::Pdf | UrlKind::Binary => {
                fs::write(&output_path, &self.page.body).await?;
            }
            UrlKind::Json => {
                let value: serde_json::Value = serde_json::from_slice(&self.page.body)?;
                fs::write(&output_path, to_indented_json(&value)?).await?;
            }
            UrlKind::Zip => {
                self.download_archive(&output_path, fetcher).await?;
            }
            UrlKind::Fonts => {
                if self.status() == 200 {
                    let mut file = fs::File::create(&output_path).await?;
                    for chunk in self.page.body.chunks(FONT_CHUNK_SIZE) {
                        file.write_all(chunk).await?;
                    }
                    file.flush().await?;
                }
            }
            _ => {}
        }

        trace!("Wrote {}", output_path.display());
        Ok(path)
    }

    /// Streams a fresh copy of the location to disk
    async fn download_archive(&self, output_path: &Path, fetcher: &HttpFetcher) -> Result<()> {
        let mut response = fetcher.get_fresh(&self.loc).await?;
        if response.status().as_u16() != 200 {
            return Err(MirrorError::RemoteApi {
                url: self.loc.clone(),
                status: response.status().as_u16(),
            });
        }

        let mut file = fs::File::create(output_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Replaces this resource's origin and host with the destination's
    fn rewrite_host(&self, text: &str, dst_url: &str) -> String {
        let Ok(dst) = Url::parse(dst_url) else {
            return text.to_string();
        };

        let src_host = self.netloc();
        let dst_host = netloc(&dst);
        if src_host.is_empty() {
            return text.to_string();
        }

        text.replace(
            &format!("{}://{}", self.scheme(), src_host),
            &format!("{}://{}", dst.scheme(), dst_host),
        )
        .replace(&src_host, &dst_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::script_mode(
            "admin",
            "secret",
            "http://old.example",
            "https://new.example",
            "404-error",
            "search",
            Path::new("/tmp/out"),
        )
    }

    fn with_page(mut resource: UrlResource, status: u16, body: &str) -> UrlResource {
        resource.page = Arc::new(FetchedPage {
            url: resource.loc.clone(),
            status,
            body: body.as_bytes().to_vec(),
        });
        resource
    }

    #[test]
    fn test_output_paths() {
        let config = config();
        let root = Path::new("/tmp/out");

        let folder = UrlResource::new("http://old.example/about", UrlKind::Folder, "", &config);
        assert_eq!(folder.output_path(root), root.join("about/index.html"));

        let image = UrlResource::new("http://old.example/img/a%20b.png", UrlKind::Folder, "", &config);
        assert_eq!(image.kind(), UrlKind::Image);
        assert_eq!(image.output_path(root), root.join("img/a b.png"));

        let home = UrlResource::new("http://old.example/", UrlKind::Home, "", &config);
        assert_eq!(home.output_path(root), root.join("index.html"));
    }

    #[test]
    fn test_not_found_goes_to_404_html() {
        let config = config();
        let resource = with_page(
            UrlResource::new("http://old.example/gone/", UrlKind::Folder, "", &config),
            404,
            "",
        );
        assert_eq!(
            resource.output_path(Path::new("/tmp/out")),
            Path::new("/tmp/out/404.html")
        );
    }

    #[test]
    fn test_rewrite_host() {
        let config = config();
        let resource = UrlResource::new("http://old.example/a/", UrlKind::Folder, "", &config);
        let text = r#"<a href="http://old.example/b/">b</a> mail@old.example"#;
        let rewritten = resource.rewrite_host(text, "https://new.example");
        assert_eq!(
            rewritten,
            r#"<a href="https://new.example/b/">b</a> mail@new.example"#
        );
        assert!(!rewritten.contains("old.example"));
    }

    #[test]
    fn test_rewrite_host_without_destination() {
        let config = config();
        let resource = UrlResource::new("http://old.example/a/", UrlKind::Folder, "", &config);
        assert_eq!(resource.rewrite_host("old.example", ""), "old.example");
    }

    #[test]
    fn test_ignored() {
        let config = config();
        let excluded = UrlResource::new("http://old.example/wp-admin/", UrlKind::Folder, "", &config);
        assert!(excluded.is_ignored());

        let ok = with_page(
            UrlResource::new("http://old.example/a/", UrlKind::Folder, "", &config),
            200,
            "",
        );
        assert!(!ok.is_ignored());
    }

    #[tokio::test]
    async fn test_save_skips_excluded_and_unreachable() {
        let config = config();
        let fetcher = HttpFetcher::new(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut excluded =
            UrlResource::new("http://old.example/wp-admin/", UrlKind::Folder, "", &config);
        let path = excluded.save(dir.path(), "", &fetcher).await.unwrap();
        assert_eq!(path, "/wp-admin/");

        let mut unreachable = UrlResource::new("http://old.example/a/", UrlKind::Folder, "", &config);
        unreachable.save(dir.path(), "", &fetcher).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_save_text_and_json() {
        let config = config();
        let fetcher = HttpFetcher::new(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut page = with_page(
            UrlResource::new("http://old.example/a/", UrlKind::Folder, "", &config),
            200,
            "<html>http://old.example/b/</html>",
        );
        page.save(dir.path(), "https://new.example", &fetcher)
            .await
            .unwrap();
        let saved = std::fs::read_to_string(dir.path().join("a/index.html")).unwrap();
        assert_eq!(saved, "<html>https://new.example/b/</html>");

        let mut json = with_page(
            UrlResource::new("http://old.example/data.json", UrlKind::Folder, "", &config),
            200,
            r#"{"k":"v"}"#,
        );
        json.save(dir.path(), "", &fetcher).await.unwrap();
        let saved = std::fs::read_to_string(dir.path().join("data.json")).unwrap();
        assert_eq!(saved, "{\n    \"k\": \"v\"\n}");
    }

    #[tokio::test]
    async fn test_save_fonts_only_on_success() {
        let config = config();
        let fetcher = HttpFetcher::new(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();

        // Larger than one write chunk
        let body = "f".repeat(FONT_CHUNK_SIZE * 2 + 17);
        let mut font = with_page(
            UrlResource::new("http://old.example/fonts/a.woff2", UrlKind::Folder, "", &config),
            200,
            &body,
        );
        assert_eq!(font.kind(), UrlKind::Fonts);
        font.save(dir.path(), "https://new.example", &fetcher)
            .await
            .unwrap();
        let saved = std::fs::read(dir.path().join("fonts/a.woff2")).unwrap();
        assert_eq!(saved, body.as_bytes());

        let mut failed = with_page(
            UrlResource::new("http://old.example/fonts/b.woff2", UrlKind::Folder, "", &config),
            500,
            "error page",
        );
        failed.save(dir.path(), "", &fetcher).await.unwrap();
        assert!(!dir.path().join("fonts/b.woff2").exists());
    }
}
