//! Redirect collection and serialisation
//!
//! Redirect rules come from the WordPress redirect plugin and from the
//! synthesised search rule, and are written as one host-specific file.

use crate::config::HostKind;
use crate::crawler::HttpFetcher;
use crate::url::identity_hash;
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Where a redirect rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RedirectSource {
    /// Synthesised locally, or redirect collection disabled
    #[default]
    None,
    /// The Redirection plugin API
    Redirection,
}

impl fmt::Display for RedirectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NONE"),
            Self::Redirection => f.write_str("REDIRECTION"),
        }
    }
}

/// A single rewrite rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    from: String,
    to: String,
    query: Option<String>,
    status: u16,
    force: bool,
    source: RedirectSource,
    hash: String,
}

impl Redirect {
    /// Creates a rule; its identity is the hash of `from`
    pub fn new(
        from: &str,
        to: &str,
        query: Option<&str>,
        status: u16,
        force: bool,
        source: RedirectSource,
    ) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            query: query.map(str::to_string),
            status,
            force,
            source,
            hash: identity_hash(from),
        }
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn source(&self) -> RedirectSource {
        self.source
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// `{"from", "to", "status"}`
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": self.from,
            "to": self.to,
            "status": self.status,
        })
    }

    /// Tab-separated `from`, `to` and `status`, without a line break
    pub fn as_line(&self) -> String {
        format!("{}\t{}\t{}", self.from, self.to, self.status)
    }

    /// One `[[redirects]]` block
    ///
    /// Strings are escaped by the TOML serialiser, so regex rules such as
    /// `^/old/(\d+)$` stay valid.
    pub fn as_toml(&self) -> Result<String> {
        render_toml(std::slice::from_ref(self))
    }

    fn block(&self) -> TomlBlock<'_> {
        TomlBlock {
            from: &self.from,
            to: &self.to,
            status: self.status,
            force: self.force,
            query: self.query.as_deref().map(parse_query),
        }
    }
}

/// `k=v&k2=v2` as a sorted map; a pair without `=` maps to an empty value
fn parse_query(query: &str) -> BTreeMap<&str, &str> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

/// Serialised shape of one Netlify redirect
#[derive(Serialize)]
struct TomlBlock<'a> {
    from: &'a str,
    to: &'a str,
    status: u16,
    force: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<BTreeMap<&'a str, &'a str>>,
}

#[derive(Serialize)]
struct TomlFile<'a> {
    redirects: Vec<TomlBlock<'a>>,
}

fn render_toml(rules: &[Redirect]) -> Result<String> {
    let file = TomlFile {
        redirects: rules.iter().map(Redirect::block).collect(),
    };
    Ok(toml::to_string(&file)?)
}

/// Insertion-ordered redirect rules, unique by `from`
#[derive(Debug, Clone, Default)]
pub struct Redirects {
    items: Vec<Redirect>,
    seen: HashSet<String>,
}

/// One item of the redirect plugin's `items` array
///
/// Items whose action carries no target (error or pass actions) lack
/// `action_data.url`.
#[derive(Debug, Deserialize)]
struct PluginItem {
    url: Option<String>,
    #[serde(default)]
    action_data: Option<PluginAction>,
    #[serde(default)]
    action_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PluginAction {
    url: Option<String>,
}

impl PluginItem {
    fn into_redirect(self) -> Option<Redirect> {
        let from = self.url?;
        let to = self.action_data?.url?;
        Some(Redirect::new(
            &from,
            &to,
            None,
            self.action_code.unwrap_or(301),
            true,
            RedirectSource::Redirection,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct PluginResponse {
    items: Vec<PluginItem>,
}

impl Redirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule unless one with the same `from` is already present
    ///
    /// Returns true if the rule was added.
    pub fn add_redirect(&mut self, redirect: Redirect) -> bool {
        if !self.seen.insert(redirect.hash.clone()) {
            debug!("Duplicate redirect ignored: {}", redirect.from);
            return false;
        }
        self.items.push(redirect);
        true
    }

    /// Adds every rule in order; see [`Redirects::add_redirect`]
    pub fn add_redirects<I>(&mut self, redirects: I)
    where
        I: IntoIterator<Item = Redirect>,
    {
        for redirect in redirects {
            self.add_redirect(redirect);
        }
    }

    /// Imports the rules of the redirect plugin
    ///
    /// Never fails: a transport error, a status of 400 or above, or an
    /// unexpected body is logged and leaves the collection unchanged.
    ///
    /// # Returns
    ///
    /// The number of rules added
    pub async fn get_from_plugin(
        &mut self,
        api_url: &str,
        auth_token: &str,
        fetcher: &HttpFetcher,
    ) -> usize {
        match self.try_get_from_plugin(api_url, auth_token, fetcher).await {
            Ok(added) => {
                info!("Imported {} redirects from {}", added, api_url);
                added
            }
            Err(e) => {
                warn!(
                    "Redirects are not valid ({}). Make sure the redirect plugin is properly configured.",
                    e
                );
                0
            }
        }
    }

    async fn try_get_from_plugin(
        &mut self,
        api_url: &str,
        auth_token: &str,
        fetcher: &HttpFetcher,
    ) -> Result<usize> {
        let (status, body) = fetcher.get_authorized(api_url, auth_token).await?;
        if status >= 400 {
            return Err(MirrorError::RemoteApi {
                url: api_url.to_string(),
                status,
            });
        }

        let response: PluginResponse = serde_json::from_str(&body)?;
        let before = self.len();
        for item in response.items {
            let Some(redirect) = item.into_redirect() else {
                debug!("Skipping redirect without source or target");
                continue;
            };
            trace!("Redirect from plugin: {}", redirect.as_json());
            self.add_redirect(redirect);
        }
        Ok(self.len() - before)
    }

    /// Adds the catch-all rule sending searches on any path to the search page
    pub fn add_search(&mut self, search_page: &str) {
        self.add_redirect(Redirect::new(
            "/*",
            &format!("/{}/", search_page),
            Some("s=:s"),
            301,
            true,
            RedirectSource::None,
        ));
    }

    /// Renders every rule in insertion order for the given host kind
    pub fn render(&self, host: HostKind) -> Result<String> {
        if host.uses_block_redirects() {
            return render_toml(&self.items);
        }
        Ok(self
            .items
            .iter()
            .map(|redirect| format!("{}\n", redirect.as_line()))
            .collect())
    }

    /// Writes the rendered rules to `path`
    pub fn save(&self, path: &Path, host: HostKind) -> Result<()> {
        std::fs::write(path, self.render(host)?)?;
        info!("Wrote {} redirects to {}", self.len(), path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Redirect> {
        self.items.iter()
    }
}
