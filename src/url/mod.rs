//! URL handling module for site-mirror
//!
//! This module provides location cleaning, link discovery, host rewriting
//! and the classification of raw locations into typed, hashed resources.

mod domain;
mod links;
mod normalize;

use crate::config::Settings;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use url::Url;

// Re-export main functions
pub use domain::netloc;
pub use links::{extract_urls_from_raw_text, find_links};
pub use normalize::{clean_url, decode_location, update_links};

/// Content-type tag of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UrlKind {
    /// Excluded or unclassifiable; never fetched or saved
    None,
    Binary,
    Image,
    Pdf,
    Html,
    Js,
    Css,
    Txt,
    Xml,
    Json,
    /// Directory-like location, saved as `index.html` beneath its path
    #[default]
    Folder,
    /// Site root, saved as the top-level `index.html`
    Home,
    Fonts,
    Zip,
}

impl UrlKind {
    /// Returns the upper-case name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Binary => "BINARY",
            Self::Image => "IMAGE",
            Self::Pdf => "PDF",
            Self::Html => "HTML",
            Self::Js => "JS",
            Self::Css => "CSS",
            Self::Txt => "TXT",
            Self::Xml => "XML",
            Self::Json => "JSON",
            Self::Folder => "FOLDER",
            Self::Home => "HOME",
            Self::Fonts => "FONTS",
            Self::Zip => "ZIP",
        }
    }

    /// Returns true if fetched bodies of this kind are scanned for links
    pub fn is_link_source(&self) -> bool {
        matches!(self, Self::Folder | Self::Html | Self::Js | Self::Home)
    }

    /// Returns true if this kind is saved as host-rewritten text
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::Html | Self::Xml | Self::Folder | Self::Js | Self::Css | Self::Txt | Self::Home
        )
    }

    /// Returns true if this kind is saved as an `index.html` beneath its path
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Folder | Self::Home)
    }
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlKind {
    type Err = crate::UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.to_ascii_uppercase().as_str() {
            "NONE" => Self::None,
            "BINARY" => Self::Binary,
            "IMAGE" => Self::Image,
            "PDF" => Self::Pdf,
            "HTML" => Self::Html,
            "JS" => Self::Js,
            "CSS" => Self::Css,
            "TXT" => Self::Txt,
            "XML" => Self::Xml,
            "JSON" => Self::Json,
            "FOLDER" => Self::Folder,
            "HOME" => Self::Home,
            "FONTS" => Self::Fonts,
            "ZIP" => Self::Zip,
            other => return Err(crate::UrlError::Parse(format!("unknown kind '{}'", other))),
        };
        Ok(kind)
    }
}

/// SHA-256 hex digest of a string; the identity of a canonical location
pub fn identity_hash(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// A raw location resolved into its canonical form
#[derive(Debug, Clone)]
pub struct Classified {
    /// Canonical absolute location
    pub loc: String,

    /// Parsed canonical location, `None` when it does not parse
    pub url: Option<Url>,

    pub kind: UrlKind,

    /// Identity hash of `loc`
    pub hash: String,
}

impl Classified {
    /// Returns true if this location may be fetched
    ///
    /// A valid location has a scheme, a host containing at least one dot
    /// (port included) and a path, unless it is the site root.
    pub fn is_valid(&self) -> bool {
        let Some(url) = &self.url else {
            return false;
        };
        let host = netloc(url);
        !url.scheme().is_empty()
            && !host.is_empty()
            && host.contains('.')
            && (!url.path().is_empty() || self.kind == UrlKind::Home)
    }
}

/// Classifies a raw location
///
/// # Classification Steps
///
/// 1. Percent-decode and turn `\/` into `/`
/// 2. Prefix `default_scheme://` unless an accepted scheme is present
/// 3. Clean the location (see [`clean_url`]) when cleaning is enabled,
///    applying `scheme_override` if non-empty
/// 4. Infer the kind from the text after the last `.` of the path using the
///    extension table; `hint` is kept when nothing matches
/// 5. Force [`UrlKind::None`] when any `exclude` substring is in the path
/// 6. Give [`UrlKind::Folder`] locations a trailing slash
/// 7. Hash the final location
///
/// # Examples
///
/// ```
/// use site_mirror::config::Settings;
/// use site_mirror::url::{classify, UrlKind};
///
/// let settings = Settings::default();
/// let c = classify("old.example/photo.PNG", UrlKind::Folder, "", &settings, &[]);
/// assert_eq!(c.kind, UrlKind::Image);
/// assert_eq!(c.loc, "https://old.example/photo.PNG");
/// ```
pub fn classify(
    raw: &str,
    hint: UrlKind,
    scheme_override: &str,
    settings: &Settings,
    exclude: &[String],
) -> Classified {
    let mut loc = decode_location(raw);

    let has_scheme = settings
        .schemes
        .iter()
        .any(|scheme| loc.starts_with(&format!("{}://", scheme)));
    if !has_scheme {
        loc = format!("{}://{}", settings.default_scheme, loc);
    }

    if settings.clean.url {
        loc = clean_url(&loc, "", scheme_override, &settings.clean.chars);
    }

    let mut url = Url::parse(&loc).ok();
    let path = url.as_ref().map(|u| u.path().to_string()).unwrap_or_default();

    let mut kind = hint;
    if let Some(extension) = path.rsplit('.').next().filter(|e| !e.is_empty()) {
        if let Some(found) = settings.kind_for_extension(extension) {
            kind = found;
        }
    }

    if exclude.iter().any(|pattern| path.contains(pattern.as_str())) {
        kind = UrlKind::None;
    }

    if kind == UrlKind::Folder && !path.ends_with('/') {
        loc.push('/');
        url = Url::parse(&loc).ok();
    }

    let hash = identity_hash(&loc);
    Classified {
        loc,
        url,
        kind,
        hash,
    }
}
