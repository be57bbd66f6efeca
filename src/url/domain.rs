use url::Url;

/// Returns the network location of a URL: the lowercase host plus an
/// explicit port when one is present
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::netloc;
///
/// let url = Url::parse("https://Old.Example/path").unwrap();
/// assert_eq!(netloc(&url), "old.example");
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(netloc(&url), "127.0.0.1:8080");
/// ```
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}
