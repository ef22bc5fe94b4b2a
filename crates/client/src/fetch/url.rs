//! Origin canonicalization and path resolution.

use url::Url;

/// Error type for URL handling failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a site origin given by the user.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing
/// 3. Lowercase the host
/// 4. Drop path, query and fragment, leaving `scheme://host[:port]/`
pub fn canonicalize_origin(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_path("/");
    parsed.set_query(None);
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a site path such as `/assets/data/patches.json` or
/// `./assets/data/patches.json` against an origin.
pub fn resolve(origin: &Url, path: &str) -> Result<Url, UrlError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(UrlError::Empty);
    }
    origin.join(path).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize_origin("http://localhost:8080").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize_origin("localhost:8080").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize_origin("https://PATCHNOTES.EXAMPLE").unwrap();
        assert_eq!(url.host_str(), Some("patchnotes.example"));
    }

    #[test]
    fn test_canonicalize_strips_path() {
        let url = canonicalize_origin("https://example.com/pages/balance/4758.html?x=1#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize_origin("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize_origin("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_relative_and_absolute_paths() {
        let origin = canonicalize_origin("http://localhost:8080").unwrap();
        assert_eq!(
            resolve(&origin, "./assets/data/patches.json").unwrap().as_str(),
            "http://localhost:8080/assets/data/patches.json"
        );
        assert_eq!(
            resolve(&origin, "/index.html").unwrap().as_str(),
            "http://localhost:8080/index.html"
        );
    }
}
