//! Stylesheet detection and cache-busting markers.

use url::Url;

/// Query parameters that force a stylesheet past the CSS cache.
pub const BUST_MARKERS: &[&str] = &["v", "version", "bust", "sw-bypass"];

/// Whether the URL names a stylesheet.
pub fn is_stylesheet(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".css")
}

/// Whether the URL carries a cache-busting marker.
pub fn has_bust_marker(url: &Url) -> bool {
    url.query_pairs().any(|(name, _)| BUST_MARKERS.contains(&name.as_ref()))
}

/// The CSS bucket key: the URL without markers or fragment.
///
/// A busted refresh and a plain request for the same stylesheet share one
/// entry.
pub fn cache_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !BUST_MARKERS.contains(&name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        key.set_query(None);
    } else {
        key.query_pairs_mut().clear().extend_pairs(kept);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_is_stylesheet() {
        assert!(is_stylesheet(&url("http://localhost/style/index.css")));
        assert!(is_stylesheet(&url("http://localhost/style/index.css?v=3")));
        assert!(!is_stylesheet(&url("http://localhost/scripts/themeSwitch.js")));
        assert!(!is_stylesheet(&url("http://localhost/css/")));
    }

    #[test]
    fn test_bust_markers() {
        assert!(has_bust_marker(&url("http://localhost/style/root.css?v=2")));
        assert!(has_bust_marker(&url("http://localhost/style/root.css?sw-bypass=1")));
        assert!(has_bust_marker(&url("http://localhost/style/root.css?theme=dark&bust=9")));
        assert!(!has_bust_marker(&url("http://localhost/style/root.css?theme=dark")));
        assert!(!has_bust_marker(&url("http://localhost/style/root.css")));
    }

    #[test]
    fn test_cache_key_strips_markers() {
        assert_eq!(
            cache_key(&url("http://localhost/style/root.css?v=2")).as_str(),
            "http://localhost/style/root.css"
        );
        assert_eq!(
            cache_key(&url("http://localhost/style/root.css?theme=dark&version=4#x")).as_str(),
            "http://localhost/style/root.css?theme=dark"
        );
    }
}
