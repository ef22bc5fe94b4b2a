//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// Buckets are keyed by method and full URL, query string included.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "http://localhost/index.html");
        let hash2 = compute_cache_key("GET", "http://localhost/index.html");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(
            compute_cache_key("get", "http://localhost/"),
            compute_cache_key("GET", "http://localhost/")
        );
    }

    #[test]
    fn test_hash_query_significant() {
        let plain = compute_cache_key("GET", "http://localhost/style/index.css");
        let versioned = compute_cache_key("GET", "http://localhost/style/index.css?v=2");
        assert_ne!(plain, versioned);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "http://localhost/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
