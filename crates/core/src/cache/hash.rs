//! Cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// The key is the SHA-256 hex digest of the URL concatenated with an
/// optional variant string. The variant disambiguates requests that share a
/// URL but must be cached separately (e.g. differing POST bodies or query
/// context not present in the URL). An empty variant yields the same key as
/// the bare URL.
pub fn compute_key(url: &str, variant: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(variant.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_key("https://example.com", "");
        let key2 = compute_key("https://example.com", "");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_variant_disambiguation() {
        let a = compute_key("https://example.com", "a");
        let b = compute_key("https://example.com", "b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_variant_matches_bare_url() {
        let bare = compute_key("https://example.com", "");
        let mut hasher = Sha256::new();
        hasher.update(b"https://example.com");
        assert_eq!(bare, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_key_format() {
        let key = compute_key("https://example.com", "page=2");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
