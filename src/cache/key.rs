//! Deterministic cache key derivation
//!
//! Keys are derived from a purpose namespace, positional arguments and
//! keyword arguments. Keyword arguments are sorted by name before joining
//! so that logically identical inputs always map to the same key. The
//! joined string is hashed with SHA-256 to bound key length.

use sha2::{Digest, Sha256};

/// Namespace for cached final responses
pub const PURPOSE_QUERY_RESPONSE: &str = "query_response";

/// Namespace for cached retrieval results
pub const PURPOSE_VECTOR_STORE: &str = "vector_store";

/// Derive a cache key from a purpose, positional args and keyword args.
pub fn cache_key(purpose: &str, args: &[&str], kwargs: &[(&str, &str)]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(1 + args.len() + kwargs.len());
    parts.push(purpose.to_string());
    parts.extend(args.iter().map(|a| a.to_string()));

    let mut sorted: Vec<(&str, &str)> = kwargs.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    parts.extend(sorted.iter().map(|(k, v)| format!("{k}={v}")));

    let joined = parts.join("|");
    let digest = Sha256::digest(joined.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kwarg_order_is_irrelevant() {
        let a = cache_key("query_response", &["q"], &[("k", "4"), ("domain", "billing")]);
        let b = cache_key("query_response", &["q"], &[("domain", "billing"), ("k", "4")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_inputs_produce_different_keys() {
        let a = cache_key("query_response", &["q1"], &[]);
        let b = cache_key("query_response", &["q2"], &[]);
        assert_ne!(a, b);

        let c = cache_key("vector_store", &["q1"], &[]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_is_hex_digest() {
        let key = cache_key("vector_store", &["what is the refund policy", "billing"], &[("k", "4")]);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_positional_order_matters() {
        let a = cache_key("vector_store", &["a", "b"], &[]);
        let b = cache_key("vector_store", &["b", "a"], &[]);
        assert_ne!(a, b);
    }
}
