//! Request key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request.
///
/// Keys cover the method and the fragment-free URL; the method is
/// upper-cased so `get` and `GET` collide.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let url = url.split_once('#').map_or(url, |(base, _)| base);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
