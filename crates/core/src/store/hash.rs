//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::InterceptedRequest;

/// Compute the key under which a response to `method url` is stored.
///
/// Fragments never reach the network, so they are dropped before hashing.
/// The query string is kept as-is; two requests only match when their
/// method and URL match exactly.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Key for an intercepted request.
pub fn request_key(request: &InterceptedRequest) -> String {
    compute_request_key(&request.method, &request.url)
}
