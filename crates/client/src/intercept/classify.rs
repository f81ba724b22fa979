//! Request classification.
//!
//! Every intercepted request maps to exactly one `Strategy`. The rules are
//! checked in order and the first match wins.

use std::fmt;

use pantry_core::InterceptedRequest;
use url::Origin;

/// The policy applied to a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Same-origin HTML: network, falling back to the precached shell.
    NavigationFallback,
    /// `/images/` with an image Accept: network, stored copy, category placeholder.
    ImageWithCategoryFallback,
    /// GET against the API origin: network first, stored copy when offline.
    ApiNetworkFirst,
    /// Everything else goes to the network untouched.
    Passthrough,
}

impl Strategy {
    /// Whether the precache is consulted before the strategy runs.
    pub fn checks_precache(self) -> bool {
        matches!(self, Strategy::ImageWithCategoryFallback | Strategy::ApiNetworkFirst)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strategy::NavigationFallback => "navigation-fallback",
            Strategy::ImageWithCategoryFallback => "image-with-category-fallback",
            Strategy::ApiNetworkFirst => "api-network-first",
            Strategy::Passthrough => "passthrough",
        };
        f.write_str(label)
    }
}

/// The two origins classification depends on.
#[derive(Debug, Clone)]
pub struct Classifier {
    app_origin: Origin,
    api_origin: Origin,
}

impl Classifier {
    pub fn new(app_origin: &url::Url, api_origin: &url::Url) -> Self {
        Self { app_origin: app_origin.origin(), api_origin: api_origin.origin() }
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Strategy {
        let accept = request.accept().unwrap_or("");
        let origin = request.origin();

        if accept.contains("text/html") && origin == self.app_origin {
            Strategy::NavigationFallback
        } else if accept.contains("image/*") && request.path().starts_with("/images/") {
            Strategy::ImageWithCategoryFallback
        } else if origin == self.api_origin && request.is_get() {
            Strategy::ApiNetworkFirst
        } else {
            Strategy::Passthrough
        }
    }
}
