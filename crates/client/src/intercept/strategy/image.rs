//! Catalog images: network, then stored copy, then a category placeholder.

use pantry_core::{CacheName, InterceptedRequest};

use crate::fetch::RequestMode;
use crate::intercept::{Engine, Served, Source, StrategyError, fallback};

/// Fetch the image in CORS mode.
///
/// - ok: a copy is written to fallback-responses in the background and the
///   live response is returned right away
/// - not ok: placeholder, nothing stored
/// - network failure: stored copy for this request, else placeholder
pub async fn execute(engine: &Engine, request: &InterceptedRequest) -> Result<Served, StrategyError> {
    match engine.network.fetch(request, RequestMode::Cors).await {
        Ok(response) if response.is_ok() => {
            engine
                .store_in_background(CacheName::FallbackResponses, request, &response)
                .await;
            Ok(Served::new(response, Source::Network))
        }
        Ok(response) => {
            tracing::debug!(url = %request.url, status = response.status, "image not ok, using placeholder");
            placeholder(engine, request).await
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "image offline, trying stored copy");
            match engine.lookup(CacheName::FallbackResponses, request).await {
                Some(stored) => Ok(Served::new(stored, Source::StoredResponse)),
                None => placeholder(engine, request).await,
            }
        }
    }
}

async fn placeholder(engine: &Engine, request: &InterceptedRequest) -> Result<Served, StrategyError> {
    if let Some(image) = fallback::category_image(engine, request).await {
        return Ok(Served::new(image, Source::CategoryFallback));
    }
    if let Some(image) = fallback::generic_image(engine).await {
        return Ok(Served::new(image, Source::GenericFallback));
    }
    Err(StrategyError::NoFallbackImage { url: request.url.to_string() })
}
