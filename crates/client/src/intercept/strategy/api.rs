//! API requests: network first, last stored copy when offline.

use pantry_core::{CacheName, InterceptedRequest, Partition};

use crate::fetch::RequestMode;
use crate::intercept::{Engine, Served, Source, StrategyError};

/// Fetch from the API and keep a copy of whatever comes back.
///
/// Any status counts as a response here, so error bodies are stored too.
/// When the network is unreachable the stored copy for the exact request
/// is returned, or the request misses.
pub async fn execute(engine: &Engine, request: &InterceptedRequest) -> Result<Served, StrategyError> {
    let name = engine.settings.names.name(CacheName::FallbackResponses);
    let partition = match Partition::open(engine.caches.clone(), name).await {
        Ok(partition) => Some(partition),
        Err(e) => {
            tracing::warn!(error = %e, "fallback-responses unavailable");
            None
        }
    };

    match engine.network.fetch(request, RequestMode::Default).await {
        Ok(response) => {
            if let Some(partition) = &partition
                && let Err(e) = partition.put(request, &response).await
            {
                tracing::warn!(url = %request.url, error = %e, "failed to store API response");
            }
            Ok(Served::new(response, Source::Network))
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "API offline, trying stored response");
            let stored = match &partition {
                Some(partition) => partition.lookup(request).await.unwrap_or_else(|e| {
                    tracing::warn!(url = %request.url, error = %e, "stored response lookup failed");
                    None
                }),
                None => None,
            };
            stored
                .map(|response| Served::new(response, Source::StoredResponse))
                .ok_or_else(|| StrategyError::NoStoredResponse { url: request.url.to_string() })
        }
    }
}
