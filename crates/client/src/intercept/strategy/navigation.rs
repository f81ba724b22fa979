//! Navigation requests: live page when online, precached shell when not.

use pantry_core::{CacheName, InterceptedRequest};

use crate::fetch::RequestMode;
use crate::intercept::{Engine, Served, Source, StrategyError};

/// Fetch the page; on a network failure serve the application shell.
///
/// Non-2xx pages are returned as-is. The live response is never stored.
pub async fn execute(engine: &Engine, request: &InterceptedRequest) -> Result<Served, StrategyError> {
    match engine.network.fetch(request, RequestMode::Default).await {
        Ok(response) => Ok(Served::new(response, Source::Network)),
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "navigation offline, serving shell");
            let shell = InterceptedRequest::get(engine.settings.shell_url.clone());
            engine
                .lookup(CacheName::Precache, &shell)
                .await
                .map(|response| Served::new(response, Source::AppShell))
                .ok_or_else(|| StrategyError::ShellMissing { url: shell.url.to_string() })
        }
    }
}
