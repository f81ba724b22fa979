//! Request interception engine.
//!
//! `Engine::handle` is called once per intercepted request and either
//! answers it or declines with `Outcome::Passthrough`, in which case the
//! caller forwards the request unmodified.
//!
//! ### Routing
//! 1. Classify the request (see [`classify`]).
//! 2. Image and API requests check the precache first; a hit is final.
//! 3. Run the strategy executor for the class.
//!
//! Executors never fail outward: a `StrategyError` is logged and answered
//! with an empty 503.

pub mod classify;
pub mod fallback;
pub mod strategy;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

pub use classify::{Classifier, Strategy};

use crate::fetch::Network;
use crate::lifecycle::Readiness;
use pantry_core::config::{ConfigError, fallback_image_url};
use pantry_core::{AppConfig, CacheName, CacheStore, HttpResponse, InterceptedRequest, RecordStore};
use pantry_core::store::CacheNames;

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Live upstream response.
    Network,
    /// Precache hit before any network attempt.
    Precache,
    /// Previously stored copy from fallback-responses.
    StoredResponse,
    /// Placeholder for the request's catalog category.
    CategoryFallback,
    /// Placeholder for the generic category.
    GenericFallback,
    /// Precached application shell served for a navigation.
    AppShell,
    /// Nothing matched; synthesized 503.
    Unavailable,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Precache => "precache",
            Source::StoredResponse => "stored-response",
            Source::CategoryFallback => "category-fallback",
            Source::GenericFallback => "generic-fallback",
            Source::AppShell => "app-shell",
            Source::Unavailable => "unavailable",
        }
    }
}

/// A response chosen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: HttpResponse,
    pub source: Source,
}

impl Served {
    pub fn new(response: HttpResponse, source: Source) -> Self {
        Self { response, source }
    }
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Respond(Served),
    /// Not handled; forward the original request unmodified.
    Passthrough,
}

/// Terminal misses of a strategy executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StrategyError {
    #[error("application shell {url} is not precached")]
    ShellMissing { url: String },

    #[error("no stored response for {url}")]
    NoStoredResponse { url: String },

    #[error("no fallback image for {url}")]
    NoFallbackImage { url: String },
}

/// Values the engine derives from configuration once at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub app_origin: Url,
    pub api_origin: Url,
    pub shell_url: Url,
    pub names: CacheNames,
    /// Lower-cased, matching the placeholder URLs install stores.
    pub generic_category: String,
    image_base_url: String,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            app_origin: config.app_origin_url()?,
            api_origin: config.api_origin_url()?,
            shell_url: config.shell_url()?,
            names: config.cache_names(),
            generic_category: config.generic_category.to_lowercase(),
            image_base_url: config.image_base_url.clone(),
        })
    }

    pub fn fallback_image_url(&self, category: &str) -> Result<Url, ConfigError> {
        fallback_image_url(&self.image_base_url, category)
    }
}

/// The interception engine. Cheap to clone; clones share stores and
/// pending background writes.
#[derive(Clone)]
pub struct Engine {
    pub(crate) caches: Arc<dyn CacheStore>,
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) settings: Arc<EngineSettings>,
    pub(crate) readiness: Readiness,
    classifier: Classifier,
    write_backs: Arc<Mutex<JoinSet<()>>>,
}

impl Engine {
    pub fn new(
        caches: Arc<dyn CacheStore>, records: Arc<dyn RecordStore>, network: Arc<dyn Network>,
        settings: EngineSettings, readiness: Readiness,
    ) -> Self {
        let classifier = Classifier::new(&settings.app_origin, &settings.api_origin);
        Self {
            caches,
            records,
            network,
            settings: Arc::new(settings),
            readiness,
            classifier,
            write_backs: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Strategy {
        self.classifier.classify(request)
    }

    /// Decide how to answer `request`.
    pub async fn handle(&self, request: &InterceptedRequest) -> Outcome {
        let strategy = self.classify(request);
        tracing::debug!(%strategy, method = %request.method, url = %request.url, "classified request");

        if strategy == Strategy::Passthrough {
            return Outcome::Passthrough;
        }

        if strategy.checks_precache()
            && let Some(hit) = self.lookup(CacheName::Precache, request).await
        {
            tracing::debug!(url = %request.url, "precache hit");
            return Outcome::Respond(Served::new(hit, Source::Precache));
        }

        let result = match strategy {
            Strategy::NavigationFallback => strategy::navigation::execute(self, request).await,
            Strategy::ImageWithCategoryFallback => strategy::image::execute(self, request).await,
            Strategy::ApiNetworkFirst => strategy::api::execute(self, request).await,
            Strategy::Passthrough => return Outcome::Passthrough,
        };

        match result {
            Ok(served) => {
                tracing::debug!(url = %request.url, source = served.source.as_str(), status = served.response.status, "served");
                Outcome::Respond(served)
            }
            Err(e) => {
                tracing::warn!(%strategy, error = %e, "all fallbacks missed");
                Outcome::Respond(Served::new(HttpResponse::service_unavailable(), Source::Unavailable))
            }
        }
    }

    /// Wait for every background cache write started so far.
    ///
    /// The pending set is taken out under the lock, so writes started while
    /// flushing are not blocked by it.
    pub async fn flush_write_backs(&self) {
        let mut tasks = std::mem::take(&mut *self.write_backs.lock().await);
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "background cache write task aborted");
            }
        }
    }

    /// Lookup in one partition; storage errors count as a miss.
    pub(crate) async fn lookup(&self, cache: CacheName, request: &InterceptedRequest) -> Option<HttpResponse> {
        let partition = self.settings.names.name(cache);
        match self.caches.lookup(&partition, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%partition, url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a copy of `response` without making the caller wait for it.
    pub(crate) async fn store_in_background(
        &self, cache: CacheName, request: &InterceptedRequest, response: &HttpResponse,
    ) {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "only GET responses are stored");
            return;
        }

        let caches = Arc::clone(&self.caches);
        let partition = self.settings.names.name(cache);
        let request = request.clone();
        let response = response.clone();

        let mut tasks = self.write_backs.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = caches.put(&partition, &request, &response).await {
                tracing::warn!(%partition, url = %request.url, error = %e, "background cache write failed");
            }
        });
    }
}
