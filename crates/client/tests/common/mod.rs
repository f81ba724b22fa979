//! Shared fixtures: a scripted network and a fully wired engine.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pantry_client::{Engine, EngineSettings, FetchError, InstallPlan, Lifecycle, Network, RequestMode};
use pantry_core::{AppConfig, CacheStore, Error, HttpResponse, InterceptedRequest, RecordStore, StorageDb};

pub const APP: &str = "http://localhost:8080";
pub const API: &str = "https://localhost:3100";
pub const CATALOG_URL: &str = "https://localhost:3100/api/grocery/items?limit=99999";
pub const SHELL_HTML: &str = "<html><body>shell</body></html>";

/// In-memory `Network` answering from a URL table.
///
/// Unknown URLs get a 404. While offline every fetch fails with a connect
/// error.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(String, RequestMode)>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, RequestMode)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &InterceptedRequest, mode: RequestMode) -> Result<HttpResponse, FetchError> {
        self.calls.lock().unwrap().push((request.url.to_string(), mode));
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connect("network unreachable".into()));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "not found")))
    }
}

/// `CacheStore` whose writes always fail, as if the quota were exhausted.
pub struct FailingWrites(pub StorageDb);

#[async_trait]
impl CacheStore for FailingWrites {
    async fn create_partition(&self, name: &str) -> Result<(), Error> {
        self.0.create_partition(name).await
    }

    async fn lookup(&self, partition: &str, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        self.0.lookup(partition, request).await
    }

    async fn put(&self, _partition: &str, _request: &InterceptedRequest, _response: &HttpResponse) -> Result<(), Error> {
        Err(Error::InvalidInput("quota exceeded".into()))
    }

    async fn lookup_any(&self, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        self.0.lookup_any(request).await
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.0.partition_names().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.0.delete_partition(name).await
    }
}

/// `CacheStore` whose writes take `delay` before landing.
pub struct SlowWrites {
    pub inner: StorageDb,
    pub delay: Duration,
}

#[async_trait]
impl CacheStore for SlowWrites {
    async fn create_partition(&self, name: &str) -> Result<(), Error> {
        self.inner.create_partition(name).await
    }

    async fn lookup(&self, partition: &str, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        self.inner.lookup(partition, request).await
    }

    async fn put(&self, partition: &str, request: &InterceptedRequest, response: &HttpResponse) -> Result<(), Error> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(partition, request, response).await
    }

    async fn lookup_any(&self, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        self.inner.lookup_any(request).await
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.inner.partition_names().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_partition(name).await
    }
}

pub fn placeholder_body(category: &str) -> String {
    format!("png:{category}")
}

pub fn image_request(path: &str) -> InterceptedRequest {
    InterceptedRequest::get_str(&format!("{API}{path}"))
        .unwrap()
        .with_header("Accept", "image/webp,image/apng,image/*,*/*;q=0.8")
}

pub fn api_request(path: &str) -> InterceptedRequest {
    InterceptedRequest::get_str(&format!("{API}{path}"))
        .unwrap()
        .with_header("Accept", "application/json")
}

pub fn page_request(path: &str) -> InterceptedRequest {
    InterceptedRequest::get_str(&format!("{APP}{path}"))
        .unwrap()
        .with_header("Accept", "text/html,application/xhtml+xml")
}

/// Routes every URL a default install needs.
pub fn script_install(network: &ScriptedNetwork, config: &AppConfig) {
    for category in &config.fallback_categories {
        let category = category.to_lowercase();
        let url = config.fallback_image_url(&category).unwrap();
        network.respond(
            url.as_str(),
            HttpResponse::new(200, placeholder_body(&category)).with_header("Content-Type", "image/png"),
        );
    }
    network.respond(
        config.shell_url().unwrap().as_str(),
        HttpResponse::new(200, SHELL_HTML).with_header("Content-Type", "text/html"),
    );
    network.respond(
        CATALOG_URL,
        HttpResponse::new(
            200,
            r#"{"data":[{"id":42,"category":"Dairy","name":"Milk"},{"id":7,"category":"Bakery","name":"Bread"}]}"#,
        )
        .with_header("Content-Type", "application/json"),
    );
}

pub struct Harness {
    pub config: AppConfig,
    pub db: StorageDb,
    pub network: Arc<ScriptedNetwork>,
    pub lifecycle: Lifecycle,
    pub engine: Engine,
}

impl Harness {
    pub async fn new(config: AppConfig) -> Self {
        let db = StorageDb::open_in_memory().await.unwrap();
        let caches: Arc<dyn CacheStore> = Arc::new(db.clone());
        Self::with_caches(config, db, caches).await
    }

    pub async fn with_caches(config: AppConfig, db: StorageDb, caches: Arc<dyn CacheStore>) -> Self {
        let records: Arc<dyn RecordStore> = Arc::new(db.clone());
        let network = Arc::new(ScriptedNetwork::default());
        script_install(&network, &config);

        let shared: Arc<dyn Network> = network.clone();
        let lifecycle = Lifecycle::new(
            caches.clone(),
            records.clone(),
            shared.clone(),
            InstallPlan::from_config(&config).unwrap(),
        );
        let engine = Engine::new(
            caches,
            records,
            shared,
            EngineSettings::from_config(&config).unwrap(),
            lifecycle.readiness(),
        );

        Self { config, db, network, lifecycle, engine }
    }

    /// Harness with install already completed.
    pub async fn installed() -> Self {
        let harness = Self::new(AppConfig::default()).await;
        harness.lifecycle.install().await.unwrap();
        harness
    }
}
