//! Store lifecycle: install and activate.
//!
//! Install runs three population tasks concurrently and settles the
//! `Readiness` signal once all of them have finished (or one has failed).
//! Activate prunes every partition that is not part of the current
//! `CacheNames` set. There is no other transition.

pub mod populate;
pub mod readiness;

use std::sync::Arc;

use url::Url;

pub use readiness::{InstallState, Readiness};

use crate::fetch::Network;
use pantry_core::config::ConfigError;
use pantry_core::store::CacheNames;
use pantry_core::{AppConfig, CacheName, CacheStore, Error, RecordStore};

/// What install fetches and where it goes.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub names: CacheNames,
    pub fallback_images: Vec<Url>,
    pub precache: Vec<Url>,
    pub catalog_url: Url,
}

impl InstallPlan {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let fallback_images = config
            .fallback_categories
            .iter()
            .map(|category| config.fallback_image_url(&category.to_lowercase()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            names: config.cache_names(),
            fallback_images,
            precache: config.precache_url_list()?,
            catalog_url: config.catalog_url()?,
        })
    }
}

/// Counts from a successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    pub fallback_images: usize,
    pub precached: usize,
    pub records: u64,
}

pub struct Lifecycle {
    caches: Arc<dyn CacheStore>,
    records: Arc<dyn RecordStore>,
    network: Arc<dyn Network>,
    plan: InstallPlan,
    readiness: Readiness,
}

impl Lifecycle {
    pub fn new(
        caches: Arc<dyn CacheStore>, records: Arc<dyn RecordStore>, network: Arc<dyn Network>, plan: InstallPlan,
    ) -> Self {
        Self { caches, records, network, plan, readiness: Readiness::pending() }
    }

    /// Signal settled by `install`; hand it to the engine.
    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    pub fn plan(&self) -> &InstallPlan {
        &self.plan
    }

    /// Populate fallback images, the precache, and the record store.
    ///
    /// # Errors
    ///
    /// Returns the first task error. The readiness signal then reports
    /// failure and the engine must not be put in front of traffic.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        tracing::info!(version = self.plan.names.version(), "install started");

        let images = self.plan.names.name(CacheName::FallbackImages);
        let precache = self.plan.names.name(CacheName::Precache);
        let network = self.network.as_ref();

        let result = tokio::try_join!(
            populate::add_all(&self.caches, network, &images, &self.plan.fallback_images),
            populate::add_all(&self.caches, network, &precache, &self.plan.precache),
            populate::import_catalog(self.records.as_ref(), network, &self.plan.catalog_url),
        );

        match result {
            Ok((fallback_images, precached, records)) => {
                self.readiness.settle(InstallState::Ready);
                let report = InstallReport { fallback_images, precached, records };
                tracing::info!(?report, "install complete");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.readiness.settle(InstallState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Delete every partition that is not current. Returns the deleted
    /// names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.caches.partition_names().await? {
            if self.plan.names.is_current(&name) {
                continue;
            }
            if self.caches.delete_partition(&name).await? {
                tracing::info!(partition = %name, "pruned stale partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_from_default_config() {
        let plan = InstallPlan::from_config(&AppConfig::default()).unwrap();
        assert_eq!(plan.fallback_images.len(), 8);
        assert_eq!(plan.fallback_images[0].as_str(), "https://localhost:3100/images/fallback-grocery.png");
        assert_eq!(plan.precache.len(), 1);
        assert_eq!(plan.precache[0].as_str(), "http://localhost:8080/");
        assert_eq!(plan.names.name(CacheName::Precache), "precache-v1");
    }

    #[test]
    fn test_plan_lowercases_categories() {
        let config = AppConfig {
            fallback_categories: vec!["Dairy".into(), "grocery".into()],
            ..Default::default()
        };
        let plan = InstallPlan::from_config(&config).unwrap();
        assert!(plan.fallback_images[0].as_str().ends_with("fallback-dairy.png"));
    }
}
