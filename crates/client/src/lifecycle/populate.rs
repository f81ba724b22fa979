//! Install-time population of the partitions and the record store.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::fetch::{Network, RequestMode};
use pantry_core::{CacheStore, CatalogRecord, Error, InterceptedRequest, Partition, RecordStore};

/// Body of the catalog endpoint.
#[derive(Debug, Deserialize)]
struct CatalogPayload {
    data: Vec<CatalogRecord>,
}

/// Fetch every URL and store the responses in `partition`.
///
/// All-or-nothing: every response must be ok before anything is written,
/// so a failed install leaves no half-filled partition behind.
pub async fn add_all(
    caches: &Arc<dyn CacheStore>, network: &dyn Network, partition: &str, urls: &[Url],
) -> Result<usize, Error> {
    let target = Partition::open(Arc::clone(caches), partition).await?;

    let mut fetched = Vec::with_capacity(urls.len());
    for url in urls {
        let request = InterceptedRequest::get(url.clone());
        let response = network.fetch(&request, RequestMode::Default).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("{url} returned status {}", response.status)));
        }
        fetched.push((request, response));
    }

    for (request, response) in &fetched {
        target.put(request, response).await?;
    }

    tracing::info!(partition, count = fetched.len(), "partition populated");
    Ok(fetched.len())
}

/// Download the catalog and load it into the record store in one
/// transaction.
pub async fn import_catalog(records: &dyn RecordStore, network: &dyn Network, catalog_url: &Url) -> Result<u64, Error> {
    let request = InterceptedRequest::get(catalog_url.clone()).with_header("Accept", "application/json");
    let response = network.fetch(&request, RequestMode::Default).await?;
    if !response.is_ok() {
        return Err(Error::HttpError(format!("{catalog_url} returned status {}", response.status)));
    }

    let payload: CatalogPayload =
        serde_json::from_slice(&response.body).map_err(|e| Error::CatalogImport(e.to_string()))?;

    let count = records.bulk_insert(payload.data).await?;
    tracing::info!(count, "catalog imported");
    Ok(count)
}
