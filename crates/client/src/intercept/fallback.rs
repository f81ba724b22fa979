//! Category placeholder resolution for failed image requests.
//!
//! `/images/42.png` names catalog record 42. The record's category selects a
//! placeholder from the fallback-images partition. Every failure along the
//! way is a miss, never an error.

use pantry_core::{CacheName, HttpResponse, InterceptedRequest};

use super::Engine;

/// Record key encoded in an image path: the text between the last `/` and
/// the last `.`, which must be a non-empty run of ASCII digits.
pub fn parse_record_key(path: &str) -> Option<i64> {
    let start = path.rfind('/').map_or(0, |i| i + 1);
    let end = path.rfind('.')?;
    if end <= start {
        return None;
    }

    let segment = &path[start..end];
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Placeholder for the category of the record named by `request`'s path.
///
/// Waits for install to finish first so a request racing the catalog
/// import does not report a record as missing.
pub async fn category_image(engine: &Engine, request: &InterceptedRequest) -> Option<HttpResponse> {
    let Some(id) = parse_record_key(request.path()) else {
        tracing::debug!(path = request.path(), "image path carries no record key");
        return None;
    };

    if let Err(e) = engine.readiness.wait().await {
        tracing::warn!(error = %e, "catalog unavailable, skipping category fallback");
        return None;
    }

    let record = match engine.records.get(id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::debug!(id, "no catalog record for image");
            return None;
        }
        Err(e) => {
            tracing::warn!(id, error = %e, "catalog lookup failed");
            return None;
        }
    };

    placeholder(engine, &record.category.to_lowercase()).await
}

/// Placeholder for the configured generic category.
pub async fn generic_image(engine: &Engine) -> Option<HttpResponse> {
    placeholder(engine, &engine.settings.generic_category).await
}

async fn placeholder(engine: &Engine, category: &str) -> Option<HttpResponse> {
    let url = match engine.settings.fallback_image_url(category) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(category, error = %e, "cannot build fallback image URL");
            return None;
        }
    };
    let found = engine
        .lookup(CacheName::FallbackImages, &InterceptedRequest::get(url))
        .await;
    if found.is_none() {
        tracing::debug!(category, "no placeholder image cached for category");
    }
    found
}
