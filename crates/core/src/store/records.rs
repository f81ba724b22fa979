//! Catalog record store.
//!
//! Records are imported in bulk once during install and only read afterwards,
//! when an image fallback needs the category of a catalog item.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_rusqlite::{params, rusqlite};

use super::connection::StorageDb;
use crate::Error;

/// A catalog item as delivered by the catalog API.
///
/// Only `id` and `category` are interpreted; every other field is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogRecord {
    pub fn new(id: i64, category: impl Into<String>) -> Self {
        Self { id, category: category.into(), extra: Map::new() }
    }
}

/// Read-mostly store of catalog records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<CatalogRecord>, Error>;

    /// Insert all records in a single transaction. Either every record is
    /// stored or none is. Re-importing an id replaces the previous row.
    async fn bulk_insert(&self, records: Vec<CatalogRecord>) -> Result<u64, Error>;
}

#[async_trait]
impl RecordStore for StorageDb {
    async fn get(&self, id: i64) -> Result<Option<CatalogRecord>, Error> {
        self.conn
            .call(move |conn| -> Result<Option<CatalogRecord>, Error> {
                let mut stmt = conn.prepare("SELECT record_json FROM catalog_items WHERE id = ?1")?;

                match stmt.query_row(params![id], |row| row.get::<_, String>(0)) {
                    Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn bulk_insert(&self, records: Vec<CatalogRecord>) -> Result<u64, Error> {
        let rows = records
            .iter()
            .map(|r| -> Result<(i64, String, String), Error> { Ok((r.id, r.category.clone(), serde_json::to_string(r)?)) })
            .collect::<Result<Vec<_>, Error>>()?;

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let imported_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR REPLACE INTO catalog_items (id, category, record_json, imported_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )?;
                    for (id, category, json) in &rows {
                        stmt.execute(params![id, category, json, imported_at])?;
                    }
                }
                tx.commit()?;
                Ok(rows.len() as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl StorageDb {
    /// Number of catalog records currently stored.
    pub async fn count_records(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_items", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
