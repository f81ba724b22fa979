//! Named response partitions.
//!
//! A partition is an independently enumerable set of stored responses keyed
//! by request. `CacheStore` is the seam the engine talks to; `StorageDb`
//! implements it on SQLite, tests may substitute their own.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

use super::connection::StorageDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{HttpResponse, InterceptedRequest};

/// Partition-level operations of the cache registry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn create_partition(&self, name: &str) -> Result<(), Error>;

    /// Stored response for `request` in `partition`, if any.
    async fn lookup(&self, partition: &str, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error>;

    /// Store `response` under `request`, replacing any previous entry.
    /// Creates the partition when missing.
    async fn put(&self, partition: &str, request: &InterceptedRequest, response: &HttpResponse) -> Result<(), Error>;

    /// First stored response for `request` across all partitions, oldest
    /// partition first.
    async fn lookup_any(&self, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error>;

    /// Names of every partition present in storage, oldest first.
    async fn partition_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all of its entries. Returns whether it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;
}

/// Handle to one opened partition.
#[derive(Clone)]
pub struct Partition {
    store: Arc<dyn CacheStore>,
    name: String,
}

impl Partition {
    /// Open (creating if needed) the named partition.
    pub async fn open(store: Arc<dyn CacheStore>, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }
        store.create_partition(&name).await?;
        Ok(Self { store, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lookup(&self, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        self.store.lookup(&self.name, request).await
    }

    pub async fn put(&self, request: &InterceptedRequest, response: &HttpResponse) -> Result<(), Error> {
        self.store.put(&self.name, request, response).await
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition").field("name", &self.name).finish()
    }
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_seq, created_at)
         VALUES (?1, (SELECT COALESCE(MAX(created_seq), 0) + 1 FROM partitions), ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<(u16, String, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_response((status, headers_json, body): (u16, String, Vec<u8>)) -> Result<HttpResponse, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(HttpResponse { status, headers, body: Bytes::from(body) })
}

#[async_trait]
impl CacheStore for StorageDb {
    async fn create_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_partition(conn, &name) })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, partition: &str, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        let partition = partition.to_string();
        let key = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<HttpResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body FROM entries
                     WHERE partition = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![partition, key], read_response) {
                    Ok(raw) => into_response(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, partition: &str, request: &InterceptedRequest, response: &HttpResponse) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = request_key(request);
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = response.status;
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition)?;
                tx.execute(
                    "INSERT INTO entries (partition, key_hash, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(partition, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        partition,
                        key,
                        method,
                        url,
                        status,
                        headers_json,
                        body,
                        chrono::Utc::now().to_rfc3339()
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup_any(&self, request: &InterceptedRequest) -> Result<Option<HttpResponse>, Error> {
        let key = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<HttpResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.status, e.headers_json, e.body FROM entries e
                     JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1
                     ORDER BY p.created_seq ASC
                     LIMIT 1",
                )?;

                match stmt.query_row(params![key], read_response) {
                    Ok(raw) => into_response(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl StorageDb {
    /// Number of entries stored in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE partition = ?1",
                    params![partition],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
