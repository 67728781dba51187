//! Generation and entry CRUD operations.
//!
//! A generation is a named partition of the cache; entries belong to
//! exactly one generation and disappear with it.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Headers, Request, Response, ResponseKind};
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A cached response.
///
/// Written whole and overwritten whole; entries are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub request_key: String,
    pub url: String,
    pub method: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub headers: Headers,
    pub body: Bytes,
    pub cached_at: String,
}

impl CachedEntry {
    /// Snapshot a response for `request`.
    ///
    /// Only GET requests are ever keyed into the cache.
    pub fn from_response(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::NotCacheable(format!("{} {}", request.method, request.url)));
        }
        if response.is_network_error() {
            return Err(Error::NotCacheable(format!("network error for {}", request.url)));
        }

        let mut url = request.url.clone();
        url.set_fragment(None);

        Ok(Self {
            request_key: compute_request_key(&request.method, url.as_str()),
            url: url.to_string(),
            method: request.method.clone(),
            status: response.status,
            kind: response.kind,
            headers: response.headers.clone(),
            body: response.body.clone(),
            cached_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Rebuild the response to hand back to the host.
    pub fn to_response(&self) -> Response {
        Response {
            url: Url::parse(&self.url).ok(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            kind: self.kind,
        }
    }
}

impl CacheDb {
    /// Create a generation if it does not exist yet.
    ///
    /// Returns true when a new generation was created.
    pub async fn create_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let created = conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(created == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, through the foreign key, all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite an entry.
    ///
    /// Writes into a generation that does not exist are dropped and reported
    /// as `false`, so a purged generation is never resurrected by a late write.
    pub async fn upsert_entry(&self, generation: &str, entry: &CachedEntry) -> Result<bool, Error> {
        let generation = generation.to_string();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.headers)
            .map_err(|e| Error::NotCacheable(format!("failed to encode headers: {e}")))?;

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let written = conn.execute(
                    "INSERT INTO entries (
                        generation, request_key, url, method, status, kind, headers_json, body, cached_at
                    )
                    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
                    WHERE EXISTS (SELECT 1 FROM generations WHERE name = ?1)
                    ON CONFLICT(generation, request_key) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        kind = excluded.kind,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    params![
                        &generation,
                        &entry.request_key,
                        &entry.url,
                        &entry.method,
                        entry.status as i64,
                        entry.kind.as_str(),
                        &headers_json,
                        entry.body.as_ref(),
                        &entry.cached_at,
                    ],
                )?;
                Ok(written == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by request key.
    ///
    /// Returns None if the generation or the key doesn't exist.
    pub async fn get_entry(&self, generation: &str, request_key: &str) -> Result<Option<CachedEntry>, Error> {
        let generation = generation.to_string();
        let request_key = request_key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key, url, method, status, kind, headers_json, body, cached_at
                     FROM entries WHERE generation = ?1 AND request_key = ?2",
                )?;

                let result = stmt.query_row(params![generation, request_key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                let (request_key, url, method, status, kind, headers_json, body, cached_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let kind = ResponseKind::parse(&kind)
                    .ok_or_else(|| Error::NotCacheable(format!("unknown response kind in cache: {kind}")))?;
                let headers: Headers = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::NotCacheable(format!("corrupt cached headers: {e}")))?;

                Ok(Some(CachedEntry {
                    request_key,
                    url,
                    method,
                    status: u16::try_from(status).unwrap_or_default(),
                    kind,
                    headers,
                    body: Bytes::from(body),
                    cached_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a generation.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
