//! The cache store abstraction the worker is written against.

use std::sync::Arc;

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::CachedEntry;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Request, Response};

/// Key-value store of request key to cached response, partitioned into
/// named generations.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if absent. Returns true if it was created.
    async fn create(&self, name: &str) -> Result<bool, Error>;

    async fn lookup(&self, generation: &str, request_key: &str) -> Result<Option<CachedEntry>, Error>;

    /// Overwrite the entry for its key. Returns false if the generation is gone.
    async fn put(&self, generation: &str, entry: &CachedEntry) -> Result<bool, Error>;

    /// Every generation name, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Returns false if nothing had that name.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    async fn entry_count(&self, generation: &str) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn create(&self, name: &str) -> Result<bool, Error> {
        self.create_generation(name).await
    }

    async fn lookup(&self, generation: &str, request_key: &str) -> Result<Option<CachedEntry>, Error> {
        self.get_entry(generation, request_key).await
    }

    async fn put(&self, generation: &str, entry: &CachedEntry) -> Result<bool, Error> {
        self.upsert_entry(generation, entry).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.list_generations().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_generation(name).await
    }

    async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        self.count_entries(generation).await
    }
}

/// Handle on one named generation.
///
/// Cheap to clone; background tasks take their own copy.
#[derive(Clone)]
pub struct Generation {
    name: String,
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation").field("name", &self.name).finish()
    }
}

impl Generation {
    /// Open a generation, creating it if absent.
    pub async fn open(store: Arc<dyn CacheStore>, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if store.create(&name).await? {
            tracing::debug!(generation = %name, "created cache generation");
        }
        Ok(Self { name, store })
    }

    /// Handle on a generation without creating it.
    ///
    /// Reads from a missing generation miss and writes are dropped.
    pub fn existing(store: Arc<dyn CacheStore>, name: impl Into<String>) -> Self {
        Self { name: name.into(), store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached response for a request, if any.
    pub async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = compute_request_key(&request.method, request.url.as_str());
        Ok(self.store.lookup(&self.name, &key).await?.map(|e| e.to_response()))
    }

    /// Store a response for a request, replacing any previous entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<bool, Error> {
        let entry = CachedEntry::from_response(request, response)?;
        self.store.put(&self.name, &entry).await
    }

    pub async fn entry_count(&self) -> Result<u64, Error> {
        self.store.entry_count(&self.name).await
    }
}
