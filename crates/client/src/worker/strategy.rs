//! The four cache algorithms.
//!
//! Each returns `Err` only when no response could be obtained at all; the
//! worker then applies the route's fallback. Every write goes through
//! [`StrategyContext::store`], which enforces the write gate.

use std::sync::Arc;

use pwa_core::{Generation, Request, Response};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::liveness::LivenessState;
use crate::fetch::{FetchOptions, Network, NetworkError};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
    NetworkError,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Offline => "offline",
            ResponseSource::NetworkError => "network_error",
        }
    }
}

#[derive(Debug)]
pub struct StrategyOutcome {
    pub response: Response,
    pub source: ResponseSource,
    /// Background refresh started by stale-while-revalidate. Detached: the
    /// response above never depends on it.
    pub revalidation: Option<JoinHandle<()>>,
}

impl StrategyOutcome {
    pub fn network(response: Response) -> Self {
        Self { response, source: ResponseSource::Network, revalidation: None }
    }

    pub fn cache(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache, revalidation: None }
    }

    pub fn offline(response: Response) -> Self {
        Self { response, source: ResponseSource::Offline, revalidation: None }
    }

    pub fn network_error() -> Self {
        Self { response: Response::network_error(), source: ResponseSource::NetworkError, revalidation: None }
    }
}

/// What a strategy runs against: the current generation, the network, and
/// the write gate.
#[derive(Clone)]
pub struct StrategyContext {
    pub generation: Generation,
    pub network: Arc<dyn Network>,
    pub liveness: Arc<LivenessState>,
}

impl StrategyContext {
    /// Cache lookup; store errors count as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.generation.lookup(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.network.fetch(request, FetchOptions::for_request(request)).await
    }

    /// Write a network response if it may be cached.
    ///
    /// Opaque responses get one re-fetch with relaxed options; the readable
    /// result is written if it is cacheable, otherwise caching is abandoned.
    pub async fn store(&self, request: &Request, response: &Response) {
        if !self.liveness.is_active() {
            tracing::debug!(url = %request.url, "cache inactive; skipping write");
            return;
        }

        if response.is_opaque() {
            match self.network.fetch(request, FetchOptions::relaxed()).await {
                Ok(retry) if retry.is_cacheable() => self.write(request, &retry).await,
                Ok(retry) => {
                    tracing::warn!(url = %request.url, status = retry.status, kind = retry.kind.as_str(), "opaque response not cached")
                }
                Err(e) => tracing::warn!(url = %request.url, error = %e, "opaque response not cached"),
            }
            return;
        }

        if !response.is_cacheable() {
            tracing::debug!(url = %request.url, status = response.status, "response not cacheable");
            return;
        }

        self.write(request, response).await;
    }

    async fn write(&self, request: &Request, response: &Response) {
        // liveness may have flipped while a fetch was in flight
        if !self.liveness.is_active() {
            tracing::debug!(url = %request.url, "cache inactive; skipping write");
            return;
        }
        match self.generation.put(request, response).await {
            Ok(true) => tracing::debug!(url = %request.url, generation = self.generation.name(), "cached"),
            Ok(false) => tracing::debug!(url = %request.url, generation = self.generation.name(), "generation gone"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache write failed"),
        }
    }

    async fn revalidate(&self, request: &Request) {
        match self.fetch(request).await {
            Ok(response) => self.store(request, &response).await,
            Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
        }
    }

    /// Cached copy now, refreshed in the background; network on a miss.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<StrategyOutcome, NetworkError> {
        if let Some(cached) = self.lookup(request).await {
            let ctx = self.clone();
            let req = request.clone();
            let handle = tokio::spawn(async move { ctx.revalidate(&req).await });
            return Ok(StrategyOutcome { revalidation: Some(handle), ..StrategyOutcome::cache(cached) });
        }

        let response = self.fetch(request).await?;
        self.store(request, &response).await;
        Ok(StrategyOutcome::network(response))
    }

    /// Network, written through; the cache only when the network fails.
    pub async fn network_first(&self, request: &Request) -> Result<StrategyOutcome, NetworkError> {
        match self.fetch(request).await {
            Ok(response) => {
                self.store(request, &response).await;
                Ok(StrategyOutcome::network(response))
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed; trying cache");
                self.lookup(request).await.map(StrategyOutcome::cache).ok_or(e)
            }
        }
    }

    /// Cache, then the network without writing.
    pub async fn cache_first(&self, request: &Request) -> Result<StrategyOutcome, NetworkError> {
        if let Some(cached) = self.lookup(request).await {
            return Ok(StrategyOutcome::cache(cached));
        }
        self.fetch(request).await.map(StrategyOutcome::network)
    }

    /// Never touches the cache.
    pub async fn network_only(&self, request: &Request) -> Result<StrategyOutcome, NetworkError> {
        self.fetch(request).await.map(StrategyOutcome::network)
    }
}
