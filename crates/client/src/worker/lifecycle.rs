//! Install and activate.
//!
//! Install warms the current generation; activate evicts every other
//! generation this worker owns. Both are safe to re-run.

use std::sync::Arc;

use futures_util::future::join_all;
use pwa_core::{CacheStore, ConfigSnapshot, Error, Generation, Request};
use serde::Serialize;
use url::Url;

use super::liveness::LivenessState;
use crate::fetch::{FetchOptions, Network};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub current: String,
    pub deleted: Vec<String>,
}

/// Create the current generation and precache every configured URL.
///
/// Fetches run concurrently and fail independently; the returned report
/// lists the URLs that could not be stored. Only failing to create the
/// generation itself is an error, as is the host being confirmed gone at
/// any point during the run; the generation is then removed again.
pub async fn install(
    snapshot: &ConfigSnapshot, store: Arc<dyn CacheStore>, network: &dyn Network, liveness: &LivenessState,
) -> Result<InstallReport, Error> {
    if !liveness.is_active() {
        return Err(deactivated());
    }
    let generation = Generation::open(store.clone(), snapshot.current_generation()).await?;

    let urls: Vec<&Url> = snapshot.precache_all().collect();
    let results = join_all(urls.iter().map(|url| precache(&generation, network, liveness, url))).await;

    if !liveness.is_active() {
        store.delete(generation.name()).await?;
        tracing::warn!(generation = generation.name(), "host removed during install; generation dropped");
        return Err(deactivated());
    }

    let mut cached = 0;
    let mut failed = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(()) => cached += 1,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "precache failed");
                failed.push(url.to_string());
            }
        }
    }

    tracing::info!(generation = generation.name(), cached, failed = failed.len(), "install complete");
    Ok(InstallReport { generation: generation.name().to_string(), cached, failed })
}

/// Any obtained response is stored, whatever its status. Only a network
/// failure or a failed write counts against the install.
async fn precache(
    generation: &Generation, network: &dyn Network, liveness: &LivenessState, url: &Url,
) -> Result<(), Error> {
    let request = Request::get(url.clone());
    let response = network.fetch(&request, FetchOptions::precache()).await?;
    if !response.is_opaque() && !response.ok() {
        tracing::debug!(url = %url, status = response.status, "precaching non-success response");
    }
    if !liveness.is_active() {
        return Err(deactivated());
    }
    if !generation.put(&request, &response).await? {
        return Err(Error::NotCacheable(format!("generation {} removed during install", generation.name())));
    }
    Ok(())
}

fn deactivated() -> Error {
    Error::NotCacheable("cache writes disabled: host application removed".into())
}

/// Delete every owned generation except the current one.
///
/// Generations without the prefix belong to someone else and are kept.
pub async fn activate(snapshot: &ConfigSnapshot, store: &dyn CacheStore) -> Result<ActivateReport, Error> {
    let current = snapshot.current_generation();
    let stale: Vec<String> = store
        .keys()
        .await?
        .into_iter()
        .filter(|name| snapshot.owns_generation(name) && *name != current)
        .collect();

    let mut deleted = Vec::with_capacity(stale.len());
    for name in stale {
        if store.delete(&name).await? {
            tracing::info!(generation = %name, "deleted stale generation");
            deleted.push(name);
        }
    }

    Ok(ActivateReport { current, deleted })
}
