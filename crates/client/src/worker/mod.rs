//! The offline worker: lifecycle, request interception and self-deactivation.
//!
//! A [`Worker`] receives the host's three signals:
//!
//! - `install`: create and warm the current generation
//! - `activate`: evict superseded generations and start controlling requests
//! - `fetch`: answer an intercepted request, or let it pass through
//!
//! Each intercepted request goes classify -> route -> strategy -> fallback.
//! Every fetch also gives the liveness monitor a chance to phone home.

pub mod classify;
pub mod dispatch;
pub mod lifecycle;
pub mod liveness;
pub mod offline;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pwa_core::{CacheStore, ConfigSnapshot, Error, Generation, Request};
use serde::Serialize;

use crate::fetch::Network;

pub use classify::{Category, classify};
pub use dispatch::{Fallback, Plan, Route, route};
pub use lifecycle::{ActivateReport, InstallReport};
pub use liveness::{LivenessMonitor, LivenessOutcome, LivenessState, Registration};
pub use offline::OfflineFallback;
pub use strategy::{ResponseSource, StrategyContext, StrategyOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Unregistered after the host was confirmed gone.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Whether fetch events are intercepted in this state.
    pub fn controls(&self) -> bool {
        matches!(self, WorkerState::Activated | WorkerState::Redundant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    /// Not activated yet.
    NotControlling,
    Excluded,
}

impl PassthroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassthroughReason::NotControlling => "not_controlling",
            PassthroughReason::Excluded => "excluded",
        }
    }
}

/// What the host should do with an intercepted request.
#[derive(Debug)]
pub enum FetchDecision {
    /// Let the request go to the network untouched.
    Passthrough(PassthroughReason),
    Respond(StrategyOutcome),
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatus {
    pub name: String,
    pub entries: u64,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub cache_active: bool,
    pub checking: bool,
    pub strategy: String,
    pub generations: Vec<GenerationStatus>,
}

pub struct Worker {
    snapshot: Arc<ConfigSnapshot>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    liveness: LivenessMonitor,
    state: Mutex<WorkerState>,
}

impl Worker {
    pub fn new(
        snapshot: Arc<ConfigSnapshot>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
        registration: Arc<dyn Registration>, idle_timeout: Duration,
    ) -> Self {
        let liveness =
            LivenessMonitor::new(snapshot.clone(), network.clone(), store.clone(), registration, idle_timeout);
        Self { snapshot, store, network, liveness, state: Mutex::new(WorkerState::Parsed) }
    }

    pub fn snapshot(&self) -> &ConfigSnapshot {
        &self.snapshot
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    pub fn state(&self) -> WorkerState {
        if !self.liveness.state().is_active() {
            return WorkerState::Redundant;
        }
        self.state.lock().map(|s| *s).unwrap_or(WorkerState::Redundant)
    }

    fn set_state(&self, next: WorkerState) {
        if let Ok(mut state) = self.state.lock() {
            tracing::debug!(from = state.as_str(), to = next.as_str(), "worker state");
            *state = next;
        }
    }

    /// Handle on the current generation. Never creates it.
    pub fn current_generation(&self) -> Generation {
        Generation::existing(self.store.clone(), self.snapshot.current_generation())
    }

    /// Run install. Re-running it re-warms the generation; an activated
    /// worker keeps controlling requests meanwhile.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let previous = self.state();
        match previous {
            WorkerState::Installing | WorkerState::Activating => {
                return Err(Error::InvalidInput(format!("cannot install while {}", previous.as_str())));
            }
            WorkerState::Redundant => return Err(Error::InvalidInput("worker is redundant".into())),
            WorkerState::Activated => {}
            WorkerState::Parsed | WorkerState::Installed => self.set_state(WorkerState::Installing),
        }

        let installed =
            lifecycle::install(&self.snapshot, self.store.clone(), self.network.as_ref(), self.liveness.state()).await;
        match installed {
            Ok(report) => {
                if previous != WorkerState::Activated {
                    self.set_state(WorkerState::Installed);
                }
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                if previous != WorkerState::Activated {
                    self.set_state(WorkerState::Parsed);
                }
                Err(e)
            }
        }
    }

    /// Run activate; requires a completed install.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let previous = self.state();
        if !matches!(previous, WorkerState::Installed | WorkerState::Activated) {
            return Err(Error::InvalidInput(format!("cannot activate while {}", previous.as_str())));
        }
        self.set_state(WorkerState::Activating);

        match lifecycle::activate(&self.snapshot, self.store.as_ref()).await {
            Ok(report) => {
                self.set_state(WorkerState::Activated);
                tracing::info!(current = %report.current, deleted = report.deleted.len(), "worker activated");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "activate failed");
                self.set_state(previous);
                Err(e)
            }
        }
    }

    /// The host is tearing the execution context down; re-arm phone-home.
    pub fn suspend(&self) {
        self.liveness.rearm();
    }

    /// Answer an intercepted request.
    ///
    /// Never fails: every route ends in a response, at worst a generic
    /// network error.
    pub async fn fetch(&self, request: &Request) -> FetchDecision {
        if !self.state().controls() {
            return FetchDecision::Passthrough(PassthroughReason::NotControlling);
        }

        self.liveness.on_request();

        let category = classify(&self.snapshot, request);
        let Some(route) = route(category, self.snapshot.strategy, request.saves_data()) else {
            tracing::trace!(url = %request.url, method = %request.method, "passthrough");
            return FetchDecision::Passthrough(PassthroughReason::Excluded);
        };

        let ctx = StrategyContext {
            generation: self.current_generation(),
            network: self.network.clone(),
            liveness: self.liveness.state().clone(),
        };
        let result = match route.plan {
            Plan::StaleWhileRevalidate => ctx.stale_while_revalidate(request).await,
            Plan::NetworkFirst => ctx.network_first(request).await,
            Plan::CacheFirst => ctx.cache_first(request).await,
            Plan::NetworkOnly => ctx.network_only(request).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(url = %request.url, category = category.as_str(), error = %e, "no response; falling back");
                self.fallback(ctx.generation, route.fallback).await
            }
        };
        FetchDecision::Respond(outcome)
    }

    async fn fallback(&self, generation: Generation, fallback: Fallback) -> StrategyOutcome {
        let offline = OfflineFallback::new(&self.snapshot, generation);
        let result = match fallback {
            Fallback::OfflinePage => offline.page().await,
            Fallback::OfflineImage => offline.image().await,
            Fallback::NetworkError => return StrategyOutcome::network_error(),
        };
        match result {
            Ok(response) => StrategyOutcome::offline(response),
            Err(e) => {
                tracing::warn!(error = %e, "offline fallback unavailable");
                StrategyOutcome::network_error()
            }
        }
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        let current = self.snapshot.current_generation();
        let mut generations = Vec::new();
        for name in self.store.keys().await? {
            let entries = self.store.entry_count(&name).await?;
            generations.push(GenerationStatus { current: name == current, name, entries });
        }
        let flags = self.liveness.state();
        Ok(WorkerStatus {
            state: self.state(),
            cache_active: flags.is_active(),
            checking: flags.is_checking(),
            strategy: self.snapshot.strategy.to_string(),
            generations,
        })
    }
}
