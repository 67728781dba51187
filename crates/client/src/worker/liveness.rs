//! Phone-home: checks that the host application still exists and
//! deactivates the worker once it is confirmed gone.
//!
//! ### States
//! - `idle`: the next intercepted request starts a check.
//! - `checking`: a check was issued this period; no further checks until the
//!   worker is torn down (quiet for `idle_timeout`) or explicitly suspended.
//!
//! ### Liveness endpoint
//! - 200: host present, nothing to do.
//! - 404: host removed. Unregister, stop all further cache writes, then
//!   delete every owned generation.
//! - anything else or no response: inconclusive, retried next period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pwa_core::{CacheStore, ConfigSnapshot, Request};
use tokio::task::JoinHandle;

use crate::fetch::{FetchOptions, Network};

/// The host's self-unregistration hook.
#[async_trait]
pub trait Registration: Send + Sync {
    /// Returns whether a registration was actually removed.
    async fn unregister(&self) -> Result<bool, pwa_core::Error>;
}

/// Process-wide flags shared by the worker.
///
/// Everything outside this module only reads them, except for the debounce
/// transitions.
#[derive(Debug)]
pub struct LivenessState {
    cache_active: AtomicBool,
    checking: AtomicBool,
}

impl Default for LivenessState {
    fn default() -> Self {
        Self { cache_active: AtomicBool::new(true), checking: AtomicBool::new(false) }
    }
}

impl LivenessState {
    /// False once the host is confirmed gone; gates every cache write.
    pub fn is_active(&self) -> bool {
        self.cache_active.load(Ordering::Acquire)
    }

    pub fn is_checking(&self) -> bool {
        self.checking.load(Ordering::Acquire)
    }

    /// idle -> checking. Returns false if a check already ran this period.
    pub fn record_check(&self) -> bool {
        self.checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// checking -> idle.
    pub fn reset(&self) {
        self.checking.store(false, Ordering::Release);
    }

    fn deactivate(&self) {
        self.cache_active.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn deactivated() -> Self {
        let state = Self::default();
        state.deactivate();
        state
    }

    #[cfg(test)]
    pub(crate) fn force_deactivate(&self) {
        self.deactivate();
    }
}

/// Result of one phone-home check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessOutcome {
    Alive,
    /// Host gone; the worker unregistered and deleted these generations.
    Removed { deleted: Vec<String> },
    Inconclusive,
    UnregisterFailed,
}

#[derive(Clone)]
pub struct LivenessMonitor {
    state: Arc<LivenessState>,
    snapshot: Arc<ConfigSnapshot>,
    network: Arc<dyn Network>,
    store: Arc<dyn CacheStore>,
    registration: Arc<dyn Registration>,
    idle_timeout: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    pending: Arc<Mutex<Option<JoinHandle<LivenessOutcome>>>>,
}

impl LivenessMonitor {
    pub fn new(
        snapshot: Arc<ConfigSnapshot>, network: Arc<dyn Network>, store: Arc<dyn CacheStore>,
        registration: Arc<dyn Registration>, idle_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(LivenessState::default()),
            snapshot,
            network,
            store,
            registration,
            idle_timeout,
            last_request: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> &Arc<LivenessState> {
        &self.state
    }

    /// Note an intercepted request; starts a background check when idle.
    ///
    /// A gap longer than `idle_timeout` since the previous request means the
    /// execution context was torn down in between, which re-arms the check.
    /// Once the host is confirmed gone nothing is started again.
    /// Returns true if a check was started.
    pub fn on_request(&self) -> bool {
        if !self.state.is_active() {
            return false;
        }

        let now = Instant::now();
        if let Ok(mut last) = self.last_request.lock() {
            if let Some(prev) = *last
                && now.duration_since(prev) >= self.idle_timeout
            {
                self.rearm();
            }
            *last = Some(now);
        }

        if !self.state.record_check() {
            return false;
        }

        let monitor = self.clone();
        let handle = tokio::spawn(async move { monitor.check().await });
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(handle);
        }
        true
    }

    /// checking -> idle, unless the worker is deactivated or the previous
    /// check has not finished yet.
    pub fn rearm(&self) {
        if self.state.is_active() && !self.in_flight() {
            self.state.reset();
        }
    }

    fn in_flight(&self) -> bool {
        self.pending
            .lock()
            .ok()
            .is_some_and(|p| p.as_ref().is_some_and(|h| !h.is_finished()))
    }

    /// Wait for the most recently started background check, if any.
    pub async fn settle(&self) -> Option<LivenessOutcome> {
        let handle = self.pending.lock().ok().and_then(|mut p| p.take())?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(error = %e, "liveness check task failed");
                None
            }
        }
    }

    /// Query the liveness endpoint and act on the answer.
    pub async fn check(&self) -> LivenessOutcome {
        let request = Request::get(self.snapshot.liveness_url.clone());
        match self.network.fetch(&request, FetchOptions::default()).await {
            Ok(response) if response.status == 200 => {
                tracing::debug!("host application present");
                LivenessOutcome::Alive
            }
            Ok(response) if response.status == 404 => self.deactivate().await,
            Ok(response) => {
                tracing::debug!(status = response.status, "liveness check inconclusive");
                LivenessOutcome::Inconclusive
            }
            Err(e) => {
                tracing::debug!(error = %e, "liveness check failed; will retry next period");
                LivenessOutcome::Inconclusive
            }
        }
    }

    async fn deactivate(&self) -> LivenessOutcome {
        tracing::warn!(url = %self.snapshot.liveness_url, "host application removed; unregistering worker");

        match self.registration.unregister().await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("no registration to remove"),
            Err(e) => {
                tracing::error!(error = %e, "failed to unregister worker");
                return LivenessOutcome::UnregisterFailed;
            }
        }

        // writes stop before the purge starts
        self.state.deactivate();

        let mut deleted = Vec::new();
        match self.store.keys().await {
            Ok(names) => {
                for name in names.into_iter().filter(|n| self.snapshot.owns_generation(n)) {
                    match self.store.delete(&name).await {
                        Ok(true) => deleted.push(name),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(generation = %name, error = %e, "failed to delete generation"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list generations"),
        }

        tracing::info!(deleted = deleted.len(), "worker deactivated; cache writes disabled");

        LivenessOutcome::Removed { deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{ScriptedNetwork, StubRegistration};
    use pwa_core::{AppConfig, CacheDb, Generation};

    fn snapshot() -> Arc<ConfigSnapshot> {
        Arc::new(AppConfig { origin: "https://example.com".into(), ..Default::default() }.snapshot().unwrap())
    }

    async fn store_with(names: &[&str]) -> Arc<dyn CacheStore> {
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open_in_memory().await.unwrap());
        for name in names {
            Generation::open(store.clone(), *name).await.unwrap();
        }
        store
    }

    fn monitor(
        network: Arc<ScriptedNetwork>, store: Arc<dyn CacheStore>, registration: Arc<StubRegistration>,
        idle_timeout: Duration,
    ) -> LivenessMonitor {
        LivenessMonitor::new(snapshot(), network, store, registration, idle_timeout)
    }

    #[test]
    fn test_state_transitions() {
        let state = LivenessState::default();
        assert!(state.is_active());
        assert!(!state.is_checking());

        assert!(state.record_check());
        assert!(!state.record_check());
        assert!(state.is_checking());

        state.reset();
        assert!(state.record_check());
    }

    #[tokio::test]
    async fn test_alive_keeps_everything() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 200, "");
        let store = store_with(&["pwa-main-1"]).await;
        let registration = Arc::new(StubRegistration::default());
        let m = monitor(network, store.clone(), registration.clone(), Duration::from_secs(60));

        assert_eq!(m.check().await, LivenessOutcome::Alive);
        assert!(m.state().is_active());
        assert_eq!(registration.calls(), 0);
        assert_eq!(store.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_unregisters_and_purges() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 404, "");
        let store = store_with(&["pwa-main-1", "pwa-main-2", "custom-cache"]).await;
        let registration = Arc::new(StubRegistration::default());
        let m = monitor(network, store.clone(), registration.clone(), Duration::from_secs(60));

        let outcome = m.check().await;

        assert_eq!(
            outcome,
            LivenessOutcome::Removed { deleted: vec!["pwa-main-1".to_string(), "pwa-main-2".to_string()] }
        );
        assert_eq!(registration.calls(), 1);
        assert_eq!(store.keys().await.unwrap(), vec!["custom-cache".to_string()]);
        assert!(!m.state().is_active());
    }

    #[tokio::test]
    async fn test_network_failure_is_inconclusive() {
        let network = Arc::new(ScriptedNetwork::new());
        let store = store_with(&["pwa-main-1"]).await;
        let registration = Arc::new(StubRegistration::default());
        let m = monitor(network, store, registration.clone(), Duration::from_secs(60));

        assert_eq!(m.check().await, LivenessOutcome::Inconclusive);
        assert!(m.state().is_active());
        assert_eq!(registration.calls(), 0);
    }

    #[tokio::test]
    async fn test_server_error_is_inconclusive() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 500, "");
        let store = store_with(&[]).await;
        let m = monitor(network, store, Arc::new(StubRegistration::default()), Duration::from_secs(60));

        assert_eq!(m.check().await, LivenessOutcome::Inconclusive);
    }

    #[tokio::test]
    async fn test_unregister_failure_keeps_caches() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 404, "");
        let store = store_with(&["pwa-main-1"]).await;
        let registration = Arc::new(StubRegistration::failing());
        let m = monitor(network, store.clone(), registration.clone(), Duration::from_secs(60));

        assert_eq!(m.check().await, LivenessOutcome::UnregisterFailed);
        assert_eq!(registration.calls(), 1);
        assert!(m.state().is_active());
        assert_eq!(store.keys().await.unwrap(), vec!["pwa-main-1".to_string()]);
    }

    #[tokio::test]
    async fn test_one_check_per_period() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 200, "");
        let store = store_with(&[]).await;
        let m = monitor(network.clone(), store, Arc::new(StubRegistration::default()), Duration::from_secs(60));

        assert!(m.on_request());
        assert_eq!(m.settle().await, Some(LivenessOutcome::Alive));
        assert!(!m.on_request());
        assert!(!m.on_request());
        assert_eq!(m.settle().await, None);
        assert_eq!(network.calls_to("https://example.com/pwa/module-active"), 1);
    }

    #[tokio::test]
    async fn test_rearms_after_idle_gap() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 200, "");
        let store = store_with(&[]).await;
        let m = monitor(network.clone(), store, Arc::new(StubRegistration::default()), Duration::ZERO);

        assert!(m.on_request());
        m.settle().await;
        assert!(m.on_request());
        m.settle().await;
        assert_eq!(network.calls_to("https://example.com/pwa/module-active"), 2);
    }

    #[tokio::test]
    async fn test_removed_host_is_not_checked_again() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 404, "");
        let store = store_with(&["pwa-main-1"]).await;
        let registration = Arc::new(StubRegistration::default());
        let m = monitor(network.clone(), store, registration.clone(), Duration::ZERO);

        assert!(m.on_request());
        assert!(matches!(m.settle().await, Some(LivenessOutcome::Removed { .. })));
        for _ in 0..2 {
            assert!(!m.on_request());
            assert_eq!(m.settle().await, None);
        }
        m.rearm();
        assert!(!m.on_request());

        assert_eq!(registration.calls(), 1);
        assert_eq!(network.calls_to("https://example.com/pwa/module-active"), 1);
        assert!(!m.state().is_active());
    }

    #[tokio::test]
    async fn test_no_rearm_while_check_in_flight() {
        let network = Arc::new(ScriptedNetwork::new());
        network.respond("https://example.com/pwa/module-active", 200, "");
        let store = store_with(&[]).await;
        let m = monitor(network.clone(), store, Arc::new(StubRegistration::default()), Duration::ZERO);

        // current-thread runtime: the spawned check has not been polled yet
        assert!(m.on_request());
        assert!(!m.on_request());
        m.rearm();
        assert!(m.state().is_checking());

        assert_eq!(m.settle().await, Some(LivenessOutcome::Alive));
        assert!(m.on_request());
        m.settle().await;
        assert_eq!(network.calls_to("https://example.com/pwa/module-active"), 2);
    }
}
